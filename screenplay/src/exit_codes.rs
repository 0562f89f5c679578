//! Stable exit codes for `screenplay` CLI commands.

/// Command succeeded; `classify` produced a successful or ignorable result.
pub const OK: i32 = 0;
/// Invalid config, arguments or other errors.
pub const INVALID: i32 = 1;
/// `classify` produced a failure, error or compromised result.
pub const UNSUCCESSFUL: i32 = 2;
