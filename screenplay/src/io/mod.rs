//! Side-effecting helpers: configuration files and the environment.

pub mod config;
