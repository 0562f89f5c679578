//! Engine configuration stored in `screenplay.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::context::PerformanceSettings;
use crate::core::analysis::{ClassificationConfig, FailureAnalysis};

pub const DEFAULT_CONFIG_FILE: &str = "screenplay.toml";

const ENV_PREFIX: &str = "SCREENPLAY_";

/// Engine configuration (TOML).
///
/// Missing fields fall back to the defaults; the classification lists extend
/// the built-in ones rather than replacing them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScreenplayConfig {
    /// Return task failures to the caller instead of swallowing them.
    pub throw_errors_immediately: bool,

    /// Only report tasks that carry an explicit step marker.
    pub manual_task_instrumentation: bool,

    pub classification: ClassificationConfig,
}

impl ScreenplayConfig {
    pub fn validate(&self) -> Result<()> {
        let lists = [
            ("fail_on", &self.classification.fail_on),
            ("error_on", &self.classification.error_on),
            ("pending_on", &self.classification.pending_on),
            ("skipped_on", &self.classification.skipped_on),
            ("compromised_on", &self.classification.compromised_on),
        ];
        for (field, types) in lists {
            for ty in types {
                if ty.trim().is_empty() {
                    return Err(anyhow!("classification.{field} must not contain empty type names"));
                }
                if ty.chars().any(char::is_whitespace) {
                    return Err(anyhow!(
                        "classification.{field}: type name {ty:?} must not contain whitespace"
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> PerformanceSettings {
        PerformanceSettings {
            throw_errors_immediately: self.throw_errors_immediately,
            manual_task_instrumentation: self.manual_task_instrumentation,
        }
    }

    pub fn failure_analysis(&self) -> FailureAnalysis {
        FailureAnalysis::from_config(&self.classification)
    }

    /// Overlay `SCREENPLAY_*` variables.
    ///
    /// List variables are comma-separated and extend the configured lists;
    /// boolean variables replace the configured value. Unrelated variables
    /// are ignored.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref();
            let classification = &mut self.classification;
            match name {
                "FAIL_ON" => extend_list(&mut classification.fail_on, value),
                "ERROR_ON" => extend_list(&mut classification.error_on, value),
                "PENDING_ON" => extend_list(&mut classification.pending_on, value),
                "SKIPPED_ON" => extend_list(&mut classification.skipped_on, value),
                "COMPROMISED_ON" => extend_list(&mut classification.compromised_on, value),
                "THROW_ERRORS_IMMEDIATELY" => {
                    self.throw_errors_immediately = parse_flag(key.as_ref(), value)?;
                }
                "MANUAL_TASK_INSTRUMENTATION" => {
                    self.manual_task_instrumentation = parse_flag(key.as_ref(), value)?;
                }
                _ => {
                    tracing::debug!(
                        variable = key.as_ref(),
                        "ignoring unknown screenplay variable"
                    );
                }
            }
        }
        Ok(())
    }
}

fn extend_list(list: &mut Vec<String>, value: &str) {
    for ty in value.split(',').map(str::trim).filter(|ty| !ty.is_empty()) {
        if !list.iter().any(|existing| existing == ty) {
            list.push(ty.to_string());
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("{key} must be a boolean, got {other:?}")),
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ScreenplayConfig::default()`.
pub fn load_config(path: &Path) -> Result<ScreenplayConfig> {
    if !path.exists() {
        let cfg = ScreenplayConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ScreenplayConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load config from `path`, then overlay the process environment.
pub fn load_config_with_env(path: &Path) -> Result<ScreenplayConfig> {
    let mut cfg = load_config(path)?;
    cfg.apply_env(std::env::vars())
        .context("apply SCREENPLAY_* environment")?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ScreenplayConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::failure::{ErrorType, StepError};
    use crate::core::outcome::TestResult;
    use crate::test_support::TempConfigDir;

    #[test]
    fn load_missing_returns_default() {
        let temp = TempConfigDir::new().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ScreenplayConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = TempConfigDir::new().expect("tempdir");
        let mut cfg = ScreenplayConfig {
            throw_errors_immediately: true,
            ..ScreenplayConfig::default()
        };
        cfg.classification.fail_on.push("element-not-found".to_string());
        write_config(&temp.config_path(), &cfg).expect("write");
        let loaded = load_config(&temp.config_path()).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = TempConfigDir::new().expect("tempdir");
        let path = temp
            .write_config("[classification]\nerror_on = [\"assertion\"]\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert!(!cfg.throw_errors_immediately);
        assert_eq!(cfg.classification.error_on, vec!["assertion".to_string()]);

        let analysis = cfg.failure_analysis();
        assert_eq!(
            analysis.result_for(&StepError::assertion("expected 1")),
            TestResult::Error
        );
    }

    #[test]
    fn invalid_type_name_is_rejected() {
        let temp = TempConfigDir::new().expect("tempdir");
        let path = temp
            .write_config("[classification]\nfail_on = [\"not a type\"]\n")
            .expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(err.to_string().contains("classification.fail_on"));
    }

    #[test]
    fn malformed_toml_reports_the_path() {
        let temp = TempConfigDir::new().expect("tempdir");
        let path = temp.write_config("throw_errors_immediately = maybe\n").expect("write");
        let err = load_config(&path).expect_err("malformed");
        assert!(format!("{err:#}").contains("parse"));
    }

    #[test]
    fn env_overlay_extends_lists_and_sets_flags() {
        let mut cfg = ScreenplayConfig::default();
        cfg.classification.fail_on.push("a".to_string());
        cfg.apply_env([
            ("SCREENPLAY_FAIL_ON", "b, a ,c"),
            ("SCREENPLAY_MANUAL_TASK_INSTRUMENTATION", "true"),
            ("PATH", "/usr/bin"),
        ])
        .expect("apply");
        assert_eq!(cfg.classification.fail_on, vec!["a", "b", "c"]);
        assert!(cfg.manual_task_instrumentation);
        assert!(cfg.settings().manual_task_instrumentation);
        assert!(!cfg.settings().throw_errors_immediately);
    }

    #[test]
    fn env_overlay_rejects_non_boolean_flags() {
        let mut cfg = ScreenplayConfig::default();
        let err = cfg
            .apply_env([("SCREENPLAY_THROW_ERRORS_IMMEDIATELY", "sometimes")])
            .expect_err("not a boolean");
        assert!(err.to_string().contains("SCREENPLAY_THROW_ERRORS_IMMEDIATELY"));
    }

    #[test]
    fn configured_compromised_type_classifies_as_compromised() {
        let mut cfg = ScreenplayConfig::default();
        cfg.apply_env([("SCREENPLAY_COMPROMISED_ON", "database-unavailable")])
            .expect("apply");
        let analysis = cfg.failure_analysis();
        let err = StepError::new(ErrorType::new("database-unavailable"), "no connection");
        assert_eq!(analysis.result_for(&err), TestResult::Compromised);
    }
}
