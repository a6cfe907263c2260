//! CLI configuration
//!
//! Settings come from two optional layers:
//! - `titan.toml` in the working directory
//! - Environment variables (`TITAN_*`, `NO_COLOR`)
//!
//! Command-line flags override both; `main` applies them last.

use serde::Deserialize;
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use thiserror::Error;
use titan_runtime::ColorMode;

/// Project configuration file looked up in the working directory
pub const PROJECT_FILE: &str = "titan.toml";

/// Accepted values for `--log` and the `log` key
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Tracing level used when nothing else is configured
pub const DEFAULT_LOG_LEVEL: &str = "error";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Include path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Contents of `titan.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Extra include directories, relative to the working directory
    #[serde(default)]
    pub include: Vec<PathBuf>,

    /// Run semantic analysis by default
    pub analyze: Option<bool>,

    /// Default tracing level
    pub log: Option<String>,
}

impl ProjectConfig {
    /// Load a project configuration file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `titan.toml` from `dir`; a missing file yields the defaults
    pub fn load_from_directory(dir: &Path) -> ConfigResult<Self> {
        let path = dir.join(PROJECT_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        tracing::debug!(file = %path.display(), "loading project configuration");
        Self::load_from_file(&path)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(level) = &self.log {
            validate_log_level("log", level)?;
        }
        Ok(())
    }
}

/// Environment configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Default to JSON diagnostic output (TITAN_DIAGNOSTICS=json)
    pub default_json: bool,
    /// Disable colored output (TITAN_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Custom history file path (TITAN_HISTORY_FILE=/path/to/file)
    pub history_file: Option<PathBuf>,
    /// Disable REPL history (TITAN_NO_HISTORY=1)
    pub no_history: bool,
    /// Include directories from TITAN_PATH
    pub path_dirs: Vec<PathBuf>,
    /// `titan.toml` settings
    pub project: ProjectConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            default_json: lookup("TITAN_DIAGNOSTICS")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            no_color: lookup("TITAN_NO_COLOR").is_some() || lookup("NO_COLOR").is_some(),
            history_file: lookup("TITAN_HISTORY_FILE").map(PathBuf::from),
            no_history: lookup("TITAN_NO_HISTORY").is_some(),
            path_dirs: lookup("TITAN_PATH")
                .map(|v| split_dirs(&v))
                .unwrap_or_default(),
            project: ProjectConfig::default(),
        }
    }

    /// Environment configuration plus the `titan.toml` found in `dir`
    pub fn load(dir: &Path) -> ConfigResult<Self> {
        Ok(Self {
            project: ProjectConfig::load_from_directory(dir)?,
            ..Self::from_env()
        })
    }

    /// Get the history file path
    ///
    /// Returns:
    /// 1. TITAN_HISTORY_FILE if set
    /// 2. ~/.titan/history if home directory exists
    /// 3. None otherwise
    pub fn get_history_path(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.history_file {
            return Some(path.clone());
        }
        dirs::home_dir().map(|home| home.join(".titan").join("history"))
    }

    /// Color mode for diagnostics written to stderr
    pub fn color_mode(&self) -> ColorMode {
        if self.no_color || !std::io::stderr().is_terminal() {
            ColorMode::Never
        } else {
            ColorMode::Auto
        }
    }
}

/// Split a `:`-separated directory list, dropping empty entries
pub fn split_dirs(list: &str) -> Vec<PathBuf> {
    list.split(':')
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Check that every include path names an existing directory
pub fn validate_include_dirs(dirs: &[PathBuf]) -> ConfigResult<()> {
    match dirs.iter().find(|dir| !dir.is_dir()) {
        Some(bad) => Err(ConfigError::NotADirectory(bad.clone())),
        None => Ok(()),
    }
}

pub fn validate_log_level(field: &str, level: &str) -> ConfigResult<()> {
    if LOG_LEVELS.contains(&level) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected one of {}, found '{}'", LOG_LEVELS.join(", "), level),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = config_with(&[]);
        assert!(!config.default_json);
        assert!(!config.no_color);
        assert!(config.history_file.is_none());
        assert!(!config.no_history);
        assert!(config.path_dirs.is_empty());
    }

    #[test]
    fn test_config_json_diagnostics() {
        assert!(config_with(&[("TITAN_DIAGNOSTICS", "json")]).default_json);
        assert!(config_with(&[("TITAN_DIAGNOSTICS", "JSON")]).default_json);
        assert!(!config_with(&[("TITAN_DIAGNOSTICS", "human")]).default_json);
    }

    #[test]
    fn test_config_no_color() {
        assert!(config_with(&[("TITAN_NO_COLOR", "1")]).no_color);
        assert!(config_with(&[("NO_COLOR", "1")]).no_color);
        assert_eq!(config_with(&[("NO_COLOR", "")]).color_mode(), ColorMode::Never);
    }

    #[test]
    fn test_config_history() {
        let config = config_with(&[("TITAN_HISTORY_FILE", "/tmp/custom"), ("TITAN_NO_HISTORY", "1")]);
        assert_eq!(config.get_history_path(), Some(PathBuf::from("/tmp/custom")));
        assert!(config.no_history);
    }

    #[test]
    fn test_get_history_path_default() {
        let path = config_with(&[]).get_history_path();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, Some(home.join(".titan").join("history")));
        }
    }

    #[test]
    fn test_titan_path_splits_on_colons() {
        let config = config_with(&[("TITAN_PATH", "lib::/opt/titan:")]);
        assert_eq!(
            config.path_dirs,
            vec![PathBuf::from("lib"), PathBuf::from("/opt/titan")]
        );
    }

    #[test]
    fn test_parse_project_config() {
        let config: ProjectConfig = toml::from_str(
            r#"
include = ["lib", "vendor/std"]
analyze = true
log = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.include, vec![PathBuf::from("lib"), PathBuf::from("vendor/std")]);
        assert_eq!(config.analyze, Some(true));
        assert_eq!(config.log.as_deref(), Some("debug"));
    }

    #[test]
    fn test_project_config_rejects_unknown_keys() {
        assert!(toml::from_str::<ProjectConfig>("optimize = true").is_err());
    }

    #[test]
    fn test_project_config_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            ProjectConfig::load_from_directory(dir.path()).unwrap(),
            ProjectConfig::default()
        );

        std::fs::write(dir.path().join(PROJECT_FILE), "log = \"loud\"").unwrap();
        let err = ProjectConfig::load_from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "log"));

        std::fs::write(dir.path().join(PROJECT_FILE), "analyze = ").unwrap();
        let err = ProjectConfig::load_from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
    }

    #[test]
    fn test_validate_include_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.tn");
        std::fs::write(&file, "").unwrap();

        assert!(validate_include_dirs(&[dir.path().to_path_buf()]).is_ok());
        let err = validate_include_dirs(&[dir.path().to_path_buf(), file.clone()]).unwrap_err();
        assert!(matches!(err, ConfigError::NotADirectory(ref p) if *p == file));
    }
}
