//! Runner Configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Command line: `lumen [--config <path>] [script.json]`
//! 2. Environment variables: `LUMEN_SCRIPT`, `LUMEN_TICKS`, `LUMEN_OUTPUT`, `LUMEN_DEBUG`
//! 3. Config file: `--config <path>`, else the first of `lumen.toml`, `/etc/lumen/lumen.toml`
//! 4. Defaults
//!
//! # Example Config File
//!
//! ```toml
//! script = "scripts/dimmer.json"
//! ticks = 10
//! output = "scripts/dimmer.saved.json"
//! result_type = "Float"
//! debug = false
//!
//! [context]
//! universe = 1
//! fixture = "par-64"
//! ```

use crate::error::RunnerError;
use lumen_graph::ValueType;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_PATHS: [&str; 2] = ["lumen.toml", "/etc/lumen/lumen.toml"];

/// Complete runner configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Saved script record to run
    pub script: Option<PathBuf>,
    /// Number of runs
    pub ticks: u32,
    /// Where to write the re-saved record
    pub output: Option<PathBuf>,
    /// Result type of the script, e.g. `Float` or `List<Int>`
    pub result_type: String,
    /// Log the re-saved record after the run
    pub debug: bool,
    /// Free-form values handed to nodes as the script context
    pub context: toml::Table,
    /// Config file the values came from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            script: None,
            ticks: 1,
            output: None,
            result_type: "Any".to_string(),
            debug: false,
            context: toml::Table::new(),
            config_path: None,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, RunnerError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::load_with(&args, |key| std::env::var(key).ok())
    }

    /// Load configuration from the given arguments and environment lookup
    pub fn load_with<F>(args: &[String], env: F) -> Result<Self, RunnerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // 1. Config file, an explicit one must exist
        let explicit = args
            .iter()
            .position(|arg| arg == "--config")
            .map(|i| args.get(i + 1).cloned().ok_or(RunnerError::MissingArgument("--config")))
            .transpose()?;

        if let Some(path) = explicit {
            config = Self::load_from_file(&path)?;
            config.config_path = Some(PathBuf::from(&path));
            log::info!("Loaded runner config from {}", path);
        } else {
            for path in CONFIG_PATHS {
                if !Path::new(path).exists() {
                    continue;
                }
                config = Self::load_from_file(path)?;
                config.config_path = Some(PathBuf::from(path));
                log::info!("Loaded runner config from {}", path);
                break;
            }
        }

        // 2. Environment variables
        if let Some(script) = env("LUMEN_SCRIPT").filter(|s| !s.is_empty()) {
            config.script = Some(PathBuf::from(script));
            log::info!("Script from env: {:?}", config.script);
        }

        if let Some(ticks) = env("LUMEN_TICKS") {
            match ticks.parse() {
                Ok(ticks) => config.ticks = ticks,
                Err(_) => log::warn!("Ignoring LUMEN_TICKS={}, not a tick count", ticks),
            }
        }

        if let Some(output) = env("LUMEN_OUTPUT").filter(|s| !s.is_empty()) {
            config.output = Some(PathBuf::from(output));
        }

        if env("LUMEN_DEBUG").map(|v| v == "1" || v == "true").unwrap_or(false) {
            config.debug = true;
        }

        // 3. First non-flag argument is the script path
        let mut skip_value = false;
        for arg in args {
            if skip_value {
                skip_value = false;
                continue;
            }
            if arg == "--config" {
                skip_value = true;
                continue;
            }
            if arg == "--debug" {
                config.debug = true;
                continue;
            }
            if arg.starts_with("--") {
                continue;
            }
            config.script = Some(PathBuf::from(arg));
            log::info!("Script from args: {:?}", config.script);
            break;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, RunnerError> {
        Ok(toml::from_str(content)?)
    }

    /// Parsed result type
    pub fn result_type(&self) -> Result<ValueType, RunnerError> {
        self.result_type.parse().map_err(RunnerError::InvalidResultType)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        log::info!("=== Runner Configuration ===");
        log::info!("  Config file: {:?}", self.config_path);
        log::info!("  Script: {:?}", self.script);
        log::info!("  Ticks: {}", self.ticks);
        log::info!("  Result type: {}", self.result_type);
        log::info!("  Output: {:?}", self.output);
        log::info!("  Context keys: {}", self.context.len());
        log::info!("  Debug: {}", self.debug);
        log::info!("============================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.ticks, 1);
        assert_eq!(config.result_type().unwrap(), ValueType::Any);
        assert!(config.script.is_none());
        assert!(config.context.is_empty());
    }

    #[test]
    fn test_from_toml() {
        let config = RunnerConfig::from_toml(
            r#"
            script = "dimmer.json"
            ticks = 4
            result_type = "List<Float>"

            [context]
            universe = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.script, Some(PathBuf::from("dimmer.json")));
        assert_eq!(config.ticks, 4);
        assert!(!config.debug);
        assert_eq!(
            config.result_type().unwrap(),
            ValueType::List(Box::new(ValueType::Float))
        );
        assert_eq!(config.context.get("universe").and_then(|v| v.as_integer()), Some(2));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(matches!(
            RunnerConfig::from_toml("ticks = \"many\""),
            Err(RunnerError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_result_type() {
        let config = RunnerConfig {
            result_type: "Texture".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.result_type(), Err(RunnerError::InvalidResultType(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env = |key: &str| match key {
            "LUMEN_SCRIPT" => Some("from-env.json".to_string()),
            "LUMEN_TICKS" => Some("12".to_string()),
            "LUMEN_DEBUG" => Some("1".to_string()),
            _ => None,
        };
        let config = RunnerConfig::load_with(&[], env).unwrap();
        assert_eq!(config.script, Some(PathBuf::from("from-env.json")));
        assert_eq!(config.ticks, 12);
        assert!(config.debug);
    }

    #[test]
    fn test_bad_tick_count_is_ignored() {
        let env = |key: &str| (key == "LUMEN_TICKS").then(|| "lots".to_string());
        let config = RunnerConfig::load_with(&[], env).unwrap();
        assert_eq!(config.ticks, 1);
    }

    #[test]
    fn test_positional_argument_wins() {
        let env = |key: &str| (key == "LUMEN_SCRIPT").then(|| "from-env.json".to_string());
        let config = RunnerConfig::load_with(&args(&["--debug", "show.json", "other.json"]), env).unwrap();
        assert_eq!(config.script, Some(PathBuf::from("show.json")));
        assert!(config.debug);
    }

    #[test]
    fn test_explicit_config_file() {
        let path = std::env::temp_dir().join(format!("lumen-runner-{}.toml", std::process::id()));
        std::fs::write(&path, "ticks = 3\noutput = \"saved.json\"\n").unwrap();

        let path_arg = path.to_string_lossy().to_string();
        let config = RunnerConfig::load_with(&args(&["--config", &path_arg, "show.json"]), no_env).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.ticks, 3);
        assert_eq!(config.output, Some(PathBuf::from("saved.json")));
        assert_eq!(config.config_path, Some(path));
        assert_eq!(config.script, Some(PathBuf::from("show.json")));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        assert!(matches!(
            RunnerConfig::load_with(&args(&["--config"]), no_env),
            Err(RunnerError::MissingArgument("--config"))
        ));
        assert!(matches!(
            RunnerConfig::load_with(&args(&["--config", "/nonexistent/lumen.toml"]), no_env),
            Err(RunnerError::Io(_))
        ));
    }
}
