use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CompilerError;
use crate::include_filter::MatchOption;
use crate::macros::MacroTable;
use crate::preprocessor::PreprocessorContext;
use crate::version::{Version, VersionParseError};

pub const DEFAULT_COMPILER_VERSION: &str = "3.6.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_compiler_version")]
    pub compiler_version: String,
    /// Macros defined before every script is preprocessed.
    #[serde(default)]
    pub defines: BTreeMap<String, String>,
    #[serde(default)]
    pub max_line_length: Option<usize>,
    #[serde(default)]
    pub ignore_case_patterns: bool,
}

fn default_compiler_version() -> String {
    env::var("CST_COMPILER_VERSION").unwrap_or_else(|_| String::from(DEFAULT_COMPILER_VERSION))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            compiler_version: default_compiler_version(),
            defines: BTreeMap::new(),
            max_line_length: None,
            ignore_case_patterns: false,
        }
    }
}

impl Config {
    /// Reads the config of the current environment. A missing or broken
    /// file yields the defaults.
    pub fn load() -> Self {
        let config_path = Self::get_config_path();
        if !config_path.exists() {
            debug!(path = %config_path.display(), "no config file, using defaults");
            return Config::default();
        }

        match Self::load_from(&config_path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %config_path.display(), error = %err, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, CompilerError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents)?;
        if let Ok(version) = env::var("CST_COMPILER_VERSION") {
            config.compiler_version = version;
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, CompilerError> {
        let config_path = Self::get_config_path();
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;
        Ok(config_path)
    }

    pub fn env_name() -> String {
        env::var("CST_ENV").unwrap_or_else(|_| String::from("default"))
    }

    pub fn get_config_path() -> PathBuf {
        let home = if cfg!(windows) {
            env::var("USERPROFILE")
        } else {
            env::var("HOME")
        };
        PathBuf::from(home.unwrap_or_else(|_| String::from(".")))
            .join(".cst")
            .join(Self::env_name())
            .join("config.json")
    }

    pub fn version(&self) -> Result<Version, CompilerError> {
        self.compiler_version
            .parse()
            .map_err(|err: VersionParseError| CompilerError::InvalidArgument(err.to_string()))
    }

    pub fn match_option(&self) -> MatchOption {
        if self.ignore_case_patterns {
            MatchOption::CaseInsensitive
        } else {
            MatchOption::CaseSensitive
        }
    }

    /// Preprocessor state seeded with the configured version and macros.
    pub fn preprocessor_context(&self) -> Result<PreprocessorContext, CompilerError> {
        let mut context = PreprocessorContext::new(self.version()?);
        context.macros = self.defines.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect::<MacroTable>();
        context.max_line_length = self.max_line_length;
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{ "defines": { "DEBUG": "1" } }"#).unwrap();
        assert_eq!(config.defines.get("DEBUG").map(String::as_str), Some("1"));
        assert_eq!(config.max_line_length, None);
        assert!(!config.ignore_case_patterns);
        assert!(!config.compiler_version.is_empty());
    }

    #[test]
    fn context_carries_defines_and_version() {
        let config = Config {
            compiler_version: "3.5".to_string(),
            defines: BTreeMap::from([("DEBUG".to_string(), String::new())]),
            max_line_length: Some(500),
            ignore_case_patterns: true,
        };
        let context = config.preprocessor_context().unwrap();
        assert_eq!(context.version, Version::new(3, 5, 0, 0));
        assert!(context.macros.contains("DEBUG"));
        assert_eq!(context.max_line_length, Some(500));
        assert_eq!(config.match_option(), MatchOption::CaseInsensitive);
    }

    #[test]
    fn bad_version_is_an_invalid_argument() {
        let config = Config {
            compiler_version: "three".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.version(), Err(CompilerError::InvalidArgument(_))));
    }
}
