//! Configuration for parsing and rendering twts.
//!
//! Configuration is read from `~/.config/twtxt/config.toml`.
//! If the file doesn't exist, defaults are used.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub site: SiteConfig,
}

/// Parser behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Treat unterminated code fences as errors instead of plain text (default: false)
    pub strict: bool,

    /// Maximum number of diagnostics kept per parse (default: 100)
    pub max_diagnostics: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_diagnostics: 100,
        }
    }
}

impl ParserConfig {
    /// Parser settings that reject malformed code fences.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }
}

/// Where links produced while rendering point to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Public base URL of this site (default: "http://localhost:8000")
    pub base_url: String,

    /// Path prefix of user pages (default: "/user/")
    pub user_path: String,

    /// Path and query prefix of tag searches (default: "/search?tag=")
    pub tag_path: String,

    /// Path of the external profile page (default: "/external")
    pub external_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            user_path: "/user/".to_string(),
            tag_path: "/search?tag=".to_string(),
            external_path: "/external".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, or defaults if there is no file.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a given file.
    ///
    /// Missing fields in the config file will use default values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/twtxt/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("twtxt").join("config.toml"))
    }

    /// Default config file content with comments.
    pub fn default_config_content() -> String {
        r##"# twtxt configuration

[parser]
# Reject twts with unterminated code fences instead of keeping them as text
strict = false

# Maximum number of diagnostics kept per parse
max_diagnostics = 100

[site]
# Public base URL, used to tell local feeds from external ones
base_url = "http://localhost:8000"

# Path prefix of user pages
user_path = "/user/"

# Path and query prefix used to link #tags
tag_path = "/search?tag="

# Page showing the profile of an external feed
external_path = "/external"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert!(!config.parser.strict);
        assert_eq!(config.parser.max_diagnostics, 100);
        assert_eq!(config.site.base_url, "http://localhost:8000");
        assert_eq!(config.site.tag_path, "/search?tag=");
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[site]
base_url = "https://pod.example"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.site.base_url, "https://pod.example");
        assert_eq!(config.site.user_path, "/user/");
        assert_eq!(config.parser.max_diagnostics, 100);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert!(!config.parser.strict);
        assert_eq!(config.site.external_path, "/external");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parser]\nstrict = true").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert!(config.parser.strict);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parser\nstrict = ").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_strict_parser_config() {
        let config = ParserConfig::strict();
        assert!(config.strict);
        assert_eq!(config.max_diagnostics, 100);
    }
}
