//! Chat configuration, persisted as TOML.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! bundled knowledge base, the built-in glucose override and the original
//! greeting and pacing.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{DEFAULT_GREETING, DEFAULT_SESSION_IDLE};
use crate::resolve::OverrideRule;

/// Environment variable consulted when no `--config` is given.
pub const CONFIG_ENV: &str = "SILENTRISK_CONFIG";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(silentrisk::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(silentrisk::config::parse),
        help("Check the TOML syntax. Known keys: knowledge_base, typing_delay_ms, greeting, session_idle_secs, [[overrides]].")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(silentrisk::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// External topics file replacing the bundled knowledge base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<PathBuf>,
    /// Cosmetic "typing" pause before a reply is shown, in milliseconds.
    /// Applied by interactive front-ends only; resolution never waits.
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,
    /// First bot message of every session.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Extra personal-data rules, evaluated after the built-in glucose rule.
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
    /// Server sessions idle longer than this are dropped.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_typing_delay_ms() -> u64 {
    1500
}
fn default_greeting() -> String {
    DEFAULT_GREETING.into()
}
fn default_session_idle_secs() -> u64 {
    DEFAULT_SESSION_IDLE.as_secs()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            knowledge_base: None,
            typing_delay_ms: default_typing_delay_ms(),
            greeting: default_greeting(),
            overrides: Vec::new(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl ChatConfig {
    /// Load from a TOML file. A relative `knowledge_base` path is resolved
    /// against the config file's directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let (Some(kb), Some(dir)) = (config.knowledge_base.as_mut(), path.parent()) {
            if kb.is_relative() {
                *kb = dir.join(&*kb);
            }
        }
        tracing::info!(path = %path.display(), overrides = config.overrides.len(), "config loaded");
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Explicit path first, then `$SILENTRISK_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                tracing::debug!("no config given, using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::MetricKind;

    #[test]
    fn empty_file_gives_defaults() {
        let config: ChatConfig = toml::from_str("").unwrap();
        assert_eq!(config, ChatConfig::default());
        assert_eq!(config.typing_delay_ms, 1500);
        assert_eq!(config.greeting, DEFAULT_GREETING);
        assert_eq!(config.session_idle_secs, 1800);
    }

    #[test]
    fn parses_override_rules() {
        let config: ChatConfig = toml::from_str(
            r#"
typing_delay_ms = 0

[[overrides]]
topic = "bp"
metric = "systolic_bp"
personal_cues = ["my"]
metric_cues = ["blood pressure", "bp"]
threshold = 130.0
"#,
        )
        .unwrap();
        assert_eq!(config.typing_delay_ms, 0);
        assert_eq!(config.overrides.len(), 1);
        assert_eq!(config.overrides[0].metric, MetricKind::SystolicBp);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("silentrisk.toml");
        let config = ChatConfig {
            typing_delay_ms: 250,
            greeting: "Hi.".into(),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ChatConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn relative_knowledge_base_is_anchored_to_config_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("silentrisk.toml");
        std::fs::write(&path, "knowledge_base = \"topics.toml\"\n").unwrap();
        let config = ChatConfig::load(&path).unwrap();
        assert_eq!(config.knowledge_base, Some(dir.path().join("topics.toml")));
    }

    #[test]
    fn bad_toml_reports_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "typing_delay_ms = \"soon\"").unwrap();
        assert!(matches!(ChatConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            ChatConfig::resolve(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
