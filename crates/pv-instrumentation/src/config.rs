// config.rs — Instrumentation configuration.
//
// Every field has a default, so an empty TOML file (or no file at all)
// yields a working config. The sink provider is a runtime object and is
// supplied through the builder, not through this struct.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InstrumentationError;

/// When a deferred side effect happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Deferred until `enable()`.
    #[default]
    OnEnable,
    /// Performed while the controller is being built.
    OnConstruct,
}

/// Page-view instrumentation configuration, e.g. from `page_view.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Logger scope requested from the sink provider and stamped on records.
    #[serde(default = "default_logger_name")]
    pub logger_name: String,

    /// When the history primitives get wrapped.
    #[serde(default)]
    pub history_activation: Activation,

    /// When the sink provider is asked for a sink.
    #[serde(default)]
    pub sink_resolution: Activation,

    /// Restore the original history primitives on `disable()`.
    #[serde(default = "default_restore_history_on_disable")]
    pub restore_history_on_disable: bool,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            logger_name: default_logger_name(),
            history_activation: Activation::default(),
            sink_resolution: Activation::default(),
            restore_history_on_disable: default_restore_history_on_disable(),
        }
    }
}

// Serde default functions
fn default_logger_name() -> String {
    "page_view_event".to_string()
}

fn default_restore_history_on_disable() -> bool {
    true
}

impl InstrumentationConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, InstrumentationError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| InstrumentationError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        toml::from_str(&content).map_err(|source| InstrumentationError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load config, returning defaults if the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::debug!("using default instrumentation config: {}", e);
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page_view.toml");
        std::fs::write(&path, "").unwrap();

        let config = InstrumentationConfig::load(&path).unwrap();
        assert_eq!(config, InstrumentationConfig::default());
        assert_eq!(config.logger_name, "page_view_event");
        assert_eq!(config.history_activation, Activation::OnEnable);
        assert!(config.restore_history_on_disable);
    }

    #[test]
    fn parses_all_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page_view.toml");
        std::fs::write(
            &path,
            r#"
logger_name = "spa_views"
history_activation = "on_construct"
sink_resolution = "on_construct"
restore_history_on_disable = false
"#,
        )
        .unwrap();

        let config = InstrumentationConfig::load(&path).unwrap();
        assert_eq!(config.logger_name, "spa_views");
        assert_eq!(config.history_activation, Activation::OnConstruct);
        assert_eq!(config.sink_resolution, Activation::OnConstruct);
        assert!(!config.restore_history_on_disable);
    }

    #[test]
    fn invalid_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page_view.toml");
        std::fs::write(&path, "history_activation = \"sometimes\"").unwrap();

        assert!(matches!(
            InstrumentationConfig::load(&path),
            Err(InstrumentationError::ConfigParse { .. })
        ));
        assert_eq!(
            InstrumentationConfig::load_or_default(&path),
            InstrumentationConfig::default()
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(matches!(
            InstrumentationConfig::load(&path),
            Err(InstrumentationError::ConfigRead { .. })
        ));
        assert_eq!(
            InstrumentationConfig::load_or_default(&path),
            InstrumentationConfig::default()
        );
    }
}
