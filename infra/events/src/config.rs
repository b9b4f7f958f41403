use crate::builder::DEFAULT_NAME;
use config::{Config, Environment, File};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

const ENV_PREFIX: &str = "TINYBUS";

/// Errors raised while loading configuration.
#[tinybus_derive::tinybus_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Which built-in timing collaborator a dispatcher uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingMode {
    /// Correlation ids from nanoid, start/finish records at `trace` level.
    #[default]
    Tracing,
    /// Sequential correlation ids, no records.
    Disabled,
}

/// Construction-time settings of a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub name: String,
    pub timing: TimingMode,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { name: DEFAULT_NAME.to_owned(), timing: TimingMode::default() }
    }
}

/// Loads `T` from an optional file overlaid with `TINYBUS__*` environment variables.
///
/// The file format follows the extension (`.toml`, `.json`, `.yaml`, ...). Nested
/// keys are separated by a double underscore, e.g. `TINYBUS__DISPATCHER__NAME`
/// maps to `dispatcher.name`.
///
/// # Errors
/// Returns [`ConfigError::Config`] if a present file cannot be parsed, or the
/// merged sources do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use tinybus::{DispatcherConfig, load_config};
///
/// let cfg: DispatcherConfig = load_config(None::<&str>).unwrap_or_default();
/// assert!(!cfg.name.is_empty());
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();
    if let Some(path) = path {
        let path = path.as_ref();
        info!("Loading config from {}", path.display());
        builder = builder.add_source(File::from(path).required(false));
    }

    builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_sane() {
        let cfg = DispatcherConfig::default();
        assert_eq!(cfg.name, "tinybus");
        assert_eq!(cfg.timing, TimingMode::Tracing);
    }

    #[test]
    fn deserializes_partial_input() {
        let cfg: DispatcherConfig =
            serde_json::from_value(json!({ "timing": "disabled" })).expect("config deserialize");
        assert_eq!(cfg.name, "tinybus");
        assert_eq!(cfg.timing, TimingMode::Disabled);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bus.toml");
        std::fs::write(&path, "name = \"orders\"\ntiming = \"disabled\"\n").expect("write config");

        let cfg: DispatcherConfig = load_config(Some(&path)).expect("config load");
        assert_eq!(cfg, DispatcherConfig { name: "orders".to_owned(), timing: TimingMode::Disabled });
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg: DispatcherConfig =
            load_config(Some(dir.path().join("absent.toml"))).expect("config load");
        assert_eq!(cfg, DispatcherConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bus.toml");
        std::fs::write(&path, "timing = \"sometimes\"\n").expect("write config");

        let err = load_config::<DispatcherConfig>(Some(&path)).expect_err("bad timing mode");
        assert!(matches!(err, ConfigError::Config { context: Some(_), .. }));
    }
}
