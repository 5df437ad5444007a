//! Settings maps and configuration overrides
//!
//! Every tool and component declares its behavior through named options.
//! `Settings` is the resolved option map handed to `configure`, built by
//! overlaying a node's explicit options onto the values it inherits from
//! its owner (child overrides parent, unset options inherit). `Overrides`
//! holds the harness-side `--name=value` arguments that win over both.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors raised while resolving configuration
///
/// Configuration is fail-closed: a missing required option or a value of
/// the wrong type aborts the lifecycle before any resource is acquired.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required option '{option}' for '{owner}'")]
    MissingOption { owner: String, option: String },

    #[error("invalid value for option '{option}' of '{owner}': expected {expected}, got {found}")]
    InvalidValue {
        owner: String,
        option: String,
        expected: &'static str,
        found: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to parse settings: {0}")]
    Parse(String),
}

/// A mapping of option name to value for one tool or component
///
/// The `owner` label names the tool/component the map resolves for and only
/// feeds error messages; it is not an option itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(skip)]
    owner: String,

    #[serde(flatten)]
    values: BTreeMap<String, Value>,
}

impl Settings {
    /// Create an empty settings map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty settings map labeled with its owner
    pub fn named(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            values: BTreeMap::new(),
        }
    }

    /// Parse a settings map from a YAML document
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a settings map from a YAML file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("failed to read {}: {e}", path.display())))?;
        let settings = Self::from_yaml(&text)?;
        debug!(path = %path.display(), options = settings.len(), "loaded settings file");
        Ok(settings)
    }

    /// Owner label used in error messages
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = owner.into();
    }

    /// Set an option value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style `set`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Raw value lookup
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `overrides` onto this map: every key of `self` is kept unless
    /// `overrides` sets it (child overrides parent, unset options inherit)
    pub fn overlaid(&self, overrides: &Settings) -> Settings {
        let mut merged = self.clone();
        merged.merge(overrides);
        merged
    }

    /// In-place overlay, keeping this map's owner label
    pub fn merge(&mut self, overrides: &Settings) {
        for (name, value) in &overrides.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    /// Optional string option
    pub fn get_str(&self, name: &str) -> Result<Option<&str>, ConfigError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.invalid(name, "a string", other)),
        }
    }

    /// Optional boolean option
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.invalid(name, "a boolean", other)),
        }
    }

    /// Optional integer option
    pub fn get_i64(&self, name: &str) -> Result<Option<i64>, ConfigError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(Value::Number(n)) if n.as_i64().is_some() => Ok(n.as_i64()),
            Some(other) => Err(self.invalid(name, "an integer", other)),
        }
    }

    /// Optional float option (integers widen)
    pub fn get_f64(&self, name: &str) -> Result<Option<f64>, ConfigError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(Value::Number(n)) if n.as_f64().is_some() => Ok(n.as_f64()),
            Some(other) => Err(self.invalid(name, "a number", other)),
        }
    }

    /// Optional path option
    pub fn get_path(&self, name: &str) -> Result<Option<PathBuf>, ConfigError> {
        Ok(self.get_str(name)?.map(PathBuf::from))
    }

    /// Required string option
    pub fn require_str(&self, name: &str) -> Result<&str, ConfigError> {
        self.get_str(name)?.ok_or_else(|| self.missing(name))
    }

    /// Required boolean option
    pub fn require_bool(&self, name: &str) -> Result<bool, ConfigError> {
        self.get_bool(name)?.ok_or_else(|| self.missing(name))
    }

    /// Required integer option
    pub fn require_i64(&self, name: &str) -> Result<i64, ConfigError> {
        self.get_i64(name)?.ok_or_else(|| self.missing(name))
    }

    /// Required float option
    pub fn require_f64(&self, name: &str) -> Result<f64, ConfigError> {
        self.get_f64(name)?.ok_or_else(|| self.missing(name))
    }

    /// Required path option
    pub fn require_path(&self, name: &str) -> Result<PathBuf, ConfigError> {
        self.get_path(name)?.ok_or_else(|| self.missing(name))
    }

    fn missing(&self, name: &str) -> ConfigError {
        ConfigError::MissingOption {
            owner: self.owner.clone(),
            option: name.to_string(),
        }
    }

    fn invalid(&self, name: &str, expected: &'static str, found: &Value) -> ConfigError {
        ConfigError::InvalidValue {
            owner: self.owner.clone(),
            option: name.to_string(),
            expected,
            found: found.to_string(),
        }
    }
}

/// Option overrides parsed from CLI-style arguments
///
/// `--name=value` targets the tool itself; `--Owner.name=value` targets the
/// tool or component whose `name()` is `Owner`. `--flag` with no value is
/// shorthand for `--flag=true`. Values parse as YAML scalars, so `--n=3`
/// sets an integer and `--dry-run=false` a boolean.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    global: Settings,
    scoped: BTreeMap<String, Settings>,
}

impl Overrides {
    /// Parse overrides from argument strings
    pub fn parse<S: AsRef<str>>(arguments: &[S]) -> Result<Self, ConfigError> {
        let mut overrides = Self::default();

        for argument in arguments {
            let argument = argument.as_ref();
            let body = argument.strip_prefix("--").ok_or_else(|| {
                ConfigError::InvalidArgument(format!("expected --name=value, got '{argument}'"))
            })?;

            let (key, raw) = match body.split_once('=') {
                Some((key, raw)) => (key, Some(raw)),
                None => (body, None),
            };

            let value = match raw {
                Some(raw) => parse_scalar(raw),
                None => Value::Bool(true),
            };

            match key.split_once('.') {
                None if !key.is_empty() => overrides.global.set(key, value),
                Some((owner, option)) if !owner.is_empty() && !option.is_empty() => {
                    overrides.scoped.entry(owner.to_string()).or_default().set(option, value);
                }
                _ => {
                    return Err(ConfigError::InvalidArgument(format!(
                        "malformed option name in '{argument}'"
                    )));
                }
            }
        }

        Ok(overrides)
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.scoped.is_empty()
    }

    /// Overrides that apply to the root tool: global arguments plus any
    /// scoped to the tool's own name
    pub fn for_tool(&self, name: &str) -> Settings {
        let mut settings = self.global.clone();
        if let Some(scoped) = self.scoped.get(name) {
            settings.merge(scoped);
        }
        settings
    }

    /// Overrides scoped to a component name
    pub fn for_component(&self, name: &str) -> Settings {
        self.scoped.get(name).cloned().unwrap_or_default()
    }
}

/// Parse an override value as a YAML scalar, falling back to a plain string
fn parse_scalar(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_child_overrides_parent() {
        let parent = Settings::new().with("threshold", 5).with("mode", "fast");
        let child = Settings::new().with("threshold", 9);

        let effective = parent.overlaid(&child);

        assert_eq!(effective.require_i64("threshold").unwrap(), 9);
        // Unset child option inherits the parent value
        assert_eq!(effective.require_str("mode").unwrap(), "fast");
    }

    #[test]
    fn test_missing_required_option() {
        let settings = Settings::named("Calibrator");

        let err = settings.require_str("gain-file").unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingOption {
                owner: "Calibrator".to_string(),
                option: "gain-file".to_string(),
            }
        );
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let settings = Settings::named("Writer").with("max-events", "lots");

        let err = settings.require_i64("max-events").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(err.to_string().contains("max-events"));
    }

    #[test]
    fn test_float_accepts_integer() {
        let settings = Settings::new().with("scale", 2);
        assert_eq!(settings.require_f64("scale").unwrap(), 2.0);
    }

    #[test]
    fn test_from_yaml() {
        let settings = Settings::from_yaml("max-events: 100\noutput: out.h5\noverwrite: true\n").unwrap();

        assert_eq!(settings.require_i64("max-events").unwrap(), 100);
        assert_eq!(settings.require_path("output").unwrap(), PathBuf::from("out.h5"));
        assert!(settings.require_bool("overwrite").unwrap());
    }

    #[test]
    fn test_parse_global_and_scoped_overrides() {
        let overrides = Overrides::parse(&[
            "--output=result.h5",
            "--max-events=10",
            "--overwrite",
            "--EventSource.input=run1.dat",
        ])
        .unwrap();

        let tool = overrides.for_tool("Analysis");
        assert_eq!(tool.require_str("output").unwrap(), "result.h5");
        assert_eq!(tool.require_i64("max-events").unwrap(), 10);
        assert!(tool.require_bool("overwrite").unwrap());

        let source = overrides.for_component("EventSource");
        assert_eq!(source.require_str("input").unwrap(), "run1.dat");
        assert!(overrides.for_component("Unknown").is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_arguments() {
        assert!(matches!(
            Overrides::parse(&["output=x"]).unwrap_err(),
            ConfigError::InvalidArgument(_)
        ));
        assert!(matches!(
            Overrides::parse(&["--.option=x"]).unwrap_err(),
            ConfigError::InvalidArgument(_)
        ));
        assert!(matches!(
            Overrides::parse(&["--Component.=x"]).unwrap_err(),
            ConfigError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_scalar_parsing() {
        assert_eq!(parse_scalar("3"), Value::from(3));
        assert_eq!(parse_scalar("0.5"), Value::from(0.5));
        assert_eq!(parse_scalar("false"), Value::from(false));
        assert_eq!(parse_scalar("run1.dat"), Value::from("run1.dat"));
    }
}
