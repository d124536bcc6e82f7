use std::path::Path;

use serde::Deserialize;

use crate::error::EngineError;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuarryConfig {
    /// Namespaces scanned for filter sources.
    /// `None` disables discovery (the registry logs a warning and carries on).
    #[serde(default)]
    pub namespaces: Option<Vec<String>>,

    /// Conversion backend settings.
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Filter prototype definitions, in registration order.
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

/// Formats used by the standard backend. The first entry of each list is
/// also used when formatting values back to text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversionConfig {
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    #[serde(default = "default_time_formats")]
    pub time_formats: Vec<String>,
    #[serde(default = "default_timestamp_formats")]
    pub timestamp_formats: Vec<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            date_formats: default_date_formats(),
            time_formats: default_time_formats(),
            timestamp_formats: default_timestamp_formats(),
        }
    }
}

fn default_date_formats() -> Vec<String> {
    vec!["%Y-%m-%d".into()]
}

fn default_time_formats() -> Vec<String> {
    vec!["%H:%M:%S".into(), "%H:%M:%S%.f".into(), "%H:%M".into()]
}

fn default_timestamp_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d %H:%M:%S".into(),
        "%Y-%m-%d %H:%M:%S%.f".into(),
        "%Y-%m-%dT%H:%M:%S".into(),
        "%Y-%m-%dT%H:%M:%S%.f".into(),
    ]
}

/// One filter prototype.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterConfig {
    /// Kind the prototype is registered under.
    pub kind: String,
    /// Factory name in the `FilterCatalog`. Defaults to `kind`.
    #[serde(default)]
    pub factory: Option<String>,
    /// Fully-qualified filter-source name the filter works on.
    #[serde(default)]
    pub source: Option<String>,
    /// Factory-specific options, format-independent.
    #[serde(default)]
    pub options: Option<serde_json::Value>,
}

impl FilterConfig {
    pub fn factory_name(&self) -> &str {
        self.factory.as_deref().unwrap_or(&self.kind)
    }
}

/// Configuration file format.
///
/// TOML is built in; other formats (HCL, ...) live in their own crates and
/// are passed to [`QuarryConfig::load_with`].
pub trait ConfigParser: Send + Sync {
    /// File extensions handled by this parser, without the dot.
    fn extensions(&self) -> &[&str];

    fn parse(&self, content: &str) -> Result<QuarryConfig, EngineError>;
}

pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, content: &str) -> Result<QuarryConfig, EngineError> {
        QuarryConfig::parse(content)
    }
}

impl QuarryConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Self::load_with(path, &[&TomlParser])
    }

    /// Load configuration, picking the parser by file extension.
    pub fn load_with(path: impl AsRef<Path>, parsers: &[&dyn ConfigParser]) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let parser = parsers
            .iter()
            .find(|p| p.extensions().contains(&ext))
            .ok_or_else(|| {
                EngineError::Config(format!(
                    "{}: no parser for extension '{ext}'",
                    path.display()
                ))
            })?;
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parser
            .parse(&content)
            .map_err(|e| e.with_context(path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }
}
