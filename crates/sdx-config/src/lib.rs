//! Configuration and logging bootstrap for sdx.
//!
//! A `ReflectionConfig` is usually loaded once from a TOML file:
//!
//! ```toml
//! [lookup]
//! class = "com.example.App"
//! mode = "full"
//!
//! [scan]
//! type_suffix = ".class"
//! roots = ["target/classes"]
//!
//! [logging]
//! level = "debug"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Once;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const DEFAULT_TYPE_SUFFIX: &str = ".class";

/// How much a privileged-access context may see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    /// Public members of public classes only.
    Public,
    /// Adds package-private and protected members of the lookup class's package.
    Package,
    /// Adds protected members through subclassing and private members of the lookup class's
    /// nest.
    #[default]
    Full,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupConfig {
    /// Binary name of the class whose access rights the lookup carries.
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub mode: LookupMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Resource suffix that marks a class definition.
    #[serde(default = "ScanConfig::default_type_suffix")]
    pub type_suffix: String,

    /// Class output directories. Empty means "scan the registered type store".
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

impl ScanConfig {
    fn default_type_suffix() -> String {
        DEFAULT_TYPE_SUFFIX.to_owned()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            type_suffix: Self::default_type_suffix(),
            roots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Either a simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    /// `level` as filter directives: bare level names are lowercased (`warning` becomes `warn`),
    /// anything else is passed through as written.
    pub(crate) fn directives(&self) -> String {
        let level = self.level.trim();
        match level.to_ascii_lowercase().as_str() {
            "" => Self::default_level(),
            "warning" => "warn".to_owned(),
            name @ ("trace" | "debug" | "info" | "warn" | "error") => name.to_owned(),
            _ => level.to_owned(),
        }
    }

    /// The effective filter: the configured directives followed by `RUST_LOG`, so that the
    /// environment wins where both name the same target. Unparsable directives are dropped and
    /// anything left unmatched logs at `info`.
    pub fn env_filter(&self) -> EnvFilter {
        let mut directives = self.directives();
        if let Ok(env) = std::env::var(EnvFilter::DEFAULT_ENV) {
            if !env.trim().is_empty() {
                directives.push(',');
                directives.push_str(env.trim());
            }
        }
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse_lossy(directives)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReflectionConfig {
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep the message only.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl ReflectionConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: ReflectionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.type_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "scan.type_suffix must not be empty".to_owned(),
            ));
        }
        if let Some(class) = &self.lookup.class {
            if class.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "lookup.class must not be blank".to_owned(),
                ));
            }
        }
        Ok(())
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the global `tracing` subscriber.
///
/// Only the first call has an effect; later calls (and calls made after another subscriber was
/// installed) are no-ops.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        // `cargo test` only captures output written through the stdlib print macros.
        let make_writer = if cfg!(debug_assertions) {
            BoxMakeWriter::new(tracing_subscriber::fmt::writer::TestWriter::with_stderr)
        } else {
            BoxMakeWriter::new(std::io::stderr)
        };

        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!(
                target: "sdx.config",
                level = %config.level,
                json = config.json,
                "tracing initialized"
            );
        }
    });
}
