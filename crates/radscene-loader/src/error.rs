//! Error types for scene loading.

use radscene_tessellate::SurfaceError;
use thiserror::Error;

/// Hard errors that abort a load and surface to the caller.
///
/// Per-primitive problems never end up here; they become diagnostics.
#[derive(Error, Debug)]
pub enum LoadError {
    /// I/O error reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration text is not valid TOML for [`crate::LoaderConfig`].
    #[error("failed to parse configuration: {0}")]
    ConfigSyntax(#[from] toml::de::Error),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A pipeline worker thread panicked.
    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),

    /// Unexpected failure while aggregating the scene graph.
    #[error("aggregation failed: {0}")]
    Aggregation(String),
}

impl LoadError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an aggregation error.
    pub fn aggregation(message: impl Into<String>) -> Self {
        Self::Aggregation(message.into())
    }
}

/// Problems with a single raw record that prevent typing it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Fewer than the three header tokens. Dropped without a diagnostic.
    #[error("record has {count} tokens, at least 3 required")]
    TooFewTokens {
        /// Number of tokens found.
        count: usize,
    },

    /// A real argument is not a number.
    #[error("{type_name} {name}: invalid real argument '{token}'")]
    InvalidNumber {
        /// Primitive type.
        type_name: String,
        /// Primitive name.
        name: String,
        /// Offending token.
        token: String,
    },

    /// A sphere needs a center and a radius.
    #[error("sphere {name}: expected 4 real arguments, got {count}")]
    SphereArguments {
        /// Primitive name.
        name: String,
        /// Number of real values found.
        count: usize,
    },
}

/// A polygon whose preview surface could not be built.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("polygon {name}: {source}")]
pub struct GeometryConstructionFailure {
    /// Name of the failed primitive.
    pub name: String,
    /// Why the surface failed.
    #[source]
    pub source: SurfaceError,
}
