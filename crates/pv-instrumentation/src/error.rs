// error.rs — Error types for the page-view instrumentation.
//
// Failures are structural and surface at the boundary: a host without
// history primitives, a provider that cannot supply a sink, a bad config
// file. Detection and enrichment themselves never fail.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by a history primitive.
///
/// A wrapped primitive hands these back exactly as the original produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The URL argument resolves outside the document's origin.
    #[error("cannot navigate to '{url}' from origin '{origin}'")]
    SecurityError { url: String, origin: String },

    /// The URL argument cannot be parsed against the current location.
    #[error("'{url}' is not a valid URL relative to '{base}'")]
    InvalidUrl { url: String, base: String },

    /// The host has no primitive installed for the requested method.
    #[error("host has no '{primitive}' primitive")]
    MissingPrimitive { primitive: String },
}

/// Errors surfaced to whatever owns the instrumentation lifecycle.
#[derive(Debug, Error)]
pub enum InstrumentationError {
    /// Required host navigation primitives are absent. Not retried.
    #[error("platform unsupported: missing {missing}")]
    PlatformUnsupported { missing: String },

    /// No emission sink could be obtained for the logger scope.
    #[error("no emission sink available for scope '{scope}'")]
    SinkUnavailable { scope: String },

    /// Failed to read a config file.
    #[error("failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A config file is not valid TOML for this schema.
    #[error("invalid config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
