//! Unified error type for the inference client.
//!
//! Every failure is a per-call error surfaced to the caller; nothing here is
//! retried automatically or treated as fatal to the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// More than one top-level input mode was supplied for a task.
    #[error("More than one input type provided ({keys}). Please provide exactly one input mode.")]
    AmbiguousInput { keys: String },

    /// A value or record cannot be converted to wire form.
    #[error("Unsupported content type: {what}")]
    UnsupportedContentType { what: String },

    /// A task-specific required input or companion key is absent.
    #[error("Missing required input: please provide {key}.")]
    MissingRequiredInput { key: String },

    /// The `scale` parameter does not parse as `<int>:<int>`.
    #[error("Invalid scale `{given}`: {reason}")]
    InvalidScaleFormat { given: String, reason: String },

    /// The `quality` parameter is out of range or inapplicable.
    #[error("Invalid quality value `{given}`: {reason}")]
    InvalidQualityValue { given: String, reason: String },

    /// Invalid or expired auth token, or no token could be resolved.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// The discovery service does not know the requested model.
    #[error("Invalid model name `{model}` provided. Please visit the model registry to create and use the model names listed there.")]
    ModelNotFound { model: String },

    /// The service returned zero or degenerate results; usually a model
    /// configuration problem, not a transient failure.
    #[error("Empty result from service: {message}")]
    EmptyResult { message: String },

    /// A URI supplied as content could not be fetched.
    #[error("Failed to fetch `{uri}`: {message}")]
    UriFetch { uri: String, message: String },

    /// A host or discovered endpoint is unusable for this client.
    #[error("Invalid service endpoint: {0}")]
    Endpoint(String),

    /// The remote service answered with a non-success status.
    #[error("Remote service error (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn empty_result(message: impl Into<String>) -> Self {
        Error::EmptyResult {
            message: message.into(),
        }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        Error::UnsupportedContentType { what: what.into() }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth {
            message: message.into(),
        }
    }
}
