//! Error types for the Oodle provider.
//!
//! Three layers of failure are kept apart:
//!
//! - [`ConvertError`]: a configuration value could not be translated into
//!   the wire model. Always names the offending attribute path.
//! - [`ApiError`]: the backend call failed (transport, status, decoding).
//! - [`ProviderError`]: what a resource operation returns. Wraps the two
//!   above with operation context and renders into user-facing diagnostics.

use thiserror::Error;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::duration::DurationError;

/// A configuration value could not be converted into the domain model.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A required attribute was null.
    #[error("{path}: value is required")]
    Missing {
        /// Attribute path.
        path: String,
    },

    /// An attribute was still unknown where a concrete value is needed.
    #[error("{path}: value is unknown")]
    Unknown {
        /// Attribute path.
        path: String,
    },

    /// An identity or reference was not a valid UUID.
    #[error("{path}: invalid UUID {value:?}: {source}")]
    InvalidUuid {
        /// Attribute path.
        path: String,
        /// The rejected text.
        value: String,
        /// Parser error.
        #[source]
        source: uuid::Error,
    },

    /// A duration string did not match the duration grammar.
    #[error("{path}: {source}")]
    InvalidDuration {
        /// Attribute path.
        path: String,
        /// Parser error.
        #[source]
        source: DurationError,
    },

    /// A list or map element had the wrong type.
    #[error("{path}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Attribute path of the element.
        path: String,
        /// Expected element type.
        expected: &'static str,
        /// Actual element type.
        actual: &'static str,
    },

    /// A value was not one of the accepted choices.
    #[error("{path}: unknown value {value:?}, expected one of: {expected}")]
    InvalidChoice {
        /// Attribute path.
        path: String,
        /// The rejected value.
        value: String,
        /// Accepted values, comma separated.
        expected: String,
    },

    /// A tagged union had no member block, or the wrong one, populated.
    #[error("{path}: {message}")]
    Union {
        /// Attribute path of the union.
        path: String,
        /// What was wrong with the populated blocks.
        message: String,
    },

    /// An attribute holding JSON text did not parse.
    #[error("{path}: invalid JSON: {source}")]
    InvalidJson {
        /// Attribute path.
        path: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConvertError {
    /// The attribute path this error refers to.
    pub fn path(&self) -> &str {
        match self {
            Self::Missing { path }
            | Self::Unknown { path }
            | Self::InvalidUuid { path, .. }
            | Self::InvalidDuration { path, .. }
            | Self::TypeMismatch { path, .. }
            | Self::InvalidChoice { path, .. }
            | Self::Union { path, .. }
            | Self::InvalidJson { path, .. } => path,
        }
    }

    /// Build a [`ConvertError::Union`].
    pub fn union(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Union {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a [`ConvertError::InvalidChoice`] from the list of accepted values.
    pub fn choice(path: impl Into<String>, value: impl Into<String>, expected: &[&str]) -> Self {
        Self::InvalidChoice {
            path: path.into(),
            value: value.into(),
            expected: expected.join(", "),
        }
    }
}

/// Errors returned by the backend transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response not received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered 404.
    #[error("resource not found at {path}")]
    NotFound {
        /// Request path.
        path: String,
    },

    /// The backend answered with any other non-success status.
    #[error("API request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// A success response could not be decoded into the model.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Decoder message with a short body preview.
        message: String,
        /// Full response body.
        body: String,
    },

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The API key cannot be sent as a header value.
    #[error("API key is not a valid header value")]
    InvalidApiKey,
}

impl ApiError {
    /// Whether the backend reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// The lifecycle step a backend error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create.
    Create,
    /// Read.
    Read,
    /// Update.
    Update,
    /// Delete.
    Delete,
}

impl Action {
    /// The diagnostic summary used for failures of this action.
    pub fn title(self) -> &'static str {
        match self {
            Self::Create => "Error Creating Model",
            Self::Read => "Error Reading Model",
            Self::Update => "Error Updating Model",
            Self::Delete => "Error Deleting Model",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(verb)
    }
}

fn id_suffix(id: &str) -> String {
    if id.is_empty() {
        String::new()
    } else {
        format!(" ID {}", id)
    }
}

/// Errors that can occur while serving a resource operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The plan or state could not be converted into the domain model.
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConvertError),

    /// A backend call failed.
    #[error("Could not {action} {kind}{}: {source}", id_suffix(.id))]
    Backend {
        /// The lifecycle step.
        action: Action,
        /// Human readable resource kind, e.g. `monitor`.
        kind: &'static str,
        /// The resource identifier, empty before create.
        id: String,
        /// The transport error.
        #[source]
        source: ApiError,
    },

    /// A backend transport error outside any resource operation.
    #[error("Transport error: {0}")]
    Transport(#[from] ApiError),

    /// The state carried no concrete ID.
    #[error("ID is not set: {0}")]
    MissingId(String),

    /// An operation collected error diagnostics.
    #[error("Operation failed: {0}")]
    Diagnostics(Diagnostics),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::MissingId(msg)
            | Self::Unimplemented(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Conversion(err) => err.to_string(),
            Self::Backend { source, .. } => source.to_string(),
            Self::Transport(err) => err.to_string(),
            Self::Diagnostics(diags) => diags.to_string(),
        }
    }

    /// Build a [`ProviderError::Backend`].
    pub fn backend(
        action: Action,
        kind: &'static str,
        id: impl Into<String>,
        source: ApiError,
    ) -> Self {
        Self::Backend {
            action,
            kind,
            id: id.into(),
            source,
        }
    }

    /// Render this error as user-facing diagnostics.
    pub fn to_diagnostics(&self) -> Diagnostics {
        match self {
            Self::Diagnostics(diags) => diags.clone(),
            Self::Conversion(err) => Diagnostic::error("Failed to convert plan to model")
                .with_detail(err.to_string())
                .with_attribute(err.path())
                .into(),
            Self::Backend { action, .. } => Diagnostic::error(action.title())
                .with_detail(self.to_string())
                .into(),
            Self::MissingId(msg) => Diagnostic::error("ID is not set")
                .with_detail(msg.clone())
                .into(),
            Self::Configuration(msg) => Diagnostic::error("Provider not configured")
                .with_detail(msg.clone())
                .into(),
            _ => Diagnostic::error(self.to_string()).into(),
        }
    }
}
