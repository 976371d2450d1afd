//! Error types for the platform client.
//!
//! # Design
//! Three families come from the request pipeline itself: caller mistakes
//! caught before any I/O (`Validation`), credential problems (`Auth`) and
//! failures of the host transport (`Transport`). The remaining variants
//! describe what a resource endpoint answered. `NotFound` gets a dedicated
//! variant because callers frequently distinguish "the resource does not
//! exist" from "the server returned an unexpected status."

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by every operation of the core.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller supplied a structurally invalid input. Raised before any
    /// network call.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 401 and 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A wire identifier was not valid base64, or did not decode to UTF-8.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Credential failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity endpoint refused the exchange or answered without a token.
    #[error("token exchange failed with HTTP {status}: {body}")]
    Exchange { status: u16, body: String },

    /// A resource endpoint rejected the bearer token and no further renewal
    /// is permitted.
    #[error("request rejected as unauthenticated (HTTP {status})")]
    Rejected { status: u16 },
}

/// The host transport could not complete the round-trip.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}
