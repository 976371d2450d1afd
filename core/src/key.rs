//! Logical keys and their wire encoding.
//!
//! Lock names and metadata keys are arbitrary strings in the domain model.
//! On the wire they travel as URL-safe base64 without padding: in request
//! paths and query values prefixed with `base64:`, in response bodies as the
//! bare encoded text.

use std::fmt;

use base64::{
    alphabet::URL_SAFE,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use crate::error::{ApiError, Result};

const PATH_PREFIX: &str = "base64:";

const CODEC: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A human-readable identifier for a lock, a metadata entry or a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Decodes a key as it appears in a response body.
    pub fn from_wire(field: &str) -> Result<Self> {
        decode(field).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `base64:<encoded>`, the form used in paths and query values.
    pub fn path_segment(&self) -> String {
        encode(&self.0)
    }

    /// The bare base64 form used in response and request bodies.
    pub fn wire(&self) -> String {
        encode_bytes(self.0.as_bytes())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Encodes `key` into a path segment: `"foo/bar"` becomes `base64:Zm9vL2Jhcg`.
pub fn encode(key: &str) -> String {
    format!("{PATH_PREFIX}{}", encode_bytes(key.as_bytes()))
}

pub(crate) fn encode_bytes(bytes: &[u8]) -> String {
    CODEC.encode(bytes)
}

/// Decodes a raw base64 field from a response body back into its string form.
pub fn decode(field: &str) -> Result<String> {
    let bytes = CODEC
        .decode(field)
        .map_err(|e| ApiError::InvalidEncoding(format!("{field:?}: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ApiError::InvalidEncoding(format!("{field:?}: {e}")))
}

/// Path of a single item: `{base}/{encoded}`.
pub fn leaf_path(base: &str, key: &Key) -> String {
    format!("{base}/{}", key.path_segment())
}

/// Path of a directory listing. The root (no key, or an empty key) adds no
/// segment; any other directory renders with a trailing separator.
pub fn directory_path(base: &str, directory: Option<&Key>) -> String {
    match directory {
        Some(dir) if !dir.is_empty() => format!("{base}/{}/", dir.path_segment()),
        _ => base.to_string(),
    }
}

/// `from=<percent-encoded path segment>` for forward-cursor listings.
pub fn from_query(cursor: &Key) -> String {
    format!("from={}", urlencoding::encode(&cursor.path_segment()))
}
