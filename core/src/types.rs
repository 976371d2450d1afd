//! Enumerations shared by the resource clients.
//!
//! Each enum maps one-to-one onto the literals the platform puts on the
//! wire. Deserializing an unknown literal is an error rather than a silent
//! fallback to some default variant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Geographic regions a restriction can allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "XA")]
    Asia,
    #[serde(rename = "XC")]
    RepublicOfChina,
    #[serde(rename = "XE")]
    Europe,
    #[serde(rename = "XF")]
    Africa,
    #[serde(rename = "XN")]
    NorthAmerica,
    #[serde(rename = "XO")]
    Oceania,
    #[serde(rename = "XQ")]
    Antarctica,
    #[serde(rename = "XS")]
    SouthAmerica,
    #[serde(rename = "XU")]
    Uk,
}

/// Cloud providers a restriction can allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    Aws,
    Azure,
    DigitalOcean,
    Equinix,
    Gcp,
}

/// The service a restriction applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestrictedApi {
    #[serde(rename = "locks")]
    Locks,
    #[serde(rename = "config")]
    Metadata,
}

impl RestrictedApi {
    /// The literal used in paths and query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            RestrictedApi::Locks => "locks",
            RestrictedApi::Metadata => "config",
        }
    }
}

impl fmt::Display for RestrictedApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestrictionState {
    Enforced,
    Pending,
}
