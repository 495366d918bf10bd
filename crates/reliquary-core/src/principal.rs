//! Caller identities.
//!
//! A [`Principal`] is an opaque 32-byte identity. The registry never
//! authenticates principals; the host environment hands them over already
//! verified and the registry only compares them against stored guardians.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain separator for label-derived principals.
const DERIVE_CONTEXT: &str = "reliquary-principal-v1:";

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal([u8; 32]);

#[derive(Debug, Error, PartialEq)]
#[error("invalid principal hex: {0}")]
pub struct PrincipalParseError(#[from] hex::FromHexError);

impl Principal {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Deterministically derive a principal from a human-readable label.
    /// The same label always yields the same principal.
    pub fn derive(label: &str) -> Self {
        let input = format!("{DERIVE_CONTEXT}{label}");
        Self(*blake3::hash(input.as_bytes()).as_bytes())
    }

    pub fn random() -> Self {
        Self(rand::random::<[u8; 32]>())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Principal {
    type Err = PrincipalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Principal {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({}..)", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
