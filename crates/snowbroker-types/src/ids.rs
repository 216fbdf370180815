//! Identifiers used throughout Snowbroker.
//!
//! Session ids are chosen by the proxy and treated as opaque strings.
//! Bridge fingerprints are the 20-byte relay identity a client asks for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use crate::BrokerError;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque identifier of one proxy registration.
///
/// Only unique for the lifetime of the registration that carries it; the
/// broker never relies on global uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// BridgeFingerprint
// ---------------------------------------------------------------------------

/// Identity of the bridge a client wants its proxy to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct BridgeFingerprint(pub [u8; 20]);

impl BridgeFingerprint {
    /// Fingerprint assumed when a client leaves the field empty.
    #[must_use]
    pub const fn default_bridge() -> Self {
        // Bytes of `constants::DEFAULT_BRIDGE_FINGERPRINT`.
        Self([
            0x2B, 0x28, 0x0B, 0x23, 0xE1, 0x10, 0x7B, 0xB6, 0x2A, 0xBF, 0xC4, 0x0D, 0xDC, 0xC8,
            0x82, 0x48, 0x14, 0xF8, 0x0A, 0x72,
        ])
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Upper-case hex, the form used on the wire and in bridge lists.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl FromStr for BridgeFingerprint {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 {
            return Err(BrokerError::InvalidFingerprint {
                reason: format!("expected 40 hex characters, got {}", s.len()),
            });
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| BrokerError::InvalidFingerprint {
            reason: e.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for BridgeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
