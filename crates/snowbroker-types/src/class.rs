//! Peer classes: the NAT behaviour a peer reports and the proxy flavour.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::BrokerError;

/// NAT class reported by a client or proxy.
///
/// A `Restricted` peer sits behind address- or port-dependent mapping and can
/// only be reached by an `Unrestricted` peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NatType {
    #[default]
    Unknown,
    Restricted,
    Unrestricted,
}

impl NatType {
    pub const ALL: [Self; 3] = [Self::Unknown, Self::Restricted, Self::Unrestricted];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Restricted => "restricted",
            Self::Unrestricted => "unrestricted",
        }
    }

    /// Parse a wire value where an empty string means "not measured".
    pub fn from_wire(s: &str) -> Result<Self, BrokerError> {
        if s.is_empty() {
            return Ok(Self::Unknown);
        }
        s.parse()
    }
}

impl FromStr for NatType {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "restricted" => Ok(Self::Restricted),
            "unrestricted" => Ok(Self::Unrestricted),
            other => Err(BrokerError::InvalidNatType(other.to_string())),
        }
    }
}

impl fmt::Display for NatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implementation flavour a proxy declares when polling. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    Standalone,
    Webext,
    /// Browser-embedded badge proxy.
    Badge,
    Iptproxy,
    #[default]
    Unknown,
}

impl ProxyType {
    pub const ALL: [Self; 5] = [
        Self::Standalone,
        Self::Webext,
        Self::Badge,
        Self::Iptproxy,
        Self::Unknown,
    ];

    /// Map a declared label; anything unrecognised counts as `Unknown`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "standalone" => Self::Standalone,
            "webext" => Self::Webext,
            "badge" => Self::Badge,
            "iptproxy" => Self::Iptproxy,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Webext => "webext",
            Self::Badge => "badge",
            Self::Iptproxy => "iptproxy",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
