//! Payloads handed between the two sides of a match.
//!
//! The broker never looks inside SDP strings; they travel as opaque text.

use serde::{Deserialize, Serialize};

use crate::{NatType, ProxyType, SessionId};

/// A proxy's request to be matched, normalised from whatever wire version
/// carried it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRegistration {
    pub id: SessionId,
    pub proxy_type: ProxyType,
    pub nat_type: NatType,
    /// Clients the proxy currently serves (already rounded by the proxy).
    pub load: u32,
}

impl ProxyRegistration {
    #[must_use]
    pub fn new(id: impl Into<SessionId>, proxy_type: ProxyType, nat_type: NatType, load: u32) -> Self {
        Self {
            id: id.into(),
            proxy_type,
            nat_type,
            load,
        }
    }

    /// Minimal registration for tests: standalone proxy, given NAT, zero load.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn dummy(id: &str, nat_type: NatType) -> Self {
        Self::new(id, ProxyType::Standalone, nat_type, 0)
    }
}

/// A client's SDP offer together with the client's NAT class.
///
/// This is what a matched proxy receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOffer {
    pub sdp: String,
    pub nat_type: NatType,
}

impl ClientOffer {
    #[must_use]
    pub fn new(sdp: impl Into<String>, nat_type: NatType) -> Self {
        Self {
            sdp: sdp.into(),
            nat_type,
        }
    }

    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn dummy(nat_type: NatType) -> Self {
        Self::new("v=0 fake offer", nat_type)
    }
}
