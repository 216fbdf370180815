//! Checks and JSON helpers shared by every message kind.

use serde::Serialize;
use serde::de::DeserializeOwned;
use snowbroker_types::constants::{MAX_MESSAGE_BYTES, PROTOCOL_MAJOR_VERSION};
use snowbroker_types::{BrokerError, Result};

/// Reject bodies over the accepted request size.
pub fn check_size(body: &[u8]) -> Result<()> {
    if body.len() > MAX_MESSAGE_BYTES {
        return Err(BrokerError::MessageTooLarge {
            size: body.len(),
            limit: MAX_MESSAGE_BYTES,
        });
    }
    Ok(())
}

/// Accept `<major>.<minor>` where major is the supported protocol version.
///
/// Minor revisions only add optional fields, so any minor is accepted.
pub fn check_version(version: &str) -> Result<()> {
    let unsupported = || BrokerError::UnsupportedVersion(version.to_string());
    let (major, minor) = version.split_once('.').ok_or_else(unsupported)?;
    let major: u32 = major.parse().map_err(|_| unsupported())?;
    if minor.is_empty() || !minor.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unsupported());
    }
    if major != PROTOCOL_MAJOR_VERSION {
        return Err(unsupported());
    }
    Ok(())
}

pub(crate) fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| BrokerError::Malformed {
        reason: e.to_string(),
    })
}

pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| BrokerError::Serialization(e.to_string()))
}
