//! # snowbroker-messages
//!
//! **Wire codec for the Snowbroker broker protocol.**
//!
//! Three request/response pairs, all JSON:
//!
//! - **Proxy poll**: a proxy announces itself and receives a client offer or
//!   `"no match"`
//! - **Client poll**: a version line followed by the client's offer; the
//!   response carries the proxy's answer or an error string
//! - **Proxy answer**: a matched proxy submits its SDP answer and learns
//!   whether the client was still there
//!
//! Decoders validate everything the engine relies on (versions, NAT classes,
//! fingerprints, required fields, body size) so that malformed input is
//! rejected before it can touch shared state.

pub mod client;
pub mod codec;
pub mod proxy;

pub use client::*;
pub use codec::{check_size, check_version};
pub use proxy::*;
