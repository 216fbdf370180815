//! Seam between the engine and whatever counts its activity.
//!
//! The engine reports events and never reads anything back: implementations
//! must return quickly and must not block, because some calls happen while a
//! request is still being served.

use std::time::Duration;

use snowbroker_types::{ClientPollStatus, NatType, ProxyType};

/// Receives fire-and-forget matching events.
///
/// Every method has an empty default so implementations pick what they need.
pub trait MatchObserver: Send + Sync {
    /// A proxy entered a pool and became available.
    fn proxy_registered(&self, _nat: NatType, _proxy_type: ProxyType) {}

    /// A proxy stopped being available: withdrawn on timeout, or its match
    /// resolved one way or another.
    fn proxy_released(&self, _nat: NatType, _proxy_type: ProxyType) {}

    /// A proxy poll finished, with or without a client offer.
    fn proxy_polled(&self, _nat: NatType, _matched: bool) {}

    /// A client poll finished.
    fn client_polled(&self, _nat: NatType, _status: ClientPollStatus) {}

    /// Time from a client's arrival to it receiving an answer.
    fn client_round_trip(&self, _elapsed: Duration) {}
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MatchObserver for NoopObserver {}
