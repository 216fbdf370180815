//! One proxy's availability window and its two handoff slots.
//!
//! A [`Session`] is created when a proxy polls and is shared (`Arc`) between
//! the proxy's pending call, the registry, and the client that claims it.
//! The offer travels proxy-ward through `offer`; the answer travels
//! client-ward through `answer`. Both are single-use.
//!
//! An answer is only accepted once a client has claimed the session: before
//! that, no client has seen anything the proxy could be answering.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use snowbroker_types::{ClientOffer, NatType, ProxyRegistration, ProxyType, SessionId};
use tokio::sync::oneshot;

/// Write side of a single-use handoff.
///
/// Backed by a `oneshot` channel, which buffers its one value: a write never
/// waits for the reader. The sender sits in an `Option` so that a second
/// write finds it gone and fails immediately.
#[derive(Debug)]
pub struct HandoffSlot<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> HandoffSlot<T> {
    /// Create a slot and the receiver that will observe its single value.
    #[must_use]
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let slot = Self {
            sender: Mutex::new(Some(tx)),
        };
        (slot, rx)
    }

    /// Write the value.
    ///
    /// Hands the value back if the slot was already used or the receiver
    /// has been dropped.
    pub fn fill(&self, value: T) -> Result<(), T> {
        let Some(tx) = self.sender.lock().take() else {
            return Err(value);
        };
        tx.send(value)
    }

    /// Whether a write has already been attempted.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// A pending proxy registration.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub proxy_type: ProxyType,
    pub nat_type: NatType,
    /// Clients the proxy reported serving; the pool priority.
    pub load: u32,
    /// Client offer for the proxy.
    pub offer: HandoffSlot<ClientOffer>,
    /// SDP answer for the client.
    pub answer: HandoffSlot<String>,
    /// Set by the registry when a client pops the session.
    claimed: AtomicBool,
}

/// The two receiving ends of a fresh session.
///
/// `offer` goes to the registering proxy; `answer` travels with the session
/// through the pool and is handed to whichever client claims it.
#[derive(Debug)]
pub struct SessionReceivers {
    pub offer: oneshot::Receiver<ClientOffer>,
    pub answer: oneshot::Receiver<String>,
}

impl Session {
    /// Build a session from a registration, together with both receivers.
    #[must_use]
    pub fn new(registration: ProxyRegistration) -> (Self, SessionReceivers) {
        let (offer, offer_rx) = HandoffSlot::new();
        let (answer, answer_rx) = HandoffSlot::new();
        let session = Self {
            id: registration.id,
            proxy_type: registration.proxy_type,
            nat_type: registration.nat_type,
            load: registration.load,
            offer,
            answer,
            claimed: AtomicBool::new(false),
        };
        let receivers = SessionReceivers {
            offer: offer_rx,
            answer: answer_rx,
        };
        (session, receivers)
    }

    /// Whether a client has popped this session from its pool.
    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_claimed(&self) {
        self.claimed.store(true, Ordering::Release);
    }
}
