//! # snowbroker-matchcore
//!
//! **Matching engine for the Snowbroker rendezvous broker.**
//!
//! Proxies poll and wait to be claimed; clients arrive with an SDP offer and
//! take the least-loaded suitable proxy; the proxy's answer is routed back to
//! the waiting client. Everything lives in memory and is lost on restart.
//!
//! - **Load-ordered pools**: one general and one restricted min-heap keyed by
//!   reported client load, with O(log N) removal by handle
//! - **NAT partitioning**: restricted proxies are only ever given to
//!   unrestricted clients
//! - **Single-use handoffs**: offer and answer slots that never block a writer
//! - **Bounded waits**: every wait races a timeout and a cancellation token,
//!   and abandoned waits clean up after themselves

pub mod engine;
pub mod observer;
pub mod pool;
pub mod registry;
pub mod session;
pub mod session_index;

pub use engine::MatchingEngine;
pub use observer::{MatchObserver, NoopObserver};
pub use pool::{PoolHandle, PriorityPool};
pub use registry::{ClaimedSession, PoolKind, PoolTicket, Registry, RegistryCensus};
pub use session::{HandoffSlot, Session, SessionReceivers};
pub use session_index::SessionIndex;
