//! # snowbroker-types
//!
//! Shared types, errors, and configuration for the **Snowbroker** rendezvous
//! broker.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`SessionId`], [`BridgeFingerprint`]
//! - **Peer classes**: [`NatType`], [`ProxyType`]
//! - **Handoff payloads**: [`ProxyRegistration`], [`ClientOffer`]
//! - **Domain outcomes**: [`ProxyPollOutcome`], [`ClientOutcome`], [`AnswerOutcome`]
//! - **Configuration**: [`BrokerConfig`], [`MetricsConfig`], [`LoggingConfig`]
//! - **Errors**: [`BrokerError`] with `SB_ERR_` prefix codes
//! - **Constants**: protocol strings, timeouts and limits

pub mod class;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod offer;
pub mod outcome;

// Re-export all primary types at crate root for ergonomic imports:
//   use snowbroker_types::{SessionId, NatType, ClientOffer, ...};

pub use class::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use offer::*;
pub use outcome::*;

// Constants are accessed via `snowbroker_types::constants::FOO`
// (not re-exported to avoid name collisions).
