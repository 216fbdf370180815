//! # snowbroker-ipc
//!
//! **Request-facing layer of the Snowbroker broker.**
//!
//! Takes raw request bodies from whatever transport carries them, decodes
//! them with `snowbroker-messages`, runs them through the
//! `snowbroker-matchcore` engine and encodes the reply. Also owns the
//! broker's metrics and its `tracing` setup.
//!
//! - [`Broker`]: `proxy_polls`, `client_offers`, `proxy_answers`, `debug`
//! - [`BridgeList`]: bridges clients may ask for, loaded from newline-delimited JSON
//! - [`BrokerMetrics`]: rounded counters, available-proxies gauge and the
//!   periodic text report
//! - [`init_tracing`]: global subscriber from [`LoggingConfig`](snowbroker_types::LoggingConfig)

pub mod bridge_list;
pub mod broker;
pub mod metrics;
pub mod telemetry;

pub use bridge_list::{BridgeInfo, BridgeList};
pub use broker::Broker;
pub use metrics::{
    BrokerMetrics, IntervalCounts, MetricsSnapshot, ProxyPollStatus, RoundedCounter, bin_count,
};
pub use telemetry::init_tracing;
