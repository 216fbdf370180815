//! Broker metrics.
//!
//! Two kinds of numbers are kept:
//!
//! - **Running totals** exported as [`RoundedCounter`]s labelled by NAT class
//!   and status, plus the available-proxies gauge labelled by NAT class and
//!   proxy type.
//! - **Interval counts** for the periodic text report. They are binned up to
//!   a multiple of 8 when rendered and zeroed after each report. The report
//!   also carries the latest client round trip, in milliseconds.
//!
//! Exact counts of individual users are never exposed.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use snowbroker_matchcore::MatchObserver;
use snowbroker_types::constants::METRICS_BIN_SIZE;
use snowbroker_types::{ClientPollStatus, MetricsConfig, NatType, ProxyType};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Round `count` up to the next multiple of the bin size.
#[must_use]
pub fn bin_count(count: u64) -> u64 {
    count.div_ceil(METRICS_BIN_SIZE) * METRICS_BIN_SIZE
}

/// Counter whose exported value only moves in steps of the bin size.
///
/// The first increment exports 8, the ninth exports 16, and so on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundedCounter {
    total: u64,
    value: u64,
}

impl RoundedCounter {
    pub fn inc(&mut self) {
        self.total += 1;
        if self.total > self.value {
            self.value += METRICS_BIN_SIZE;
        }
    }

    /// The exported, rounded value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }

    /// The true count. Never exported.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Label of a finished proxy poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProxyPollStatus {
    Idle,
    Matched,
}

impl ProxyPollStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Matched => "matched",
        }
    }
}

/// Counts that reset with every periodic report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalCounts {
    pub proxy_idle: u64,
    pub client_denied: u64,
    /// Denied clients that were not unrestricted.
    pub client_restricted_denied: u64,
    pub client_unrestricted_denied: u64,
    pub client_matched: u64,
    pub client_timeout: u64,
    /// Most recent client round trip.
    pub client_round_trip: Option<Duration>,
}

/// Copy of everything [`BrokerMetrics`] knows, taken under its lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub proxy_polls: BTreeMap<(NatType, ProxyPollStatus), RoundedCounter>,
    pub client_polls: BTreeMap<(NatType, ClientPollStatus), RoundedCounter>,
    pub available_proxies: BTreeMap<(NatType, ProxyType), i64>,
    pub interval: IntervalCounts,
}

impl MetricsSnapshot {
    /// Total of the available-proxies gauge across all labels.
    #[must_use]
    pub fn available_total(&self) -> i64 {
        self.available_proxies.values().sum()
    }
}

/// Collects broker activity. Plug it into the engine as its observer.
#[derive(Debug)]
pub struct BrokerMetrics {
    report_interval: Duration,
    state: Mutex<MetricsSnapshot>,
}

impl BrokerMetrics {
    #[must_use]
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            report_interval: config.report_interval,
            state: Mutex::new(MetricsSnapshot::default()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.state.lock().clone()
    }

    /// Zero the interval counts. Running totals and the gauge are kept.
    pub fn reset_interval(&self) {
        self.state.lock().interval = IntervalCounts::default();
    }

    /// Render the periodic report for the interval ending at `end`.
    #[must_use]
    pub fn report(&self, end: DateTime<Utc>) -> String {
        let counts = self.state.lock().interval;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "snowflake-stats-end {} ({} s)",
            end.format("%Y-%m-%d %H:%M:%S"),
            self.report_interval.as_secs()
        );
        let lines = [
            ("snowflake-idle-count", counts.proxy_idle),
            ("client-denied-count", counts.client_denied),
            ("client-restricted-denied-count", counts.client_restricted_denied),
            ("client-unrestricted-denied-count", counts.client_unrestricted_denied),
            ("client-snowflake-match-count", counts.client_matched),
            ("client-snowflake-timeout-count", counts.client_timeout),
        ];
        for (key, count) in lines {
            let _ = writeln!(out, "{key} {}", bin_count(count));
        }
        // A latency, not a count of users; reported as is.
        let round_trip_ms = counts.client_round_trip.map_or(0, |d| d.as_millis());
        let _ = writeln!(out, "client-snowflake-roundtrip-ms {round_trip_ms}");
        out
    }

    /// Emit a report every interval and reset the interval counts, until
    /// `shutdown` fires.
    pub fn spawn_reporter(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.report_interval);
            // The first tick completes immediately; there is nothing to report yet.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::debug!("Metrics reporter stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = self.report(Utc::now());
                        self.reset_interval();
                        for line in report.lines() {
                            tracing::info!(target: "snowbroker::metrics", "{line}");
                        }
                    }
                }
            }
        })
    }
}

impl MatchObserver for BrokerMetrics {
    fn proxy_registered(&self, nat: NatType, proxy_type: ProxyType) {
        *self
            .state
            .lock()
            .available_proxies
            .entry((nat, proxy_type))
            .or_default() += 1;
    }

    fn proxy_released(&self, nat: NatType, proxy_type: ProxyType) {
        *self
            .state
            .lock()
            .available_proxies
            .entry((nat, proxy_type))
            .or_default() -= 1;
    }

    fn proxy_polled(&self, nat: NatType, matched: bool) {
        let status = if matched {
            ProxyPollStatus::Matched
        } else {
            ProxyPollStatus::Idle
        };
        let mut state = self.state.lock();
        state.proxy_polls.entry((nat, status)).or_default().inc();
        if !matched {
            state.interval.proxy_idle += 1;
        }
    }

    fn client_polled(&self, nat: NatType, status: ClientPollStatus) {
        let mut state = self.state.lock();
        state.client_polls.entry((nat, status)).or_default().inc();
        let interval = &mut state.interval;
        match status {
            ClientPollStatus::Matched => interval.client_matched += 1,
            ClientPollStatus::Denied => {
                interval.client_denied += 1;
                if nat == NatType::Unrestricted {
                    interval.client_unrestricted_denied += 1;
                } else {
                    interval.client_restricted_denied += 1;
                }
            }
            ClientPollStatus::Timeout => interval.client_timeout += 1,
            ClientPollStatus::Cancelled => {}
        }
    }

    fn client_round_trip(&self, elapsed: Duration) {
        self.state.lock().interval.client_round_trip = Some(elapsed);
    }
}
