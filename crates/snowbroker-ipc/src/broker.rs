//! Request handlers: bytes in, bytes out.
//!
//! Each handler decodes the body, runs the matching operation and encodes the
//! response. Decode failures and clients asking for an unlisted bridge come
//! back as [`BrokerError`]s of class `BadRequest` and never touch the
//! registry; everything the engine itself
//! produces (including "no match" and "client gone") is a successful
//! response.

use std::fmt::Write as _;
use std::sync::Arc;

use snowbroker_matchcore::{MatchObserver, MatchingEngine, RegistryCensus};
use snowbroker_messages::{
    decode_answer_request, decode_client_poll_request, decode_poll_request,
    encode_answer_response, encode_client_poll_response, encode_poll_response,
};
use snowbroker_types::{BrokerConfig, BrokerError, NatType, ProxyType, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bridge_list::BridgeList;
use crate::metrics::BrokerMetrics;

/// The broker: one matching engine, the metrics observing it and the list of
/// bridges clients may ask for.
///
/// Construct once at start-up and share by `Arc` between connections.
#[derive(Debug)]
pub struct Broker {
    engine: MatchingEngine,
    metrics: Arc<BrokerMetrics>,
    bridges: BridgeList,
}

impl Broker {
    pub fn new(config: &BrokerConfig) -> Result<Self> {
        config.validate()?;
        let bridges = match &config.bridge_list_path {
            Some(path) => {
                let list = BridgeList::new();
                list.load_file(path)?;
                list
            }
            None => BridgeList::with_default_bridge(),
        };
        let metrics = Arc::new(BrokerMetrics::new(&config.metrics));
        let engine =
            MatchingEngine::with_observer(config, Arc::clone(&metrics) as Arc<dyn MatchObserver>);
        tracing::info!(
            proxy_timeout = ?engine.proxy_timeout(),
            client_timeout = ?engine.client_timeout(),
            report_interval_secs = config.metrics.report_interval.as_secs(),
            bridges = bridges.len(),
            "Broker ready"
        );
        Ok(Self {
            engine,
            metrics,
            bridges,
        })
    }

    #[must_use]
    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<BrokerMetrics> {
        &self.metrics
    }

    /// The served bridges. Reload through it to change them at runtime.
    #[must_use]
    pub fn bridges(&self) -> &BridgeList {
        &self.bridges
    }

    /// Start the periodic metrics report; it stops when `shutdown` fires.
    pub fn start_reporter(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        Arc::clone(&self.metrics).spawn_reporter(shutdown)
    }

    // =================================================================
    // Proxy poll
    // =================================================================

    /// Handle a proxy poll. Resolves after at most the proxy timeout.
    pub async fn proxy_polls(&self, body: &[u8]) -> Result<Vec<u8>> {
        self.proxy_polls_until(body, &CancellationToken::new())
            .await
    }

    /// Handle a proxy poll whose connection may go away (`cancel`).
    pub async fn proxy_polls_until(
        &self,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let registration = decode_poll_request(body).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected proxy poll");
        })?;
        let outcome = self
            .engine
            .register_proxy_until(registration, cancel)
            .await;
        encode_poll_response(&outcome).inspect_err(log_encode_failure)
    }

    // =================================================================
    // Client poll
    // =================================================================

    /// Handle a client poll. Resolves after at most the client timeout.
    pub async fn client_offers(&self, body: &[u8]) -> Result<Vec<u8>> {
        self.client_offers_until(body, &CancellationToken::new())
            .await
    }

    /// Handle a client poll whose connection may go away (`cancel`).
    pub async fn client_offers_until(
        &self,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let poll = decode_client_poll_request(body).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected client poll");
        })?;
        if !self.bridges.contains(&poll.fingerprint) {
            tracing::debug!(bridge = %poll.fingerprint, "Client asked for an unlisted bridge");
            return Err(BrokerError::UnknownBridge(poll.fingerprint.to_hex()));
        }
        tracing::trace!(bridge = %poll.fingerprint, nat = %poll.offer.nat_type, "Client poll");
        let outcome = self.engine.match_client_until(poll.offer, cancel).await;
        encode_client_poll_response(&outcome).inspect_err(log_encode_failure)
    }

    // =================================================================
    // Proxy answer
    // =================================================================

    /// Handle a proxy's answer. Never waits.
    pub fn proxy_answers(&self, body: &[u8]) -> Result<Vec<u8>> {
        let answer = decode_answer_request(body).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected proxy answer");
        })?;
        let outcome = self.engine.deliver_answer(&answer.id, answer.sdp);
        encode_answer_response(outcome).inspect_err(log_encode_failure)
    }

    // =================================================================
    // Debug
    // =================================================================

    /// Human-readable census of registered proxies.
    #[must_use]
    pub fn debug(&self) -> String {
        render_census(&self.engine.census())
    }
}

fn log_encode_failure(err: &BrokerError) {
    tracing::error!(error = %err, "Failed to encode response");
}

fn render_census(census: &RegistryCensus) -> String {
    let by_type = |t: ProxyType| census.by_proxy_type.get(&t).copied().unwrap_or(0);
    let by_nat = |n: NatType| census.by_nat.get(&n).copied().unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "current snowflakes available: {}", census.indexed);
    let _ = writeln!(out, "\tstandalone proxies: {}", by_type(ProxyType::Standalone));
    let _ = writeln!(out, "\tbrowser proxies: {}", by_type(ProxyType::Badge));
    let _ = writeln!(out, "\twebext proxies: {}", by_type(ProxyType::Webext));
    let _ = writeln!(out, "\tiptproxy proxies: {}", by_type(ProxyType::Iptproxy));
    let _ = writeln!(out, "\tunknown proxies: {}", by_type(ProxyType::Unknown));
    let _ = writeln!(out, "NAT Types available:");
    let _ = writeln!(out, "\trestricted: {}", by_nat(NatType::Restricted));
    let _ = writeln!(out, "\tunrestricted: {}", by_nat(NatType::Unrestricted));
    let _ = write!(out, "\tunknown: {}", by_nat(NatType::Unknown));
    out
}
