//! The matching engine: register a proxy, match a client, deliver an answer.
//!
//! # Handoff protocol
//!
//! ```text
//! proxy  ── register_proxy ──► pool + index ──(wait ≤ proxy_timeout)──► offer
//! client ── match_client ────► pop pool ── fill offer ──(wait ≤ client_timeout)──► answer
//! proxy  ── deliver_answer ──► index lookup ── claimed? ── fill answer
//! ```
//!
//! The registry lock is only taken for pool/index mutation. Waits race the
//! handoff slot against a timer and a [`CancellationToken`]; futures dropped
//! mid-wait clean up through drop guards, so an abandoned request never
//! leaves a session stranded in a pool or the index.

use std::sync::Arc;
use std::time::{Duration, Instant};

use snowbroker_types::{
    AnswerOutcome, BrokerConfig, ClientOffer, ClientOutcome, ClientPollStatus, ProxyPollOutcome,
    ProxyRegistration, SessionId,
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::observer::{MatchObserver, NoopObserver};
use crate::registry::{ClaimedSession, PoolKind, PoolTicket, Registry, RegistryCensus};
use crate::session::{Session, SessionReceivers};

/// Why a proxy's wait for an offer ended without one in hand.
enum WaitEnd {
    Offer(ClientOffer),
    Expired,
    Abandoned,
}

/// Matches proxies with clients. Share it between request handlers via `Arc`.
pub struct MatchingEngine {
    registry: Registry,
    observer: Arc<dyn MatchObserver>,
    proxy_timeout: Duration,
    client_timeout: Duration,
}

impl std::fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("registry", &self.registry)
            .field("proxy_timeout", &self.proxy_timeout)
            .field("client_timeout", &self.client_timeout)
            .finish_non_exhaustive()
    }
}

impl MatchingEngine {
    /// Engine with timeouts from `config` that reports nowhere.
    #[must_use]
    pub fn new(config: &BrokerConfig) -> Self {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    /// Engine with timeouts from `config`, reporting to `observer`.
    #[must_use]
    pub fn with_observer(config: &BrokerConfig, observer: Arc<dyn MatchObserver>) -> Self {
        Self {
            registry: Registry::new(),
            observer,
            proxy_timeout: config.proxy_timeout,
            client_timeout: config.client_timeout,
        }
    }

    #[must_use]
    pub fn proxy_timeout(&self) -> Duration {
        self.proxy_timeout
    }

    #[must_use]
    pub fn client_timeout(&self) -> Duration {
        self.client_timeout
    }

    /// Read access to the pools and index, for inspection.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Snapshot of what is currently registered.
    #[must_use]
    pub fn census(&self) -> RegistryCensus {
        self.registry.census()
    }

    // =================================================================
    // RegisterProxy
    // =================================================================

    /// Make a proxy available and wait up to the proxy timeout for a client.
    pub async fn register_proxy(&self, registration: ProxyRegistration) -> ProxyPollOutcome {
        self.register_proxy_until(registration, &CancellationToken::new())
            .await
    }

    /// Like [`register_proxy`](Self::register_proxy), but also gives up when
    /// `cancel` fires (the proxy's connection went away).
    pub async fn register_proxy_until(
        &self,
        registration: ProxyRegistration,
        cancel: &CancellationToken,
    ) -> ProxyPollOutcome {
        let (
            session,
            SessionReceivers {
                offer: mut offer_rx,
                answer: answer_rx,
            },
        ) = Session::new(registration);
        let session = Arc::new(session);
        let nat = session.nat_type;

        let (ticket, displaced) = self.registry.register(Arc::clone(&session), answer_rx);
        if displaced.is_some() {
            tracing::warn!(
                session = %session.id,
                "Session id reused while previous registration unresolved; answers now route to the new one"
            );
        }
        self.observer.proxy_registered(nat, session.proxy_type);
        tracing::debug!(
            session = %session.id,
            nat = %nat,
            proxy_type = %session.proxy_type,
            load = session.load,
            "Proxy registered"
        );

        let mut guard = Withdrawal {
            engine: self,
            ticket,
            session: Arc::clone(&session),
            armed: true,
        };

        let end = tokio::select! {
            biased;
            offer = &mut offer_rx => match offer {
                Ok(offer) => WaitEnd::Offer(offer),
                Err(_) => WaitEnd::Abandoned,
            },
            () = tokio::time::sleep(self.proxy_timeout) => WaitEnd::Expired,
            () = cancel.cancelled() => WaitEnd::Abandoned,
        };

        let offer = match end {
            WaitEnd::Offer(offer) => Some(offer),
            WaitEnd::Expired | WaitEnd::Abandoned => {
                if guard.withdraw() {
                    None
                } else {
                    // A client popped us between the deadline and the lock.
                    // It fills the offer right after popping, without
                    // yielding, so the value is already here or never comes.
                    offer_rx.await.ok()
                }
            }
        };
        guard.disarm();

        match offer {
            Some(offer) => {
                self.observer.proxy_polled(nat, true);
                tracing::debug!(session = %session.id, client_nat = %offer.nat_type, "Passing client offer to proxy");
                ProxyPollOutcome::Matched(offer)
            }
            None => {
                self.observer.proxy_polled(nat, false);
                tracing::debug!(session = %session.id, "Proxy poll ended without a client");
                ProxyPollOutcome::NoMatch
            }
        }
    }

    // =================================================================
    // MatchClient
    // =================================================================

    /// Hand a client's offer to the least-loaded suitable proxy and wait up to
    /// the client timeout for its answer.
    pub async fn match_client(&self, offer: ClientOffer) -> ClientOutcome {
        self.match_client_until(offer, &CancellationToken::new())
            .await
    }

    /// Like [`match_client`](Self::match_client), but releases the matched
    /// proxy as soon as `cancel` fires (the client's connection went away).
    pub async fn match_client_until(
        &self,
        offer: ClientOffer,
        cancel: &CancellationToken,
    ) -> ClientOutcome {
        let started = Instant::now();
        let nat = offer.nat_type;
        let kind = PoolKind::for_client(nat);

        let Some((claim, answer_rx)) = self.claim_proxy(kind, offer) else {
            self.observer.client_polled(nat, ClientPollStatus::Denied);
            tracing::debug!(client_nat = %nat, pool = ?kind, "No proxies available for client");
            return ClientOutcome::NoProxies;
        };

        let outcome = tokio::select! {
            biased;
            answer = answer_rx => match answer {
                Ok(answer) => ClientOutcome::Answered(answer),
                Err(_) => ClientOutcome::TimedOut,
            },
            () = tokio::time::sleep(self.client_timeout) => ClientOutcome::TimedOut,
            () = cancel.cancelled() => ClientOutcome::Cancelled,
        };

        match &outcome {
            ClientOutcome::Answered(_) => {
                self.observer.client_round_trip(started.elapsed());
                tracing::debug!(session = %claim.session.id, "Client received answer");
            }
            ClientOutcome::TimedOut => {
                tracing::info!(session = %claim.session.id, "Client timed out waiting for answer");
            }
            ClientOutcome::Cancelled => {
                tracing::debug!(session = %claim.session.id, "Client went away before answer");
            }
            ClientOutcome::NoProxies => {}
        }
        self.observer.client_polled(nat, ClientPollStatus::from(&outcome));

        drop(claim);
        outcome
    }

    /// Pop proxies from `kind` until one accepts the offer.
    ///
    /// A popped proxy whose own wait has already been abandoned cannot take
    /// the offer; it is released and the next one is tried.
    fn claim_proxy(
        &self,
        kind: PoolKind,
        mut offer: ClientOffer,
    ) -> Option<(Claim<'_>, oneshot::Receiver<String>)> {
        loop {
            let ClaimedSession { session, answer_rx } = self.registry.claim(kind)?;
            let claim = Claim {
                engine: self,
                session,
            };
            match claim.session.offer.fill(offer) {
                Ok(()) => {
                    tracing::debug!(
                        session = %claim.session.id,
                        load = claim.session.load,
                        pool = ?kind,
                        "Client matched with proxy"
                    );
                    return Some((claim, answer_rx));
                }
                Err(returned) => {
                    tracing::debug!(session = %claim.session.id, "Claimed proxy already gone, trying next");
                    offer = returned;
                }
            }
        }
    }

    // =================================================================
    // DeliverAnswer
    // =================================================================

    /// Route a proxy's SDP answer to the client waiting on session `id`.
    ///
    /// Never blocks: if no client claimed the session, or the client has
    /// already stopped waiting, the answer is dropped and
    /// [`AnswerOutcome::ClientGone`] returned.
    pub fn deliver_answer(&self, id: &SessionId, answer: String) -> AnswerOutcome {
        let Some(session) = self.registry.lookup(id) else {
            tracing::debug!(session = %id, "Answer for unknown session");
            return AnswerOutcome::ClientGone;
        };
        if !session.is_claimed() {
            tracing::debug!(session = %id, "Answer before any client claimed the session");
            return AnswerOutcome::ClientGone;
        }
        match session.answer.fill(answer) {
            Ok(()) => {
                tracing::debug!(session = %id, "Answer handed to client");
                AnswerOutcome::Delivered
            }
            Err(_) => {
                tracing::debug!(session = %id, "Answer arrived after client stopped waiting");
                AnswerOutcome::ClientGone
            }
        }
    }
}

/// Pulls a registered-but-unmatched session back out of the registry if the
/// proxy's wait ends without an offer, including when its future is dropped.
struct Withdrawal<'a> {
    engine: &'a MatchingEngine,
    ticket: PoolTicket,
    session: Arc<Session>,
    armed: bool,
}

impl Withdrawal<'_> {
    /// Returns `true` if the session was still pooled and is now gone.
    fn withdraw(&mut self) -> bool {
        self.armed = false;
        let withdrawn = self.engine.registry.withdraw(self.ticket, &self.session);
        if withdrawn {
            self.engine
                .observer
                .proxy_released(self.session.nat_type, self.session.proxy_type);
        }
        withdrawn
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Withdrawal<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.withdraw();
        }
    }
}

/// A session popped by a client. Dropping it removes the session from the
/// index, whatever the outcome of the match.
struct Claim<'a> {
    engine: &'a MatchingEngine,
    session: Arc<Session>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.engine.registry.release(&self.session);
        self.engine
            .observer
            .proxy_released(self.session.nat_type, self.session.proxy_type);
    }
}

#[cfg(test)]
mod tests {
    use snowbroker_types::NatType;

    use super::*;

    fn engine() -> MatchingEngine {
        MatchingEngine::new(&BrokerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn lone_proxy_times_out_without_trace() {
        let engine = engine();
        let outcome = engine
            .register_proxy(ProxyRegistration::dummy("p1", NatType::Unknown))
            .await;
        assert_eq!(outcome, ProxyPollOutcome::NoMatch);
        assert!(engine.registry().is_idle());
    }

    #[tokio::test]
    async fn client_with_empty_pools_is_denied_immediately() {
        let engine = engine();
        let outcome = engine.match_client(ClientOffer::dummy(NatType::Unknown)).await;
        assert_eq!(outcome, ClientOutcome::NoProxies);
    }

    #[test]
    fn answer_for_unknown_session_is_client_gone() {
        let engine = engine();
        let outcome = engine.deliver_answer(&SessionId::new("ghost"), "answer".into());
        assert_eq!(outcome, AnswerOutcome::ClientGone);
        assert!(engine.registry().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn answer_to_pooled_session_is_not_kept_for_next_client() {
        let engine = Arc::new(engine());
        let proxy = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .register_proxy(ProxyRegistration::dummy("p1", NatType::Unknown))
                    .await
            })
        };
        while engine.registry().indexed() == 0 {
            tokio::task::yield_now().await;
        }

        let early = engine.deliver_answer(&SessionId::new("p1"), "stale".into());
        assert_eq!(early, AnswerOutcome::ClientGone);

        let client = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .match_client(ClientOffer::dummy(NatType::Unknown))
                    .await
            })
        };
        assert!(matches!(proxy.await.unwrap(), ProxyPollOutcome::Matched(_)));
        let outcome = engine.deliver_answer(&SessionId::new("p1"), "fresh".into());
        assert_eq!(outcome, AnswerOutcome::Delivered);
        assert_eq!(
            client.await.unwrap(),
            ClientOutcome::Answered("fresh".to_string())
        );
        assert!(engine.registry().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_proxy_is_withdrawn() {
        let engine = engine();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = engine
            .register_proxy_until(ProxyRegistration::dummy("p1", NatType::Unknown), &cancel)
            .await;
        assert_eq!(outcome, ProxyPollOutcome::NoMatch);
        assert!(engine.registry().is_idle());
    }
}
