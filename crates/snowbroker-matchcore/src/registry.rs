//! The shared registry: general pool, restricted pool and session index
//! behind one lock.
//!
//! The lock guards pool and index mutation only. It is never held across an
//! `.await`; waiting on handoff slots happens outside it.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use snowbroker_types::{NatType, ProxyType, SessionId};
use tokio::sync::oneshot;

use crate::pool::{PoolHandle, PriorityPool};
use crate::session::Session;
use crate::session_index::SessionIndex;

/// Which of the two pools a session lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Proxies usable by any client.
    General,
    /// Proxies behind restricted NATs, reachable only by unrestricted clients.
    Restricted,
}

impl PoolKind {
    /// Pool a proxy with this NAT class is placed into.
    #[must_use]
    pub fn for_proxy(nat: NatType) -> Self {
        match nat {
            NatType::Restricted => Self::Restricted,
            NatType::Unknown | NatType::Unrestricted => Self::General,
        }
    }

    /// Pool a client with this NAT class draws from.
    ///
    /// Unrestricted clients are the only ones that can use restricted
    /// proxies, so they are served exclusively from that pool; general
    /// proxies stay reserved for clients that need them.
    #[must_use]
    pub fn for_client(nat: NatType) -> Self {
        match nat {
            NatType::Unrestricted => Self::Restricted,
            NatType::Unknown | NatType::Restricted => Self::General,
        }
    }
}

/// Where a registered session sits, kept by the registering call so it can
/// withdraw the session later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolTicket {
    pub kind: PoolKind,
    pub handle: PoolHandle,
}

/// A pooled session with the client end of its answer slot.
#[derive(Debug)]
struct Waiting {
    session: Arc<Session>,
    answer_rx: oneshot::Receiver<String>,
}

/// A session popped from a pool, ready for its client.
#[derive(Debug)]
pub struct ClaimedSession {
    pub session: Arc<Session>,
    /// Resolves with the proxy's answer.
    pub answer_rx: oneshot::Receiver<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    general: PriorityPool<Waiting>,
    restricted: PriorityPool<Waiting>,
    index: SessionIndex,
}

impl RegistryState {
    fn pool_mut(&mut self, kind: PoolKind) -> &mut PriorityPool<Waiting> {
        match kind {
            PoolKind::General => &mut self.general,
            PoolKind::Restricted => &mut self.restricted,
        }
    }
}

/// Counts of what is currently registered, for debug output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCensus {
    /// Sessions waiting in the general pool.
    pub general: usize,
    /// Sessions waiting in the restricted pool.
    pub restricted: usize,
    /// Sessions indexed (waiting or matched but unresolved).
    pub indexed: usize,
    pub by_proxy_type: BTreeMap<ProxyType, usize>,
    pub by_nat: BTreeMap<NatType, usize>,
}

/// Proxy pools plus the session index, all under a single mutex.
#[derive(Debug, Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session into the pool its NAT class selects and into the
    /// index, atomically.
    ///
    /// `answer_rx` waits in the pool with the session until a client claims
    /// it. Returns the ticket and, if the id was already indexed, the session
    /// it displaced from the index.
    pub fn register(
        &self,
        session: Arc<Session>,
        answer_rx: oneshot::Receiver<String>,
    ) -> (PoolTicket, Option<Arc<Session>>) {
        let kind = PoolKind::for_proxy(session.nat_type);
        let load = session.load;
        let waiting = Waiting {
            session: Arc::clone(&session),
            answer_rx,
        };
        let mut state = self.state.lock();
        let handle = state.pool_mut(kind).insert(waiting, load);
        let displaced = state.index.put(session);
        (PoolTicket { kind, handle }, displaced)
    }

    /// Take a session out of its pool before anybody claimed it.
    ///
    /// Returns `false` if a client already popped it; the session is then
    /// left in the index for that client to resolve.
    pub fn withdraw(&self, ticket: PoolTicket, session: &Arc<Session>) -> bool {
        let mut state = self.state.lock();
        if state.pool_mut(ticket.kind).remove(ticket.handle).is_none() {
            return false;
        }
        state.index.remove_if_same(session);
        true
    }

    /// Pop the least-loaded session from the given pool and mark it claimed.
    ///
    /// From here on the session accepts an answer.
    pub fn claim(&self, kind: PoolKind) -> Option<ClaimedSession> {
        let mut state = self.state.lock();
        let Waiting { session, answer_rx } = state.pool_mut(kind).pop_min()?;
        session.mark_claimed();
        Some(ClaimedSession { session, answer_rx })
    }

    /// Drop a claimed session from the index once its match is resolved.
    pub fn release(&self, session: &Arc<Session>) -> bool {
        self.state.lock().index.remove_if_same(session)
    }

    /// Look up a session by id for answer delivery.
    pub fn lookup(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.state.lock().index.get(id).cloned()
    }

    /// Number of sessions currently waiting in `kind`.
    pub fn pool_len(&self, kind: PoolKind) -> usize {
        self.state.lock().pool_mut(kind).len()
    }

    /// Number of indexed sessions.
    pub fn indexed(&self) -> usize {
        self.state.lock().index.len()
    }

    /// `true` when no session is pooled or indexed.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.general.is_empty() && state.restricted.is_empty() && state.index.is_empty()
    }

    /// Snapshot of the registry, grouped by proxy type and NAT class.
    pub fn census(&self) -> RegistryCensus {
        let state = self.state.lock();
        let mut census = RegistryCensus {
            general: state.general.len(),
            restricted: state.restricted.len(),
            indexed: state.index.len(),
            ..RegistryCensus::default()
        };
        for session in state.index.values() {
            *census.by_proxy_type.entry(session.proxy_type).or_default() += 1;
            *census.by_nat.entry(session.nat_type).or_default() += 1;
        }
        census
    }
}
