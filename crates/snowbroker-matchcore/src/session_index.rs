//! Session id → session lookup, used to route a proxy's answer back to the
//! client that claimed it.
//!
//! Not synchronised on its own: the [`Registry`](crate::Registry) keeps it
//! behind the same lock as the pools.

use std::collections::HashMap;
use std::sync::Arc;

use snowbroker_types::SessionId;

use crate::session::Session;

#[derive(Debug, Default)]
pub struct SessionIndex {
    sessions: HashMap<SessionId, Arc<Session>>,
}

impl SessionIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a session under its id. Returns the session previously indexed
    /// under the same id, if any.
    pub fn put(&mut self, session: Arc<Session>) -> Option<Arc<Session>> {
        self.sessions.insert(session.id.clone(), session)
    }

    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<&Arc<Session>> {
        self.sessions.get(id)
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(id)
    }

    /// Remove `session`'s entry only if the id still points at this exact
    /// session. A newer registration that reused the id stays indexed.
    pub fn remove_if_same(&mut self, session: &Arc<Session>) -> bool {
        match self.sessions.get(&session.id) {
            Some(current) if Arc::ptr_eq(current, session) => {
                self.sessions.remove(&session.id);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &Arc<Session>> {
        self.sessions.values()
    }
}

#[cfg(test)]
mod tests {
    use snowbroker_types::{NatType, ProxyRegistration};

    use super::*;

    fn session(id: &str) -> Arc<Session> {
        let (session, _receivers) = Session::new(ProxyRegistration::dummy(id, NatType::Unknown));
        Arc::new(session)
    }

    #[test]
    fn put_get_remove() {
        let mut index = SessionIndex::new();
        let s = session("p1");
        assert!(index.put(Arc::clone(&s)).is_none());
        assert!(index.contains(&SessionId::new("p1")));
        assert!(Arc::ptr_eq(index.get(&SessionId::new("p1")).unwrap(), &s));
        assert!(index.remove(&SessionId::new("p1")).is_some());
        assert!(index.is_empty());
    }

    #[test]
    fn get_unknown_is_none() {
        let index = SessionIndex::new();
        assert!(index.get(&SessionId::new("nope")).is_none());
    }

    #[test]
    fn reused_id_displaces_previous() {
        let mut index = SessionIndex::new();
        let first = session("dup");
        let second = session("dup");
        index.put(Arc::clone(&first));
        let displaced = index.put(Arc::clone(&second)).unwrap();
        assert!(Arc::ptr_eq(&displaced, &first));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_if_same_spares_newer_session() {
        let mut index = SessionIndex::new();
        let first = session("dup");
        let second = session("dup");
        index.put(Arc::clone(&first));
        index.put(Arc::clone(&second));

        assert!(!index.remove_if_same(&first));
        assert_eq!(index.len(), 1);
        assert!(index.remove_if_same(&second));
        assert!(index.is_empty());
    }

    #[test]
    fn remove_if_same_twice() {
        let mut index = SessionIndex::new();
        let s = session("p1");
        index.put(Arc::clone(&s));
        assert!(index.remove_if_same(&s));
        assert!(!index.remove_if_same(&s));
    }
}
