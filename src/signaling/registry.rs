use std::collections::HashMap;

use crate::signaling::protocol::ClientIdentity;
use crate::signaling::types::ConnId;

/// Which identity belongs to which live connection, both ways.
#[derive(Debug, Default)]
pub struct Registry {
    id_to_conn: HashMap<ClientIdentity, ConnId>,
    conn_to_id: HashMap<ConnId, ClientIdentity>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `id` to `conn`. Returns the identity the connection had before, if any.
    pub fn bind(&mut self, conn: ConnId, id: ClientIdentity) -> Option<ClientIdentity> {
        let previous = self.conn_to_id.insert(conn, id.clone());
        if let Some(prev) = &previous {
            self.id_to_conn.remove(prev);
        }
        self.id_to_conn.insert(id, conn);
        previous
    }

    /// Forgets the connection; returns its identity if it had one.
    pub fn remove(&mut self, conn: ConnId) -> Option<ClientIdentity> {
        let id = self.conn_to_id.remove(&conn)?;
        self.id_to_conn.remove(&id);
        Some(id)
    }

    #[must_use]
    pub fn conn_for(&self, id: &ClientIdentity) -> Option<ConnId> {
        self.id_to_conn.get(id).copied()
    }

    #[must_use]
    pub fn identity_for(&self, conn: ConnId) -> Option<&ClientIdentity> {
        self.conn_to_id.get(&conn)
    }

    #[must_use]
    pub fn contains(&self, id: &ClientIdentity) -> bool {
        self.id_to_conn.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.conn_to_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conn_to_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_and_lookup_both_ways() {
        let mut r = Registry::new();
        r.bind(1, "abc123".into());
        r.bind(2, "xyz789".into());

        assert_eq!(r.conn_for(&"xyz789".into()), Some(2));
        assert_eq!(r.identity_for(1).map(ClientIdentity::as_str), Some("abc123"));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn remove_drops_identity() {
        let mut r = Registry::new();
        r.bind(1, "abc123".into());
        assert_eq!(r.remove(1).map(|i| i.to_string()), Some("abc123".to_string()));
        assert!(!r.contains(&"abc123".into()));
        assert!(r.remove(1).is_none());
        assert!(r.is_empty());
    }

    #[test]
    fn rebinding_a_connection_releases_old_identity() {
        let mut r = Registry::new();
        r.bind(1, "old".into());
        let prev = r.bind(1, "new".into());
        assert_eq!(prev, Some("old".into()));
        assert!(r.conn_for(&"old".into()).is_none());
        assert_eq!(r.conn_for(&"new".into()), Some(1));
    }
}
