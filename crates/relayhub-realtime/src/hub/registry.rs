//! The two indexes a hub keeps over its admitted connections.

use std::collections::HashMap;
use std::sync::Arc;

use relayhub_core::types::{Identity, UserId};

use crate::connection::{Connection, ConnectionId};

/// Admitted connections, indexed by connection and by user.
///
/// Every connection in the user index is also in the connection index,
/// and a user maps to at most one connection. The registry itself is not
/// synchronized; the owning hub keeps it behind a mutex.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Arc<Connection>>,
    by_user: HashMap<UserId, Arc<Connection>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `conn`, making it the live connection for its user.
    ///
    /// Returns the connection it displaced, already removed from both
    /// indexes. The caller is responsible for notifying and closing it.
    pub fn insert(&mut self, conn: Arc<Connection>) -> Option<Arc<Connection>> {
        let displaced = self
            .by_user
            .insert(conn.user_id(), conn.clone())
            .filter(|previous| previous.id() != conn.id());
        if let Some(previous) = &displaced {
            self.sessions.remove(&previous.id());
        }
        self.sessions.insert(conn.id(), conn);
        displaced
    }

    /// Remove `conn` if it is admitted. The user index entry is only
    /// cleared when it still points at this connection.
    pub fn remove(&mut self, conn: &Connection) -> bool {
        if self.sessions.remove(&conn.id()).is_none() {
            return false;
        }
        if self
            .by_user
            .get(&conn.user_id())
            .is_some_and(|current| current.id() == conn.id())
        {
            self.by_user.remove(&conn.user_id());
        }
        true
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// The live connection for `user_id`.
    pub fn by_user(&self, user_id: UserId) -> Option<&Arc<Connection>> {
        self.by_user.get(&user_id)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Arc<Connection>> {
        self.sessions.values()
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.sessions
            .values()
            .map(|conn| conn.identity().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Empty both indexes, returning every connection that was admitted.
    pub fn drain(&mut self) -> Vec<Arc<Connection>> {
        self.by_user.clear();
        self.sessions.drain().map(|(_, conn)| conn).collect()
    }

    /// Both indexes agree and no user has two connections.
    pub fn is_consistent(&self) -> bool {
        let users_unique = {
            let mut seen = std::collections::HashSet::new();
            self.sessions.values().all(|conn| seen.insert(conn.user_id()))
        };
        users_unique
            && self.by_user.len() == self.sessions.len()
            && self.by_user.iter().all(|(user_id, conn)| {
                conn.user_id() == *user_id && self.sessions.contains_key(&conn.id())
            })
    }
}
