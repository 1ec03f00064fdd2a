//! Individual connection handle.

use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

use relayhub_core::types::{Identity, UserId};

use crate::hub::Hub;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Why a frame could not be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    /// The outbound queue is at capacity.
    #[error("outbound queue is full")]
    Full,
    /// The outbound queue has been closed.
    #[error("outbound queue is closed")]
    Closed,
}

/// One authenticated client session.
///
/// The producer half of the outbound queue lives here behind a mutex so
/// that closing it is idempotent: the first close drops the sender and
/// every later enqueue fails with [`EnqueueError::Closed`]. The consumer
/// half is owned by the write pump.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    identity: Identity,
    hub: Weak<Hub>,
    outbound: Mutex<Option<mpsc::Sender<Bytes>>>,
    transport: CancellationToken,
    connected_at: Mutex<Option<Instant>>,
}

impl Connection {
    /// Create a connection and the receiving end of its outbound queue.
    pub fn new(
        hub: Weak<Hub>,
        identity: Identity,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let connection = Arc::new(Self {
            id: Uuid::new_v4(),
            identity,
            hub,
            outbound: Mutex::new(Some(tx)),
            transport: CancellationToken::new(),
            connected_at: Mutex::new(None),
        });
        (connection, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> UserId {
        self.identity.id()
    }

    /// The owning hub, while it is still alive.
    pub fn hub(&self) -> Option<Arc<Hub>> {
        self.hub.upgrade()
    }

    /// Non-blocking enqueue.
    pub fn try_enqueue(&self, frame: Bytes) -> Result<(), EnqueueError> {
        let outbound = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        push(outbound.as_ref(), frame)
    }

    /// Enqueue a final frame and close the queue in one step, so nothing
    /// can slip in behind it.
    pub fn finish_with(&self, frame: Bytes) -> Result<(), EnqueueError> {
        let mut outbound = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        let result = push(outbound.as_ref(), frame);
        outbound.take();
        result
    }

    /// Close the outbound queue. Returns whether this call closed it.
    ///
    /// Frames already queued are still delivered; the write pump then
    /// sends a close frame and exits.
    pub fn close_outbound(&self) -> bool {
        self.outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
    }

    pub fn is_outbound_closed(&self) -> bool {
        self.outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Tear down the transport. Both pumps observe this and exit.
    pub fn close(&self) {
        self.transport.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_cancelled()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.transport.cancelled()
    }

    pub(crate) fn mark_admitted(&self, at: Instant) {
        *self.connected_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(at);
    }

    /// Time since the hub admitted this connection.
    pub fn connected_for(&self) -> Option<Duration> {
        self.connected_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|at| at.elapsed())
    }
}

fn push(tx: Option<&mpsc::Sender<Bytes>>, frame: Bytes) -> Result<(), EnqueueError> {
    let tx = tx.ok_or(EnqueueError::Closed)?;
    tx.try_send(frame).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
        mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
    })
}

#[cfg(test)]
impl Connection {
    /// A connection with no owning hub.
    pub(crate) fn detached(
        id: i64,
        username: &str,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        Self::new(Weak::new(), Identity::new(id, username, ""), capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_fails_when_full() {
        let (conn, mut rx) = Connection::detached(1, "alice", 2);
        assert!(conn.try_enqueue(Bytes::from_static(b"a")).is_ok());
        assert!(conn.try_enqueue(Bytes::from_static(b"b")).is_ok());
        assert_eq!(
            conn.try_enqueue(Bytes::from_static(b"c")),
            Err(EnqueueError::Full)
        );
        assert_eq!(rx.recv().await.as_deref(), Some(&b"a"[..]));
    }

    #[tokio::test]
    async fn close_outbound_is_idempotent_and_drains() {
        let (conn, mut rx) = Connection::detached(1, "alice", 4);
        conn.try_enqueue(Bytes::from_static(b"last")).unwrap();

        assert!(conn.close_outbound());
        assert!(!conn.close_outbound());
        assert!(conn.is_outbound_closed());
        assert_eq!(
            conn.try_enqueue(Bytes::from_static(b"late")),
            Err(EnqueueError::Closed)
        );

        assert_eq!(rx.recv().await.as_deref(), Some(&b"last"[..]));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn finish_with_closes_even_when_full() {
        let (conn, mut rx) = Connection::detached(1, "alice", 1);
        conn.try_enqueue(Bytes::from_static(b"x")).unwrap();

        assert_eq!(
            conn.finish_with(Bytes::from_static(b"bye")),
            Err(EnqueueError::Full)
        );
        assert!(conn.is_outbound_closed());
        assert_eq!(rx.recv().await.as_deref(), Some(&b"x"[..]));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn close_wakes_waiters() {
        let (conn, _rx) = Connection::detached(1, "alice", 1);
        let waiter = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.closed().await })
        };
        conn.close();
        conn.close();
        waiter.await.unwrap();
        assert!(conn.is_closed());
    }

    #[test]
    fn connected_for_is_none_until_admitted() {
        let (conn, _rx) = Connection::detached(1, "alice", 1);
        assert!(conn.connected_for().is_none());
        conn.mark_admitted(Instant::now());
        assert!(conn.connected_for().is_some());
    }
}
