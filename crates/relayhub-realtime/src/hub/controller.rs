//! Hub controller.
//!
//! A hub serializes registration, unregistration and broadcast through a
//! single controller task fed by three mailboxes. Unicast delivery and
//! online snapshots bypass the controller and take the registry lock
//! directly, so they stay available while the controller is busy.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relayhub_core::config::RealtimeConfig;
use relayhub_core::error::AppError;
use relayhub_core::result::AppResult;
use relayhub_core::types::{Identity, UserId};

use super::registry::SessionRegistry;
use crate::connection::Connection;
use crate::message::displacement_frame;
use crate::metrics::{HubMetrics, error_type};

/// Receiving ends of the controller's mailboxes. Taken by [`Hub::run`].
#[derive(Debug)]
struct Mailbox {
    register: mpsc::Receiver<Arc<Connection>>,
    unregister: mpsc::Receiver<Arc<Connection>>,
    broadcast: mpsc::Receiver<Bytes>,
}

/// A named session hub.
#[derive(Debug)]
pub struct Hub {
    name: String,
    sessions: Mutex<SessionRegistry>,
    register_tx: mpsc::Sender<Arc<Connection>>,
    unregister_tx: mpsc::Sender<Arc<Connection>>,
    broadcast_tx: mpsc::Sender<Bytes>,
    mailbox: Mutex<Option<Mailbox>>,
    shutdown: CancellationToken,
    metrics: HubMetrics,
    queue_capacity: usize,
    stop_grace: Duration,
}

impl Hub {
    /// Creates a hub. Nothing is processed until [`run`](Self::run) is
    /// spawned.
    pub fn new(name: impl Into<String>, config: &RealtimeConfig, metrics: HubMetrics) -> Arc<Self> {
        let (register_tx, register) = mpsc::channel(1);
        let (unregister_tx, unregister) = mpsc::channel(1);
        let (broadcast_tx, broadcast) = mpsc::channel(1);

        Arc::new(Self {
            name: name.into(),
            sessions: Mutex::new(SessionRegistry::new()),
            register_tx,
            unregister_tx,
            broadcast_tx,
            mailbox: Mutex::new(Some(Mailbox {
                register,
                unregister,
                broadcast,
            })),
            shutdown: CancellationToken::new(),
            metrics,
            queue_capacity: config.outbound_queue_capacity,
            stop_grace: config.stop_grace(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &HubMetrics {
        &self.metrics
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Create a connection owned by this hub, along with the receiving
    /// end of its outbound queue. The connection is not admitted until it
    /// is registered.
    pub fn connect(self: &Arc<Self>, identity: Identity) -> (Arc<Connection>, mpsc::Receiver<Bytes>) {
        Connection::new(Arc::downgrade(self), identity, self.queue_capacity)
    }

    /// Ask the controller to admit `conn`.
    pub async fn register(&self, conn: Arc<Connection>) -> AppResult<()> {
        self.post(&self.register_tx, conn).await
    }

    /// Ask the controller to remove `conn`.
    pub async fn unregister(&self, conn: Arc<Connection>) -> AppResult<()> {
        self.post(&self.unregister_tx, conn).await
    }

    /// Ask the controller to deliver `frame` to every admitted connection.
    pub async fn broadcast(&self, frame: Bytes) -> AppResult<()> {
        self.post(&self.broadcast_tx, frame).await
    }

    async fn post<T>(&self, tx: &mpsc::Sender<T>, item: T) -> AppResult<()> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(self.stopped_error()),
            sent = tx.send(item) => sent.map_err(|_| self.stopped_error()),
        }
    }

    fn stopped_error(&self) -> AppError {
        AppError::service_unavailable(format!("Hub '{}' is stopped", self.name))
    }

    /// Non-blocking delivery to the user's live connection.
    ///
    /// Returns `false` when the user has no live connection or when the
    /// connection's queue is full, in which case that connection is
    /// dropped from the hub.
    pub fn send_to_user(&self, user_id: UserId, frame: Bytes) -> bool {
        let mut sessions = self.lock_sessions();
        let Some(conn) = sessions.by_user(user_id).cloned() else {
            return false;
        };

        let size = frame.len();
        match conn.try_enqueue(frame) {
            Ok(()) => {
                self.metrics.message_sent(size);
                true
            }
            Err(e) => {
                warn!(
                    hub = %self.name,
                    conn_id = %conn.id(),
                    user_id = user_id,
                    reason = %e,
                    "Dropping connection that cannot accept a unicast frame"
                );
                self.evict(&mut sessions, &conn);
                false
            }
        }
    }

    /// Identities of every admitted connection, in no particular order.
    pub fn get_clients(&self) -> Vec<Identity> {
        self.lock_sessions().identities()
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Controller loop. Runs until [`stop`](Self::stop) is called.
    ///
    /// Fails if the controller for this hub is already running.
    pub async fn run(self: Arc<Self>) -> AppResult<()> {
        let mut mailbox = self
            .mailbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| {
                AppError::internal(format!("Hub '{}' controller is already running", self.name))
            })?;

        info!(hub = %self.name, "Hub started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(conn) = mailbox.register.recv() => self.admit(conn),
                Some(conn) = mailbox.unregister.recv() => self.remove(&conn),
                Some(frame) = mailbox.broadcast.recv() => self.fan_out(frame),
                else => break,
            }
        }

        self.drain_mailbox(&mut mailbox);
        info!(hub = %self.name, "Hub controller exited");
        Ok(())
    }

    /// Stop the controller, wait out the grace period, then close every
    /// admitted connection's outbound queue and forget them all.
    pub async fn stop(&self) {
        info!(hub = %self.name, "Stopping hub");
        self.shutdown.cancel();

        // A controller that never ran leaves its mailbox behind.
        let idle = self.mailbox.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut mailbox) = idle {
            self.drain_mailbox(&mut mailbox);
        }

        tokio::time::sleep(self.stop_grace).await;

        let drained = self.lock_sessions().drain();
        for conn in &drained {
            conn.close_outbound();
        }
        self.metrics.connections_closed(drained.len());

        info!(hub = %self.name, closed = drained.len(), "Hub stopped");
    }

    /// Refuse further posts and settle whatever is still queued: pending
    /// registrations are closed without being admitted, pending
    /// unregistrations are applied and pending broadcasts are discarded.
    fn drain_mailbox(&self, mailbox: &mut Mailbox) {
        mailbox.register.close();
        mailbox.unregister.close();
        mailbox.broadcast.close();

        let mut refused = 0;
        while let Ok(conn) = mailbox.register.try_recv() {
            conn.close_outbound();
            refused += 1;
        }
        while let Ok(conn) = mailbox.unregister.try_recv() {
            self.remove(&conn);
        }
        while mailbox.broadcast.try_recv().is_ok() {}

        if refused > 0 {
            debug!(hub = %self.name, refused, "Closed connections still waiting for admission");
        }
    }

    fn admit(&self, conn: Arc<Connection>) {
        let mut sessions = self.lock_sessions();

        if self.shutdown.is_cancelled() {
            conn.close_outbound();
            return;
        }
        if sessions.contains(&conn.id()) {
            return;
        }

        if let Some(previous) = sessions.by_user(conn.user_id()).cloned() {
            if let Err(e) = previous.finish_with(displacement_frame()) {
                debug!(
                    hub = %self.name,
                    conn_id = %previous.id(),
                    reason = %e,
                    "Displacement notice not enqueued"
                );
            }
        }

        conn.mark_admitted(Instant::now());
        if let Some(previous) = sessions.insert(conn.clone()) {
            self.metrics.connections_closed(1);
            self.metrics.error(error_type::DISPLACED);
            info!(
                hub = %self.name,
                user_id = conn.user_id(),
                displaced = %previous.id(),
                conn_id = %conn.id(),
                "Connection displaced by a newer one for the same user"
            );
        }
        self.metrics.connection_opened();

        info!(
            hub = %self.name,
            conn_id = %conn.id(),
            user_id = conn.user_id(),
            username = %conn.identity().username(),
            "Connection registered"
        );
    }

    fn remove(&self, conn: &Arc<Connection>) {
        let mut sessions = self.lock_sessions();
        if !sessions.remove(conn) {
            return;
        }

        if let Some(lifetime) = conn.connected_for() {
            self.metrics.observe_duration(lifetime);
        }
        self.metrics.connections_closed(1);
        conn.close_outbound();

        info!(
            hub = %self.name,
            conn_id = %conn.id(),
            user_id = conn.user_id(),
            "Connection unregistered"
        );
    }

    fn fan_out(&self, frame: Bytes) {
        let mut sessions = self.lock_sessions();

        let mut delivered = 0;
        let mut stalled = Vec::new();
        for conn in sessions.connections() {
            match conn.try_enqueue(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => stalled.push(conn.clone()),
            }
        }

        for conn in &stalled {
            warn!(
                hub = %self.name,
                conn_id = %conn.id(),
                user_id = conn.user_id(),
                "Dropping connection that cannot accept a broadcast frame"
            );
            self.evict(&mut sessions, conn);
        }

        self.metrics.broadcast_sent(frame.len(), delivered);
        debug!(hub = %self.name, delivered, dropped = stalled.len(), "Broadcast delivered");
    }

    fn evict(&self, sessions: &mut SessionRegistry, conn: &Arc<Connection>) {
        conn.close_outbound();
        if sessions.remove(conn) {
            self.metrics.connections_closed(1);
            self.metrics.error(error_type::BACKPRESSURE);
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, SessionRegistry> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
