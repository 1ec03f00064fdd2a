//! Read and write pumps bridging a connection and its socket.
//!
//! Each admitted connection runs exactly one of each. The write pump is
//! the only writer on the socket and the read pump the only reader. The
//! pumps are generic over the socket halves so they run unchanged on an
//! axum `WebSocket` split or on in-memory channels.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes};
use bytes::{BufMut, Bytes, BytesMut};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use relayhub_core::config::{InboundPolicy, RealtimeConfig};

use super::handle::{Connection, EnqueueError};
use crate::metrics::error_type;

/// Separator placed between coalesced frames.
const FRAME_SEPARATOR: u8 = b'\n';

/// Timing and size limits the pumps enforce.
#[derive(Debug, Clone)]
pub struct PumpSettings {
    pub max_message_size: usize,
    pub read_timeout: Duration,
    pub ping_period: Duration,
    pub write_timeout: Duration,
    pub inbound_policy: InboundPolicy,
}

impl From<&RealtimeConfig> for PumpSettings {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            max_message_size: config.max_message_size,
            read_timeout: config.read_timeout(),
            ping_period: config.ping_period(),
            write_timeout: config.write_timeout(),
            inbound_policy: config.inbound_policy,
        }
    }
}

/// Why the read pump stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadExit {
    /// No pong or data frame arrived within the read timeout.
    Timeout,
    /// The peer sent a close frame or the stream ended.
    PeerClosed,
    /// An inbound message exceeded the size limit.
    TooLarge(usize),
    /// The transport reported an error.
    Transport(String),
    /// The connection was torn down from elsewhere.
    Closed,
}

/// Consume inbound frames until the peer goes away, then unregister the
/// connection from its hub and tear down the transport.
pub async fn read_pump<S, E>(conn: Arc<Connection>, mut stream: S, settings: PumpSettings) -> ReadExit
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + settings.read_timeout;

    let exit = loop {
        let next = tokio::select! {
            _ = conn.closed() => break ReadExit::Closed,
            next = time::timeout_at(deadline, stream.next()) => next,
        };

        let message = match next {
            Err(_) => break ReadExit::Timeout,
            Ok(None) => break ReadExit::PeerClosed,
            Ok(Some(Err(e))) => break ReadExit::Transport(e.to_string()),
            Ok(Some(Ok(message))) => message,
        };

        let payload = match message {
            Message::Pong(_) => {
                deadline = Instant::now() + settings.read_timeout;
                continue;
            }
            // Pings are answered by the protocol layer.
            Message::Ping(_) => continue,
            Message::Close(_) => break ReadExit::PeerClosed,
            Message::Text(text) => Bytes::copy_from_slice(text.as_str().as_bytes()),
            Message::Binary(data) => data,
        };

        if payload.len() > settings.max_message_size {
            break ReadExit::TooLarge(payload.len());
        }
        deadline = Instant::now() + settings.read_timeout;

        if settings.inbound_policy == InboundPolicy::Echo {
            match conn.try_enqueue(payload) {
                Ok(()) => {}
                Err(EnqueueError::Full) => {
                    debug!(conn_id = %conn.id(), "Outbound queue full, dropping echoed frame");
                }
                Err(EnqueueError::Closed) => break ReadExit::Closed,
            }
        }
    };

    match &exit {
        ReadExit::Timeout => debug!(conn_id = %conn.id(), "Read deadline exceeded"),
        ReadExit::TooLarge(size) => {
            warn!(conn_id = %conn.id(), size, "Inbound message exceeds size limit")
        }
        ReadExit::Transport(error) => {
            debug!(conn_id = %conn.id(), error = %error, "WebSocket read error")
        }
        ReadExit::PeerClosed | ReadExit::Closed => {}
    }

    if let Some(hub) = conn.hub() {
        if exit == ReadExit::Timeout {
            hub.metrics().error(error_type::READ_TIMEOUT);
        }
        if let Err(e) = hub.unregister(conn.clone()).await {
            debug!(conn_id = %conn.id(), error = %e, "Unregister after read exit skipped");
        }
    }
    conn.close();

    exit
}

/// Drain the outbound queue onto the socket and keep the peer alive with
/// periodic pings.
///
/// Frames that are already queued when one is taken are written together
/// as a single text frame, separated by `\n`. When the queue is closed a
/// close frame is sent and the pump exits.
pub async fn write_pump<K>(
    conn: Arc<Connection>,
    mut sink: K,
    mut outbound: mpsc::Receiver<Bytes>,
    settings: PumpSettings,
) where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    let mut ticker = time::interval_at(Instant::now() + settings.ping_period, settings.ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let result = tokio::select! {
            _ = conn.closed() => break,
            frame = outbound.recv() => match frame {
                Some(first) => {
                    let batch = coalesce(first, &mut outbound);
                    send_within(&mut sink, Message::Text(batch), settings.write_timeout).await
                }
                None => {
                    if let Err(reason) =
                        send_within(&mut sink, Message::Close(None), settings.write_timeout).await
                    {
                        debug!(conn_id = %conn.id(), reason = %reason, "Close frame not delivered");
                    }
                    break;
                }
            },
            _ = ticker.tick() => {
                send_within(&mut sink, Message::Ping(Bytes::new()), settings.write_timeout).await
            }
        };

        if let Err(reason) = result {
            debug!(conn_id = %conn.id(), reason = %reason, "WebSocket write failed");
            if let Some(hub) = conn.hub() {
                hub.metrics().error(error_type::WRITE);
            }
            break;
        }
    }

    conn.close();
}

/// Join `first` with every frame queued behind it at this instant.
fn coalesce(first: Bytes, outbound: &mut mpsc::Receiver<Bytes>) -> Utf8Bytes {
    let queued = outbound.len();
    if queued == 0 {
        return to_text(first);
    }

    let mut batch = BytesMut::with_capacity(first.len() * (queued + 1));
    batch.extend_from_slice(&first);
    for _ in 0..queued {
        match outbound.try_recv() {
            Ok(frame) => {
                batch.put_u8(FRAME_SEPARATOR);
                batch.extend_from_slice(&frame);
            }
            Err(_) => break,
        }
    }
    to_text(batch.freeze())
}

fn to_text(payload: Bytes) -> Utf8Bytes {
    match String::from_utf8(payload.to_vec()) {
        Ok(text) => Utf8Bytes::from(text),
        Err(e) => Utf8Bytes::from(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

async fn send_within<K>(sink: &mut K, message: Message, limit: Duration) -> Result<(), String>
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    match time::timeout(limit, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("write deadline of {limit:?} exceeded")),
    }
}
