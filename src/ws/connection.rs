//! Connection adapter: bridges one WebSocket to the hub.
//!
//! [`run_connection`] registers a fresh connection and runs its two pumps:
//!
//! - the **inbound pump** reads from the socket only to notice that the
//!   peer went away (close, error, or silence past the read deadline) and
//!   then deregisters;
//! - the **outbound pump** drains the connection's mailbox onto the socket,
//!   interleaving heartbeat pings, and stops when the mailbox closes or a
//!   write fails.
//!
//! Both halves are generic so the adapter runs over anything that looks
//! like a split WebSocket.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, close_code};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{Instant, MissedTickBehavior};

use super::lifecycle::{ConnectionLifecycle, ConnectionState};
use crate::domain::ConnectionId;
use crate::hub::{DisconnectReason, Hub, Mailbox};

/// Transport timing for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Period between heartbeat pings. Pings go out on this schedule
    /// whether or not data frames are flowing.
    pub heartbeat_interval: Duration,
    /// Read deadline: the inbound pump gives up after this much silence.
    pub pong_wait: Duration,
    /// Upper bound on a single socket write.
    pub write_timeout: Duration,
    /// How long the inbound pump may outlive the outbound one.
    pub close_grace: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            pong_wait: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            close_grace: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error("socket write failed: {0}")]
    Sink(String),
    #[error("socket write timed out after {0:?}")]
    Timeout(Duration),
}

/// Registers a new connection on `hub` and runs both pumps until the
/// connection is closed. Returns the final lifecycle state.
///
/// `reader` and `writer` are the two halves of a handshake-complete
/// socket. The caller owns nothing after this call.
pub async fn run_connection<R, W, E>(
    reader: R,
    writer: W,
    hub: Hub,
    settings: ConnectionSettings,
) -> ConnectionState
where
    R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: fmt::Display + Send + 'static,
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    let (connection, mailbox) = hub.connection();
    let id = connection.id();
    let lifecycle = Arc::new(ConnectionLifecycle::new());

    hub.register(connection).await;
    lifecycle.mark_registered();
    tracing::debug!(connection_id = %id, "ws connection open");

    let mut inbound = tokio::spawn(inbound_pump(
        reader,
        id,
        hub.clone(),
        Arc::clone(&lifecycle),
        settings.pong_wait,
    ));

    outbound_pump(writer, mailbox, &hub, &lifecycle, settings).await;

    // The close frame is out; give the peer a moment to answer it.
    if tokio::time::timeout(settings.close_grace, &mut inbound)
        .await
        .is_err()
    {
        inbound.abort();
        if let Err(err) = inbound.await
            && err.is_cancelled()
        {
            lifecycle.pump_exited();
        }
    }

    let state = lifecycle.state();
    tracing::debug!(connection_id = %id, state = ?state, "ws connection closed");
    state
}

async fn inbound_pump<R, E>(
    mut reader: R,
    id: ConnectionId,
    hub: Hub,
    lifecycle: Arc<ConnectionLifecycle>,
    pong_wait: Duration,
) where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let reason = loop {
        match tokio::time::timeout(pong_wait, reader.next()).await {
            Err(_) => break DisconnectReason::IdleTimeout,
            Ok(None | Some(Ok(Message::Close(_)))) => break DisconnectReason::PeerClosed,
            Ok(Some(Err(err))) => {
                tracing::debug!(connection_id = %id, error = %err, "ws read failed");
                break DisconnectReason::ReadError;
            }
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
            Ok(Some(Ok(Message::Text(_) | Message::Binary(_)))) => {
                tracing::trace!(connection_id = %id, "ignoring inbound payload");
            }
        }
    };

    if lifecycle.begin_draining() {
        hub.deregister(id, reason).await;
    }
    lifecycle.pump_exited();
}

async fn outbound_pump<W>(
    mut writer: W,
    mut mailbox: Mailbox,
    hub: &Hub,
    lifecycle: &ConnectionLifecycle,
    settings: ConnectionSettings,
) where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    let id = mailbox.id();
    let mut heartbeat = tokio::time::interval_at(
        Instant::now() + settings.heartbeat_interval,
        settings.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut healthy = true;
    loop {
        let outcome = tokio::select! {
            frame = mailbox.recv() => match frame {
                Some(frame) => {
                    let message = Message::Text(frame.into_text());
                    write(&mut writer, message, settings.write_timeout).await
                }
                None => {
                    // Closed by the dispatcher: already out of the registry.
                    lifecycle.begin_draining();
                    break;
                }
            },
            _ = heartbeat.tick() => {
                write(&mut writer, Message::Ping(Bytes::new()), settings.write_timeout).await
            }
        };

        if let Err(err) = outcome {
            tracing::debug!(connection_id = %id, error = %err, "ws write failed");
            if lifecycle.begin_draining() {
                hub.deregister(id, DisconnectReason::WriteError).await;
            }
            healthy = false;
            break;
        }
    }

    if healthy {
        let close = Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: Utf8Bytes::from_static("closing"),
        }));
        if write(&mut writer, close, settings.write_timeout).await.is_ok() {
            let _ = tokio::time::timeout(settings.write_timeout, writer.close()).await;
        }
    }
    lifecycle.pump_exited();
}

async fn write<W>(writer: &mut W, message: Message, deadline: Duration) -> Result<(), WriteError>
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    match tokio::time::timeout(deadline, writer.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(WriteError::Sink(err.to_string())),
        Err(_) => Err(WriteError::Timeout(deadline)),
    }
}
