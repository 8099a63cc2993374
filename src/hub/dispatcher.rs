//! The dispatch loop: sole owner of the live connection set.
//!
//! Every registration, deregistration and publish travels through one
//! bounded control channel and is applied here, one at a time. That total
//! order is what keeps registry mutation and fan-out from ever running
//! concurrently, without holding a lock across the fan-out loop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::connection::{Connection, DisconnectReason};
use super::registry::Registry;
use crate::domain::{ConnectionId, Frame};

/// Messages consumed by the [`Dispatcher`].
#[derive(Debug)]
pub(crate) enum Control {
    /// Add a connection to the live set.
    Register(Connection),
    /// Remove a connection if it is still live.
    Deregister {
        id: ConnectionId,
        reason: DisconnectReason,
    },
    /// Fan an encoded envelope out to every live connection.
    Publish(Frame),
    /// Acknowledge once everything enqueued earlier has been applied.
    Flush(oneshot::Sender<()>),
    /// Close every mailbox and stop.
    Shutdown,
}

/// Single consumer of the hub's control channel.
///
/// Created by [`super::Hub::new`]; run it exactly once with
/// [`Dispatcher::run`], normally on its own task.
#[derive(Debug)]
pub struct Dispatcher {
    control_rx: mpsc::Receiver<Control>,
    connections: HashMap<ConnectionId, Connection>,
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub(crate) fn new(control_rx: mpsc::Receiver<Control>, registry: Arc<Registry>) -> Self {
        Self {
            control_rx,
            connections: HashMap::new(),
            registry,
        }
    }

    /// Runs the dispatch loop until [`super::Hub::shutdown`] is called or
    /// every hub handle has been dropped.
    ///
    /// On exit all remaining connections are dropped, which closes their
    /// mailboxes and lets their outbound pumps finish.
    pub async fn run(mut self) {
        tracing::debug!("hub dispatcher started");

        while let Some(control) = self.control_rx.recv().await {
            match control {
                Control::Register(connection) => self.register(connection).await,
                Control::Deregister { id, reason } => self.deregister(id, reason).await,
                Control::Publish(frame) => self.fan_out(&frame).await,
                Control::Flush(ack) => {
                    let _ = ack.send(());
                }
                Control::Shutdown => {
                    self.shutdown().await;
                    break;
                }
            }
        }

        self.connections.clear();
        tracing::debug!("hub dispatcher stopped");
    }

    async fn register(&mut self, connection: Connection) {
        let id = connection.id();
        self.connections.insert(id, connection);
        let live = self.registry.insert(id).await;
        tracing::info!(connection_id = %id, live, "connection registered");
    }

    async fn deregister(&mut self, id: ConnectionId, reason: DisconnectReason) {
        // Dropping the connection drops the only mailbox sender.
        if self.connections.remove(&id).is_none() {
            tracing::debug!(connection_id = %id, %reason, "connection already deregistered");
            return;
        }
        let live = self.registry.remove(id).await;
        match reason {
            DisconnectReason::MailboxOverflow | DisconnectReason::MailboxClosed => {
                tracing::warn!(connection_id = %id, %reason, live, "connection dropped during fan-out");
            }
            _ => tracing::info!(connection_id = %id, %reason, live, "connection deregistered"),
        }
    }

    async fn fan_out(&mut self, frame: &Frame) {
        let mut failed = Vec::new();
        for (id, connection) in &self.connections {
            if let Err(reason) = connection.try_enqueue(frame.clone()) {
                failed.push((*id, reason));
            }
        }

        let delivered = self.connections.len().saturating_sub(failed.len());
        tracing::trace!(delivered, dropped = failed.len(), "frame dispatched");

        for (id, reason) in failed {
            self.deregister(id, reason).await;
        }
    }

    async fn shutdown(&mut self) {
        let closed = self.connections.len();
        self.connections.clear();
        self.registry.clear().await;
        tracing::info!(closed, reason = %DisconnectReason::Shutdown, "hub shut down");
    }
}
