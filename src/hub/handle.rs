//! Cloneable front door to the hub.
//!
//! [`Hub`] is what producers and the transport layer hold. Every
//! operation is a message on the dispatcher's control channel; nothing
//! here touches the live connection set directly except the read-only
//! [`Registry`] snapshot.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::connection::{Connection, DisconnectReason, Mailbox};
use super::dispatcher::{Control, Dispatcher};
use super::registry::Registry;
use crate::domain::{ConnectionId, Envelope, EventKind, Frame};
use crate::error::HubError;

/// Sizing knobs for a [`Hub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    /// Per-connection mailbox bound. A connection whose mailbox is full
    /// at fan-out time is disconnected.
    pub mailbox_capacity: usize,
    /// Bound of the dispatcher control channel. When it is full,
    /// producers wait in [`Hub::publish`].
    pub control_capacity: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: 256,
            control_capacity: 1024,
        }
    }
}

/// Handle to the broadcast hub.
///
/// Cheap to clone and safe to share across tasks. Publishing is
/// fire-and-forget: delivery problems with individual connections are
/// handled by disconnecting them, never reported back here.
#[derive(Debug, Clone)]
pub struct Hub {
    control: mpsc::Sender<Control>,
    registry: Arc<Registry>,
    mailbox_capacity: usize,
}

impl Hub {
    /// Creates a hub and its dispatcher. The dispatcher does nothing until
    /// [`Dispatcher::run`] is awaited.
    #[must_use]
    pub fn new(settings: HubSettings) -> (Self, Dispatcher) {
        let (control, control_rx) = mpsc::channel(settings.control_capacity.max(1));
        let registry = Arc::new(Registry::new());
        let dispatcher = Dispatcher::new(control_rx, Arc::clone(&registry));
        let hub = Self {
            control,
            registry,
            mailbox_capacity: settings.mailbox_capacity.max(1),
        };
        (hub, dispatcher)
    }

    /// Creates a hub and runs its dispatcher on a new tokio task.
    #[must_use]
    pub fn spawn(settings: HubSettings) -> (Self, JoinHandle<()>) {
        let (hub, dispatcher) = Self::new(settings);
        let task = tokio::spawn(dispatcher.run());
        (hub, task)
    }

    /// Creates an unregistered connection with a mailbox of the configured
    /// capacity.
    #[must_use]
    pub fn connection(&self) -> (Connection, Mailbox) {
        Connection::with_capacity(self.mailbox_capacity)
    }

    /// Adds `connection` to the live set. Publishes processed after this
    /// one reach it.
    pub async fn register(&self, connection: Connection) {
        let id = connection.id();
        if self.control.send(Control::Register(connection)).await.is_err() {
            tracing::debug!(connection_id = %id, "hub stopped; registration dropped");
        }
    }

    /// Removes the connection `id` from the live set and closes its
    /// mailbox. Unknown or already removed ids are ignored.
    pub async fn deregister(&self, id: ConnectionId, reason: DisconnectReason) {
        if self
            .control
            .send(Control::Deregister { id, reason })
            .await
            .is_err()
        {
            tracing::debug!(connection_id = %id, "hub stopped; deregistration dropped");
        }
    }

    /// Publishes `envelope` to every connection live when the dispatcher
    /// gets to it.
    ///
    /// The envelope is encoded once, here, on the producer's task. Waits
    /// only if the control channel is full.
    pub async fn publish(&self, envelope: Envelope) {
        match envelope.encode() {
            Ok(frame) => self.publish_frame(frame).await,
            Err(err) => {
                tracing::error!(kind = %envelope.kind(), error = %err, "failed to encode envelope");
            }
        }
    }

    /// Serializes `value` and publishes it as a `kind` envelope.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if `value` cannot be
    /// serialized. Nothing is published in that case.
    pub async fn publish_json<T: Serialize + ?Sized>(
        &self,
        kind: EventKind,
        value: &T,
    ) -> Result<(), HubError> {
        let frame = Envelope::from_serialize(kind, value)?.encode()?;
        self.publish_frame(frame).await;
        Ok(())
    }

    /// Publishes an already encoded frame.
    pub async fn publish_frame(&self, frame: Frame) {
        if self.control.send(Control::Publish(frame)).await.is_err() {
            tracing::debug!("hub stopped; publish dropped");
        }
    }

    /// Waits until the dispatcher has applied every control message sent
    /// before this call. Returns immediately if the hub has stopped.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.control.send(Control::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }

    /// Disconnects every connection and stops the dispatcher, waiting
    /// until it has exited. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.control.send(Control::Shutdown).await.is_ok() {
            self.control.closed().await;
        }
    }

    /// Number of registered connections, read from the registry snapshot.
    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    /// Read-only view of the live connection set.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Configured per-connection mailbox capacity.
    #[must_use]
    pub const fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }
}
