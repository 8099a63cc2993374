//! Registry-side view of a connection and its outbound mailbox.
//!
//! [`Connection`] holds the only sending half of the mailbox and is moved
//! into the dispatcher on registration. Dropping it (on deregistration or
//! overflow) closes the mailbox, which is the termination signal the
//! outbound pump waits for.

use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use crate::domain::{ConnectionId, Frame};

/// Why a connection left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the transport cleanly.
    PeerClosed,
    /// Reading from the transport failed.
    ReadError,
    /// Nothing, not even a pong, arrived within the read deadline.
    IdleTimeout,
    /// Writing to the transport failed or timed out.
    WriteError,
    /// The mailbox was full when the dispatcher tried to enqueue.
    MailboxOverflow,
    /// The outbound pump had already dropped its end of the mailbox.
    MailboxClosed,
    /// The hub is shutting down.
    Shutdown,
}

impl DisconnectReason {
    /// Returns a short snake_case label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::ReadError => "read_error",
            Self::IdleTimeout => "idle_timeout",
            Self::WriteError => "write_error",
            Self::MailboxOverflow => "mailbox_overflow",
            Self::MailboxClosed => "mailbox_closed",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live connection as the dispatcher sees it: an identity plus the
/// sending half of a bounded mailbox.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    outbox: mpsc::Sender<Frame>,
}

impl Connection {
    /// Creates a connection with a fresh id and a mailbox bounded at
    /// `capacity` frames (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, Mailbox) {
        let id = ConnectionId::new();
        let (outbox, inbox) = mpsc::channel(capacity.max(1));
        (Self { id, outbox }, Mailbox { id, inbox })
    }

    /// Returns the connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Attempts to enqueue `frame` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DisconnectReason::MailboxOverflow`] if the mailbox is full
    /// and [`DisconnectReason::MailboxClosed`] if the receiving side is gone.
    pub fn try_enqueue(&self, frame: Frame) -> Result<(), DisconnectReason> {
        self.outbox.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => DisconnectReason::MailboxOverflow,
            TrySendError::Closed(_) => DisconnectReason::MailboxClosed,
        })
    }
}

/// Receiving half of a connection's mailbox, owned by its outbound pump.
#[derive(Debug)]
pub struct Mailbox {
    id: ConnectionId,
    inbox: mpsc::Receiver<Frame>,
}

impl Mailbox {
    /// Returns the id of the connection this mailbox belongs to.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Waits for the next frame. Returns `None` once the mailbox has been
    /// closed and every buffered frame has been taken.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.inbox.recv().await
    }

    /// Takes the next frame if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] if nothing is buffered and
    /// [`TryRecvError::Disconnected`] if the mailbox is closed and drained.
    pub fn try_recv(&mut self) -> Result<Frame, TryRecvError> {
        self.inbox.try_recv()
    }

    /// Number of frames currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inbox.len()
    }

    /// Returns `true` if no frames are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inbox.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn frame(n: u32) -> Frame {
        Frame::new(format!("{{\"n\":{n}}}"))
    }

    #[test]
    fn ids_match_between_halves() {
        let (conn, mailbox) = Connection::with_capacity(4);
        assert_eq!(conn.id(), mailbox.id());
    }

    #[test]
    fn enqueue_is_fifo() {
        let (conn, mut mailbox) = Connection::with_capacity(4);
        for n in 0..3 {
            assert!(conn.try_enqueue(frame(n)).is_ok());
        }
        assert_eq!(mailbox.len(), 3);
        for n in 0..3 {
            let Ok(got) = mailbox.try_recv() else {
                panic!("expected frame {n}");
            };
            assert_eq!(got, frame(n));
        }
        assert!(mailbox.is_empty());
    }

    #[test]
    fn full_mailbox_reports_overflow() {
        let (conn, _mailbox) = Connection::with_capacity(2);
        assert!(conn.try_enqueue(frame(1)).is_ok());
        assert!(conn.try_enqueue(frame(2)).is_ok());
        assert_eq!(
            conn.try_enqueue(frame(3)),
            Err(DisconnectReason::MailboxOverflow)
        );
    }

    #[test]
    fn dropped_mailbox_reports_closed() {
        let (conn, mailbox) = Connection::with_capacity(2);
        drop(mailbox);
        assert_eq!(
            conn.try_enqueue(frame(1)),
            Err(DisconnectReason::MailboxClosed)
        );
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (conn, _mailbox) = Connection::with_capacity(0);
        assert!(conn.try_enqueue(frame(1)).is_ok());
        assert_eq!(
            conn.try_enqueue(frame(2)),
            Err(DisconnectReason::MailboxOverflow)
        );
    }

    #[tokio::test]
    async fn dropping_connection_drains_then_closes() {
        let (conn, mut mailbox) = Connection::with_capacity(4);
        assert!(conn.try_enqueue(frame(7)).is_ok());
        drop(conn);
        assert_eq!(mailbox.recv().await, Some(frame(7)));
        assert_eq!(mailbox.recv().await, None);
        assert!(matches!(
            mailbox.try_recv(),
            Err(TryRecvError::Disconnected)
        ));
    }
}
