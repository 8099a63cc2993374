//! Per-connection state machine shared by the two pumps.
//!
//! ```text
//! Connecting ──registered──► Registered ──first failure──► Draining ──both pumps exited──► Closed
//! ```
//!
//! Transitions only move forward. The `Registered → Draining` step is a
//! compare-and-swap, so when both pumps fail at once exactly one of them
//! wins and sends the deregistration.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake done, not yet in the registry.
    Connecting,
    /// In the registry and receiving frames.
    Registered,
    /// A failure was detected; waiting for the pumps to stop.
    Draining,
    /// Both pumps have exited.
    Closed,
}

impl ConnectionState {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Registered => 1,
            Self::Draining => 2,
            Self::Closed => 3,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Registered,
            2 => Self::Draining,
            _ => Self::Closed,
        }
    }
}

/// Number of pumps per connection.
const PUMPS: u8 = 2;

/// Shared lifecycle of a connection's inbound and outbound pumps.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    state: AtomicU8,
    live_pumps: AtomicU8,
}

impl ConnectionLifecycle {
    /// Starts in [`ConnectionState::Connecting`] with two live pumps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Connecting.to_u8()),
            live_pumps: AtomicU8::new(PUMPS),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `Connecting → Registered`. Returns `false` if the connection had
    /// already moved on.
    pub fn mark_registered(&self) -> bool {
        self.transition(ConnectionState::Connecting, ConnectionState::Registered)
    }

    /// `Registered → Draining`. Returns `true` only for the caller that
    /// performed the transition; that caller owns the deregistration.
    pub fn begin_draining(&self) -> bool {
        self.transition(ConnectionState::Registered, ConnectionState::Draining)
    }

    /// Records that one pump has exited. The last one moves the
    /// connection to [`ConnectionState::Closed`]. Returns the state after
    /// the call.
    pub fn pump_exited(&self) -> ConnectionState {
        let previous = self
            .live_pumps
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .unwrap_or(0);
        if previous <= 1 {
            self.state
                .store(ConnectionState::Closed.to_u8(), Ordering::Release);
        }
        self.state()
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn happy_path() {
        let lc = ConnectionLifecycle::new();
        assert_eq!(lc.state(), ConnectionState::Connecting);
        assert!(lc.mark_registered());
        assert_eq!(lc.state(), ConnectionState::Registered);
        assert!(lc.begin_draining());
        assert_eq!(lc.state(), ConnectionState::Draining);
        assert_eq!(lc.pump_exited(), ConnectionState::Draining);
        assert_eq!(lc.pump_exited(), ConnectionState::Closed);
    }

    #[test]
    fn only_first_failure_wins() {
        let lc = ConnectionLifecycle::new();
        lc.mark_registered();
        assert!(lc.begin_draining());
        assert!(!lc.begin_draining());
    }

    #[test]
    fn never_reenters_registered() {
        let lc = ConnectionLifecycle::new();
        lc.mark_registered();
        lc.begin_draining();
        assert!(!lc.mark_registered());
        lc.pump_exited();
        lc.pump_exited();
        assert!(!lc.mark_registered());
        assert!(!lc.begin_draining());
        assert_eq!(lc.state(), ConnectionState::Closed);
    }

    #[test]
    fn extra_pump_exit_stays_closed() {
        let lc = ConnectionLifecycle::new();
        lc.pump_exited();
        lc.pump_exited();
        assert_eq!(lc.pump_exited(), ConnectionState::Closed);
    }

    #[test]
    fn racing_pumps_drain_once() {
        for _ in 0..100 {
            let lc = Arc::new(ConnectionLifecycle::new());
            lc.mark_registered();
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let lc = Arc::clone(&lc);
                    std::thread::spawn(move || lc.begin_draining())
                })
                .collect();
            let winners = handles
                .into_iter()
                .filter_map(|h| h.join().ok())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        }
    }
}
