//! Opaque connection identity.
//!
//! [`ConnectionId`] is a newtype wrapper around [`uuid::Uuid`] (v4). It is
//! not a business key: it only tells two live connections apart, so two
//! ids compare equal iff they denote the same connection instance.

use std::fmt;

use serde::Serialize;

/// Identity of one live duplex connection.
///
/// Generated when the transport hands over a handshake-complete stream and
/// never reused. A reconnecting viewer always gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Allocates a new random `ConnectionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn copies_compare_equal() {
        let a = ConnectionId::new();
        let b = a;
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn serializes_as_plain_uuid_string() {
        let id = ConnectionId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }
}
