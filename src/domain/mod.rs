//! Domain layer: connection identity, broadcast envelopes, and the
//! metrics samples the built-in producer emits.
//!
//! Nothing here knows about transports or the dispatcher; these are the
//! values that flow through them.

pub mod connection_id;
pub mod envelope;
pub mod service_metrics;

pub use connection_id::ConnectionId;
pub use envelope::{Envelope, EventKind, Frame, Payload};
pub use service_metrics::ServiceMetrics;
