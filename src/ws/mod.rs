//! WebSocket transport: upgrade handling and the per-connection adapter.
//!
//! Viewers connect at `/ws` and only ever receive; every text frame they
//! get is one broadcast envelope.

pub mod connection;
pub mod handler;
pub mod lifecycle;
pub mod origin;

pub use connection::{ConnectionSettings, run_connection};
pub use lifecycle::{ConnectionLifecycle, ConnectionState};
pub use origin::OriginAllowList;
