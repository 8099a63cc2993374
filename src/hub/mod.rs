//! Real-time broadcast hub: registry, dispatcher, and publish API.
//!
//! ```text
//! producers ──publish──┐
//! transport ─register──┼──► control channel ──► Dispatcher ──try_send──► Mailbox (per connection)
//! pumps ────deregister─┘                          │
//!                                                 └── mirrors membership into Registry (RwLock)
//! ```
//!
//! The dispatcher is the only task that mutates the live set or enqueues
//! into mailboxes. A mailbox that is full when a frame arrives gets its
//! connection disconnected on the spot, so one slow viewer never stalls
//! the others or the producers.

pub mod connection;
pub mod dispatcher;
pub mod handle;
pub mod registry;

pub use connection::{Connection, DisconnectReason, Mailbox};
pub use dispatcher::Dispatcher;
pub use handle::{Hub, HubSettings};
pub use registry::Registry;
