//! # stratus-hub
//!
//! Real-time WebSocket broadcast hub for the Stratus control plane.
//!
//! Producers publish `{type, payload}` events; every connected viewer
//! receives each event exactly once, in publication order. A viewer that
//! cannot keep up is disconnected instead of slowing everyone else down.
//!
//! ## Architecture
//!
//! ```text
//! Producers (REST, MetricsSimulator)      Viewers (WebSocket)
//!     │                                        ▲
//!     ├── REST Handlers (api/)                 │
//!     │                                   WS pumps (ws/)
//!     ▼                                        │
//!   Hub handle ──control──▶ Dispatcher ──mailboxes──┘
//!                              │
//!                           Registry
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod server;
pub mod service;
pub mod ws;
