//! Service layer: producers built into the server.
//!
//! [`MetricsSimulator`] publishes synthetic metrics through the
//! [`super::hub::Hub`] so dashboards have something to show without a
//! real agent fleet.

pub mod metrics_simulator;

pub use metrics_simulator::MetricsSimulator;
