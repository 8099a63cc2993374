//! Data Transfer Objects for REST request/response serialization.

pub mod event_dto;
pub mod simulator_dto;

pub use event_dto::*;
pub use simulator_dto::*;
