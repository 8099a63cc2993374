//! Broadcast envelopes and their wire encoding.
//!
//! An [`Envelope`] is the unit producers hand to the hub. It is encoded
//! exactly once per publish into a [`Frame`], and that frame is shared by
//! every connection mailbox the dispatcher fans it out to.
//!
//! Wire shape, one JSON object per WebSocket text frame:
//!
//! ```json
//! { "type": "Metrics", "payload": { "cpu": 42 } }
//! ```

use std::fmt;
use std::str::FromStr;
use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use utoipa::ToSchema;

use crate::error::HubError;

/// Kind of state change carried by an [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum EventKind {
    /// A managed resource was created, updated or deleted.
    ResourceUpdate,
    /// A metrics sample was produced.
    Metrics,
    /// A log or deployment event was recorded.
    Log,
}

impl EventKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceUpdate => "ResourceUpdate",
            Self::Metrics => "Metrics",
            Self::Log => "Log",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = HubError;

    /// Accepts the wire names as well as the snake_case names older
    /// dashboards send (`service_update`, `metrics`, `log`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ResourceUpdate" | "resource_update" | "service_update" => Ok(Self::ResourceUpdate),
            "Metrics" | "metrics" => Ok(Self::Metrics),
            "Log" | "log" => Ok(Self::Log),
            other => Err(HubError::InvalidRequest(format!(
                "unknown event type: {other}"
            ))),
        }
    }
}

/// Envelope payload.
///
/// Producers normally hand over a structured [`serde_json::Value`]. The
/// [`Payload::Raw`] variant carries JSON text the producer already
/// serialized and is written to the wire verbatim.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Structured JSON value.
    Json(serde_json::Value),
    /// Pre-serialized JSON text, passed through untouched.
    Raw(Box<RawValue>),
}

impl Payload {
    /// Serializes any producer value into a structured payload.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if `value` cannot be
    /// represented as JSON (e.g. a map with non-string keys).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, HubError> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Wraps already-serialized JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if `json` is not valid JSON.
    pub fn raw(json: String) -> Result<Self, HubError> {
        Ok(Self::Raw(RawValue::from_string(json)?))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Immutable unit of broadcast content.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    kind: EventKind,
    payload: Payload,
}

impl Envelope {
    /// Creates an envelope from a kind and payload.
    #[must_use]
    pub fn new(kind: EventKind, payload: impl Into<Payload>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Builds an envelope by serializing a producer value.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if `value` cannot be serialized.
    pub fn from_serialize<T: Serialize + ?Sized>(
        kind: EventKind,
        value: &T,
    ) -> Result<Self, HubError> {
        Ok(Self::new(kind, Payload::from_serialize(value)?))
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Encodes the envelope into its wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<Frame, HubError> {
        Ok(Frame::new(serde_json::to_string(self)?))
    }
}

/// An envelope encoded to wire JSON text.
///
/// Backed by reference-counted bytes: cloning is a count bump, and the
/// same buffer goes out as the WebSocket text frame of every connection
/// a fan-out reaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Utf8Bytes);

impl Frame {
    /// Wraps encoded JSON text.
    #[must_use]
    pub fn new(text: String) -> Self {
        Self(Utf8Bytes::from(text))
    }

    /// Returns the encoded text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Hands over the shared buffer as WebSocket text.
    #[must_use]
    pub fn into_text(self) -> Utf8Bytes {
        self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
