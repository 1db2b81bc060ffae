//! Event channel wire format.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound kinds are
//! modeled by [`Event`], the single outbound kind by [`Outbound`]. Fields the
//! agent does not interpret are ignored on input, except inside a bundle
//! request's `bp`, which is captured so the response can echo it unchanged.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::endpoint::Endpoint;

// ── Peers ─────────────────────────────────────────────────────────────────────

/// A convergence-layer agent a peer listens on: `[agent, port]`.
///
/// `port` is `null` for agents that have no listening port.
pub type ClaEntry = (String, Option<u16>);

/// A directly reachable node as announced by the DTN node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    /// Node name. Absent inside `PeerState` values, where the map key is used.
    #[serde(default)]
    pub name: String,
    /// The peer's endpoint; used as `next_hop` in decisions.
    pub eid: Endpoint,
    /// Transport address of the peer's convergence layer listener.
    pub addr: String,
    #[serde(default)]
    pub cla_list: Vec<ClaEntry>,
}

impl Peer {
    /// Directory key: the explicit name, or the node name of the peer's eid.
    pub fn key(&self) -> Option<Cow<'_, str>> {
        if self.name.is_empty() {
            self.eid.node_name()
        } else {
            Some(Cow::Borrowed(self.name.as_str()))
        }
    }
}

// ── Bundles ───────────────────────────────────────────────────────────────────

/// The `bp` object of a forwarding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundlePack {
    pub id: String,
    pub destination: Endpoint,
    /// Everything else the node put in `bp`, echoed back verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `bp` object of a `Timeout` event; only the id is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleId {
    pub id: String,
}

/// One candidate next hop in a forwarding decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaCandidate {
    pub remote: String,
    pub agent: String,
    pub port: Option<u16>,
    pub next_hop: Endpoint,
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Events received from the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Full directory snapshot, sent on connect.
    PeerState { peers: HashMap<String, Peer> },
    PeerEncountered(Peer),
    PeerDropped { name: String },
    /// The node asks which convergence layers to use for a bundle.
    RequestSenderForBundle { bp: BundlePack, clas: Vec<String> },
    SendingFailed {
        bid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cla_sender: Option<String>,
    },
    Timeout { bp: BundleId },
    /// Part of the node's protocol but carries nothing the agent acts on.
    IncomingBundle {},
    IncomingBundleWithoutPreviousNode {},
    ServiceState {},
    ServiceAdd {},
}

impl Event {
    /// All `type` values the agent recognizes.
    pub const KINDS: [&'static str; 10] = [
        "PeerState",
        "PeerEncountered",
        "PeerDropped",
        "RequestSenderForBundle",
        "SendingFailed",
        "Timeout",
        "IncomingBundle",
        "IncomingBundleWithoutPreviousNode",
        "ServiceState",
        "ServiceAdd",
    ];

    /// Decode one text frame.
    ///
    /// Unknown `type` values and missing discriminators are told apart from
    /// structurally malformed events so they can be reported precisely.
    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = match value.get("type") {
            Some(Value::String(kind)) => kind,
            Some(_) | None => return Err(ProtocolError::MissingType),
        };
        if !Self::KINDS.contains(&kind.as_str()) {
            return Err(ProtocolError::UnknownType(kind.clone()));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::PeerState { .. } => "PeerState",
            Event::PeerEncountered(_) => "PeerEncountered",
            Event::PeerDropped { .. } => "PeerDropped",
            Event::RequestSenderForBundle { .. } => "RequestSenderForBundle",
            Event::SendingFailed { .. } => "SendingFailed",
            Event::Timeout { .. } => "Timeout",
            Event::IncomingBundle {} => "IncomingBundle",
            Event::IncomingBundleWithoutPreviousNode {} => "IncomingBundleWithoutPreviousNode",
            Event::ServiceState {} => "ServiceState",
            Event::ServiceAdd {} => "ServiceAdd",
        }
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// A forwarding decision for one bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderForBundleResponse {
    pub bp: BundlePack,
    pub clas: Vec<ClaCandidate>,
    pub delete_afterwards: bool,
}

/// Events sent to the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Outbound {
    SenderForBundleResponse(SenderForBundleResponse),
}

impl Outbound {
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A frame that could not be turned into an [`Event`]. Never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("event has no string `type` field")]
    MissingType,
    #[error("unknown event type {0:?}")]
    UnknownType(String),
    #[error("non-text frame on event channel")]
    NonText,
}
