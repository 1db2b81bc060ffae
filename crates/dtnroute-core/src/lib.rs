//! dtnroute-core — shared types: configuration, endpoints, and the event
//! channel wire format. All other dtnroute crates depend on this one.

pub mod config;
pub mod endpoint;
pub mod event;

pub use endpoint::{Endpoint, Scheme, SchemeTag};
pub use event::{
    BundleId, BundlePack, ClaCandidate, ClaEntry, Event, Outbound, Peer, ProtocolError,
    SenderForBundleResponse,
};
