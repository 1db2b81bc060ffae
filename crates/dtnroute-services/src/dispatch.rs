//! Routes events from the node to the peer directory and delivery tracker,
//! and produces forwarding decisions.
//!
//! One dispatcher per connection. Handlers run to completion one event at a
//! time, so directory and tracker never see interleaved mutations.

use dtnroute_core::{
    BundlePack, Event, Outbound, Peer, ProtocolError, SenderForBundleResponse,
};

use crate::cla::match_clas;
use crate::delivery::DeliveryTracker;
use crate::peer::PeerDirectory;

/// Counters for one connection's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events decoded and handled.
    pub events: u64,
    /// Frames dropped as malformed or unknown.
    pub protocol_errors: u64,
    /// `SenderForBundleResponse`s produced.
    pub decisions: u64,
    /// Requests for bundles that were already committed.
    pub duplicates: u64,
    /// Requests with no known peer or no usable CLA.
    pub deferred: u64,
    /// Commitments released by `SendingFailed` / `Timeout`.
    pub retractions: u64,
}

/// Owns all routing state for one event channel.
#[derive(Debug, Default)]
pub struct Dispatcher {
    peers: PeerDirectory,
    deliveries: DeliveryTracker,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    pub fn deliveries(&self) -> &DeliveryTracker {
        &self.deliveries
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Decode and handle one text frame. Protocol errors are logged and dropped.
    pub fn handle_text(&mut self, text: &str) -> Option<Outbound> {
        match Event::from_text(text) {
            Ok(event) => self.handle(event),
            Err(e) => {
                self.reject(&e);
                None
            }
        }
    }

    /// Record a frame that could not be decoded.
    pub fn reject(&mut self, error: &ProtocolError) {
        self.stats.protocol_errors += 1;
        tracing::warn!(error = %error, "dropping event");
    }

    /// Handle one event. Returns the decision to send back, if any.
    pub fn handle(&mut self, event: Event) -> Option<Outbound> {
        self.stats.events += 1;
        match event {
            Event::PeerState { peers } => {
                self.peers.replace_all(peers);
                tracing::info!(peers = self.peers.len(), "peer state");
                None
            }
            Event::PeerEncountered(peer) => {
                self.peer_encountered(peer);
                None
            }
            Event::PeerDropped { name } => {
                match self.peers.remove(&name) {
                    Some(_) => tracing::info!(peer = %name, "peer dropped"),
                    None => tracing::debug!(peer = %name, "drop for unknown peer"),
                }
                None
            }
            Event::RequestSenderForBundle { bp, clas } => self.sender_for_bundle(bp, clas),
            Event::SendingFailed { bid, cla_sender } => {
                tracing::info!(bundle = %bid, cla = ?cla_sender, "sending failed");
                self.retract(&bid);
                None
            }
            Event::Timeout { bp } => {
                tracing::info!(bundle = %bp.id, "sending timed out");
                self.retract(&bp.id);
                None
            }
            other @ (Event::IncomingBundle {}
            | Event::IncomingBundleWithoutPreviousNode {}
            | Event::ServiceState {}
            | Event::ServiceAdd {}) => {
                tracing::debug!(kind = other.kind(), "ignoring event");
                None
            }
        }
    }

    fn peer_encountered(&mut self, peer: Peer) {
        match self.peers.upsert(peer) {
            Ok(previous) => {
                tracing::info!(
                    peers = self.peers.len(),
                    replaced = previous.is_some(),
                    "peer encountered"
                );
            }
            Err(peer) => {
                self.stats.protocol_errors += 1;
                tracing::warn!(eid = %peer.eid, "encountered peer has no node name");
            }
        }
    }

    fn retract(&mut self, bundle_id: &str) {
        if self.deliveries.retract(bundle_id) {
            self.stats.retractions += 1;
            tracing::debug!(bundle = bundle_id, "decision retracted");
        } else {
            tracing::debug!(bundle = bundle_id, "nothing to retract");
        }
    }

    fn sender_for_bundle(&mut self, bp: BundlePack, clas: Vec<String>) -> Option<Outbound> {
        if self.deliveries.is_committed(&bp.id) {
            self.stats.duplicates += 1;
            tracing::debug!(bundle = %bp.id, "decision already in flight");
            return None;
        }

        let Some(peer) = self.peers.lookup_endpoint(&bp.destination) else {
            self.stats.deferred += 1;
            tracing::debug!(bundle = %bp.id, destination = %bp.destination, "peer not directly known");
            return None;
        };

        let candidates = match_clas(&clas, peer);
        if candidates.is_empty() {
            self.stats.deferred += 1;
            tracing::debug!(
                bundle = %bp.id,
                peer = %peer.name,
                requested = ?clas,
                "peer known but no cla usable"
            );
            return None;
        }

        tracing::info!(
            bundle = %bp.id,
            next_hop = %peer.eid,
            agent = %candidates[0].agent,
            remote = %candidates[0].remote,
            candidates = candidates.len(),
            "forwarding decision"
        );

        self.deliveries.commit(&bp.id);
        self.stats.decisions += 1;
        Some(Outbound::SenderForBundleResponse(SenderForBundleResponse {
            bp,
            clas: candidates,
            delete_afterwards: true,
        }))
    }

    /// Log a one-line summary of the current state.
    pub fn log_stats(&self) {
        tracing::info!(
            peers = self.peers.len(),
            committed = self.deliveries.len(),
            events = self.stats.events,
            decisions = self.stats.decisions,
            duplicates = self.stats.duplicates,
            deferred = self.stats.deferred,
            retractions = self.stats.retractions,
            protocol_errors = self.stats.protocol_errors,
            "dispatcher stats"
        );
    }
}
