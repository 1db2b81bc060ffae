//! CLA matching — which of a peer's convergence layers the node may use.

use dtnroute_core::{ClaCandidate, Peer};

/// Candidates for every CLA the peer advertises that the node accepts.
///
/// `requested` decides acceptability only; the result keeps the peer's
/// advertised order, and duplicate agents on different ports all survive.
/// An empty result means the peer is known but nothing is usable.
pub fn match_clas(requested: &[String], peer: &Peer) -> Vec<ClaCandidate> {
    peer.cla_list
        .iter()
        .filter(|(agent, _)| requested.iter().any(|r| r == agent))
        .map(|(agent, port)| ClaCandidate {
            remote: peer.addr.clone(),
            agent: agent.clone(),
            port: *port,
            next_hop: peer.eid.clone(),
        })
        .collect()
}
