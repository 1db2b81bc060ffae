//! Peer directory — the nodes the DTN node can currently reach directly.

use std::borrow::Cow;
use std::collections::HashMap;

use dtnroute_core::{Endpoint, Peer};

/// Known peers keyed on node name.
///
/// Owned by a single dispatcher; never shared across connections.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    peers: HashMap<String, Peer>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table with a snapshot. Nothing from before survives.
    ///
    /// A snapshot value without a `name` takes its map key as name.
    pub fn replace_all(&mut self, snapshot: impl IntoIterator<Item = (String, Peer)>) {
        self.peers = snapshot
            .into_iter()
            .map(|(key, mut peer)| {
                if peer.name.is_empty() {
                    peer.name = key.clone();
                }
                (key, peer)
            })
            .collect();
    }

    /// Insert or overwrite a single peer. Returns the entry it replaced.
    ///
    /// A peer with neither a name nor a node-bearing eid has no key and is
    /// handed back unchanged as `Err`.
    pub fn upsert(&mut self, mut peer: Peer) -> Result<Option<Peer>, Peer> {
        let Some(key) = peer.key().map(Cow::into_owned) else {
            return Err(peer);
        };
        if peer.name.is_empty() {
            peer.name = key.clone();
        }
        Ok(self.peers.insert(key, peer))
    }

    /// Remove a peer by name. Absent names are a no-op and return `None`.
    pub fn remove(&mut self, name: &str) -> Option<Peer> {
        self.peers.remove(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&Peer> {
        self.peers.get(name)
    }

    /// Look up the peer a destination endpoint names.
    pub fn lookup_endpoint(&self, destination: &Endpoint) -> Option<&Peer> {
        destination.node_name().and_then(|name| self.lookup(&name))
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
