//! Conversions between wire records and [`Peer`] snapshots.

use rumor_net_peers::{Attributes, ConnectionState, Peer};

use crate::{Attribute, PeerRecord};

impl From<&Peer> for PeerRecord {
    fn from(peer: &Peer) -> Self {
        let mut attributes: Vec<Attribute> = peer
            .attributes()
            .iter()
            .map(|(key, value)| Attribute {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        // Stable order for readers of the response.
        attributes.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            address: peer.addr().to_string(),
            attributes,
            state: peer.state().label().to_string(),
        }
    }
}

impl From<PeerRecord> for Peer {
    fn from(record: PeerRecord) -> Self {
        let attributes: Attributes = record
            .attributes
            .into_iter()
            .map(|attribute| (attribute.key, attribute.value))
            .collect();

        Peer::new(record.address, attributes)
            .with_state(ConnectionState::from_label(&record.state))
    }
}
