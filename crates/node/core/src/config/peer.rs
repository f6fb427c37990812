use rumor_net_peers::{Attributes, Peer};
use serde::{Deserialize, Serialize};

use crate::constants::{CLUSTER_ATTRIBUTE, DEFAULT_LISTEN_ADDR, NAME_ATTRIBUTE};

/// A peer as written in the configuration file.
///
/// `name` and `cluster` are shorthands for the attributes of the same name and
/// take precedence over entries in `attributes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerEntry {
    pub addr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Default for PeerEntry {
    fn default() -> Self {
        Self::new(DEFAULT_LISTEN_ADDR)
    }
}

impl PeerEntry {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            name: None,
            cluster: None,
            attributes: Attributes::new(),
        }
    }

    pub fn to_peer(&self) -> Peer {
        let mut attributes = self.attributes.clone();
        if let Some(name) = &self.name {
            attributes.insert(NAME_ATTRIBUTE.to_string(), name.clone());
        }
        if let Some(cluster) = &self.cluster {
            attributes.insert(CLUSTER_ATTRIBUTE.to_string(), cluster.clone());
        }
        Peer::new(self.addr.clone(), attributes)
    }
}
