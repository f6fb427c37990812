//! Peer value type.

use std::collections::HashMap;

use crate::state::ConnectionState;

/// Peer-supplied attribute metadata.
pub type Attributes = HashMap<String, String>;

/// True when every key of `filter` is present in `attributes` with an equal value.
pub fn matches_attributes(attributes: &Attributes, filter: &Attributes) -> bool {
    filter
        .iter()
        .all(|(key, value)| attributes.get(key) == Some(value))
}

/// One overlay member as seen by the local node.
///
/// Values handed out by the store are snapshots: the state reflects the peer's
/// connection handle at the time of the call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Peer {
    addr: String,
    attributes: Attributes,
    state: ConnectionState,
}

impl Peer {
    pub fn new(addr: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            addr: addr.into(),
            attributes,
            state: ConnectionState::NoConnection,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_state(mut self, state: ConnectionState) -> Self {
        self.state = state;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn into_parts(self) -> (String, Attributes) {
        (self.addr, self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_attributes() {
        let peer = Peer::new("127.0.0.1:9000", Attributes::new())
            .with_attribute("cluster", "x")
            .with_attribute("name", "a");
        let matches = |filter: Attributes| matches_attributes(peer.attributes(), &filter);

        assert!(matches(Attributes::new()));
        assert!(matches(Attributes::from([("cluster".into(), "x".into())])));
        assert!(!matches(Attributes::from([("cluster".into(), "y".into())])));
        assert!(!matches(Attributes::from([("zone".into(), "x".into())])));
    }

    #[test]
    fn test_new_peer_has_no_connection() {
        let peer = Peer::new("127.0.0.1:9000", Attributes::new());
        assert_eq!(peer.state(), ConnectionState::NoConnection);
        assert_eq!(peer.attribute("name"), None);
    }
}
