//! Request metadata carrying the caller's declared identity.
//!
//! The caller's listen address travels under [`ADDR_KEY`] and every attribute
//! under `attr-<key>`. Metadata keys are case-insensitive on the wire, so
//! attribute keys are lower-cased when sent. Values that are not visible ASCII
//! cannot be carried and are skipped.

use rumor_net_peers::{Attributes, Peer};
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, KeyAndValueRef, MetadataMap};
use tracing::trace;

pub const ADDR_KEY: &str = "addr";
pub const ATTR_PREFIX: &str = "attr-";

/// Declare `peer` as the caller of an outgoing request.
pub fn insert_caller(metadata: &mut MetadataMap, peer: &Peer) {
    match AsciiMetadataValue::try_from(peer.addr()) {
        Ok(value) => {
            metadata.insert(ADDR_KEY, value);
        }
        Err(_) => trace!(addr = peer.addr(), "address not representable as metadata"),
    }

    for (key, value) in peer.attributes() {
        if !value.is_ascii() {
            trace!(%key, "skipping attribute with non-ASCII value");
            continue;
        }
        let name = format!("{ATTR_PREFIX}{}", key.to_ascii_lowercase());
        match (
            AsciiMetadataKey::from_bytes(name.as_bytes()),
            AsciiMetadataValue::try_from(value.as_str()),
        ) {
            (Ok(key), Ok(value)) => {
                metadata.insert(key, value);
            }
            _ => trace!(%key, "skipping attribute not representable as metadata"),
        }
    }
}

/// Read the caller declared in `metadata`. `None` when no usable address is present.
pub fn caller(metadata: &MetadataMap) -> Option<Peer> {
    let addr = metadata.get(ADDR_KEY)?.to_str().ok()?.trim();
    if addr.is_empty() {
        return None;
    }

    let mut attributes = Attributes::new();
    for entry in metadata.iter() {
        let KeyAndValueRef::Ascii(key, value) = entry else {
            continue;
        };
        let Some(name) = key.as_str().strip_prefix(ATTR_PREFIX) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        if let Ok(value) = value.to_str() {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    Some(Peer::new(addr, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_roundtrip_lowercases_keys() {
        let peer = Peer::new("127.0.0.1:9000", Attributes::new())
            .with_attribute("Cluster", "x")
            .with_attribute("name", "node-a");

        let mut metadata = MetadataMap::new();
        insert_caller(&mut metadata, &peer);

        let decoded = caller(&metadata).unwrap();
        assert_eq!(decoded.addr(), "127.0.0.1:9000");
        assert_eq!(decoded.attribute("cluster"), Some("x"));
        assert_eq!(decoded.attribute("name"), Some("node-a"));
        assert_eq!(decoded.attributes().len(), 2);
    }

    #[test]
    fn test_missing_or_blank_addr() {
        assert!(caller(&MetadataMap::new()).is_none());

        let mut metadata = MetadataMap::new();
        metadata.insert(ADDR_KEY, AsciiMetadataValue::from_static("  "));
        assert!(caller(&metadata).is_none());
    }

    #[test]
    fn test_non_ascii_values_are_skipped() {
        let peer = Peer::new("127.0.0.1:9000", Attributes::new())
            .with_attribute("city", "Zürich")
            .with_attribute("zone", "eu");

        let mut metadata = MetadataMap::new();
        insert_caller(&mut metadata, &peer);

        let decoded = caller(&metadata).unwrap();
        assert_eq!(decoded.attribute("city"), None);
        assert_eq!(decoded.attribute("zone"), Some("eu"));
    }

    #[test]
    fn test_unrelated_metadata_is_ignored() {
        let mut metadata = MetadataMap::new();
        metadata.insert(ADDR_KEY, AsciiMetadataValue::from_static("127.0.0.1:9000"));
        metadata.insert("x-request-id", AsciiMetadataValue::from_static("abc"));

        let decoded = caller(&metadata).unwrap();
        assert!(decoded.attributes().is_empty());
    }
}
