use reap_types::MetadataRecord;

use crate::error::{ContentError, Result};

/// Content key of the synthetic manifest entry appended to every published
/// buffer.
pub const MANIFEST_KEY: &str = "manifest.json";

/// Serialize manifest records to canonical UTF-8 JSON bytes.
///
/// Output is a JSON array, element order = record insertion order, field
/// names per the manifest contract. This is the one surface that must stay
/// bit-reproducible across implementations.
pub fn serialize(records: &[MetadataRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec(records).map_err(|e| ContentError::Serialization(e.to_string()))
}

/// Parse manifest bytes back into records (read path and tests).
pub fn deserialize(bytes: &[u8]) -> Result<Vec<MetadataRecord>> {
    serde_json::from_slice(bytes).map_err(|e| ContentError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reap_types::{MetadataRecord, ResourceType};

    fn record(content_key: &str, resource_type: ResourceType) -> MetadataRecord {
        MetadataRecord::builder(resource_type)
            .url("https://example.org/doc")
            .status_code(Some(200))
            .topic("t")
            .position("1")
            .content_key(content_key)
            .content_length(3)
            .build()
    }

    #[test]
    fn serializes_as_array_in_insertion_order() {
        let records = vec![
            record("z-last-name", ResourceType::Entry),
            record("a-first-name", ResourceType::Document),
        ];

        let bytes = serialize(&records).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 2);
        // Insertion order, regardless of key name ordering.
        assert_eq!(array[0]["contentKey"], "z-last-name");
        assert_eq!(array[1]["contentKey"], "a-first-name");
        assert_eq!(array[0]["resourceType"], "ENTRY");
        assert_eq!(array[1]["resourceType"], "DOCUMENT");
    }

    #[test]
    fn empty_manifest_is_an_empty_array() {
        assert_eq!(serialize(&[]).unwrap(), b"[]");
    }

    #[test]
    fn round_trips_through_deserialize() {
        let records = vec![record("a", ResourceType::Page)];
        let bytes = serialize(&records).unwrap();
        assert_eq!(deserialize(&bytes).unwrap(), records);
    }
}
