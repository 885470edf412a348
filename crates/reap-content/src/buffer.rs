use std::collections::BTreeSet;

use reap_rawdata::RawdataMessage;
use reap_types::MetadataRecord;
use ulid::Ulid;

/// Mutable accumulator for one (topic, position) unit of work.
///
/// Payloads and their manifest records accumulate in insertion order until
/// the buffer is sealed into an immutable [`ContentBuffer`] at publish
/// time. Re-buffering an existing content key overwrites the payload in
/// place (last writer wins); concurrent mutation for the same position is
/// the caller's responsibility to serialize via the store's topic lock.
#[derive(Clone, Debug, Default)]
pub struct ContentBufferBuilder {
    ulid: Option<Ulid>,
    position: Option<String>,
    data: Vec<(String, Vec<u8>)>,
    manifest: Vec<MetadataRecord>,
}

impl ContentBufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ulid(&mut self, ulid: Ulid) -> &mut Self {
        self.ulid = Some(ulid);
        self
    }

    pub fn position(&mut self, position: &str) -> &mut Self {
        self.position = Some(position.to_string());
        self
    }

    /// Append `payload` under `content_key`, overwriting any prior payload
    /// for the same key, and record its manifest entry.
    ///
    /// A `None` metadata record is legal and used exactly once per buffer:
    /// for the synthetic manifest entry appended at seal time.
    pub fn buffer(
        &mut self,
        content_key: &str,
        payload: Vec<u8>,
        metadata: Option<MetadataRecord>,
    ) -> &mut Self {
        match self.data.iter_mut().find(|(key, _)| key == content_key) {
            Some((_, existing)) => *existing = payload,
            None => self.data.push((content_key.to_string(), payload)),
        }
        if let Some(metadata) = metadata {
            self.manifest.push(metadata);
        }
        self
    }

    pub fn get(&self, content_key: &str) -> Option<&[u8]> {
        self.data
            .iter()
            .find(|(key, _)| key == content_key)
            .map(|(_, payload)| payload.as_slice())
    }

    /// Content keys currently buffered.
    pub fn keys(&self) -> BTreeSet<String> {
        self.data.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn key_count(&self) -> usize {
        self.data.len()
    }

    /// Manifest records in the order their payloads were buffered.
    pub fn manifest(&self) -> &[MetadataRecord] {
        &self.manifest
    }

    /// Seal the current state into an immutable snapshot.
    ///
    /// Idempotent: building twice from an unchanged builder yields equal
    /// snapshots. The builder itself stays usable.
    pub fn build(&self) -> ContentBuffer {
        ContentBuffer {
            ulid: self.ulid,
            position: self.position.clone().unwrap_or_default(),
            data: self.data.clone(),
            manifest: self.manifest.clone(),
        }
    }
}

/// Immutable, sealed form of a content buffer.
///
/// Produced by [`ContentBufferBuilder::build`] on the write path, or from a
/// received backend message on the read path (where no manifest records are
/// reconstructed; the manifest travels as the `manifest.json` payload).
#[derive(Clone, Debug, PartialEq)]
pub struct ContentBuffer {
    ulid: Option<Ulid>,
    position: String,
    data: Vec<(String, Vec<u8>)>,
    manifest: Vec<MetadataRecord>,
}

impl ContentBuffer {
    /// Consumer-side view of a backend message.
    pub fn from_message(message: RawdataMessage) -> Self {
        Self {
            ulid: message.ulid,
            position: message.position.clone(),
            data: message
                .data()
                .iter()
                .map(|(key, payload)| (key.clone(), payload.clone()))
                .collect(),
            manifest: Vec::new(),
        }
    }

    /// Convert into one backend message carrying the full payload set.
    pub fn to_message(&self) -> RawdataMessage {
        let mut message = RawdataMessage::new(&self.position);
        if let Some(ulid) = self.ulid {
            message = message.with_ulid(ulid);
        }
        for (key, payload) in &self.data {
            message.put(key, payload.clone());
        }
        message
    }

    pub fn ulid(&self) -> Option<Ulid> {
        self.ulid
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.data.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn key_count(&self) -> usize {
        self.data.len()
    }

    pub fn get(&self, content_key: &str) -> Option<&[u8]> {
        self.data
            .iter()
            .find(|(key, _)| key == content_key)
            .map(|(_, payload)| payload.as_slice())
    }

    /// The ordered payload entries.
    pub fn data(&self) -> &[(String, Vec<u8>)] {
        &self.data
    }

    pub fn manifest(&self) -> &[MetadataRecord] {
        &self.manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reap_types::{MetadataRecord, ResourceType};

    fn metadata(content_key: &str) -> MetadataRecord {
        MetadataRecord::builder(ResourceType::Document)
            .topic("t")
            .position("1")
            .content_key(content_key)
            .build()
    }

    #[test]
    fn buffering_keeps_insertion_order_and_manifest_pairing() {
        let mut builder = ContentBufferBuilder::new();
        builder
            .position("1")
            .buffer("b", vec![1], Some(metadata("b")))
            .buffer("a", vec![2], Some(metadata("a")));

        let sealed = builder.build();
        let order: Vec<_> = sealed.data().iter().map(|(key, _)| key.clone()).collect();
        assert_eq!(order, vec!["b", "a"]);

        let manifest_order: Vec<_> = sealed
            .manifest()
            .iter()
            .map(|record| record.content_key.clone())
            .collect();
        assert_eq!(manifest_order, vec!["b", "a"]);
    }

    #[test]
    fn duplicate_key_overwrites_payload_in_place() {
        let mut builder = ContentBufferBuilder::new();
        builder
            .position("1")
            .buffer("a", vec![1], Some(metadata("a")))
            .buffer("b", vec![2], Some(metadata("b")))
            .buffer("a", vec![9], None);

        assert_eq!(builder.key_count(), 2);
        assert_eq!(builder.get("a"), Some(&[9u8][..]));

        let order: Vec<_> = builder.build().data().iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn build_is_idempotent() {
        let mut builder = ContentBufferBuilder::new();
        builder.position("1").buffer("a", vec![1], Some(metadata("a")));

        assert_eq!(builder.build(), builder.build());
    }

    #[test]
    fn message_round_trip_preserves_payloads() {
        let mut builder = ContentBufferBuilder::new();
        builder
            .position("7")
            .buffer("a", vec![1, 2], Some(metadata("a")))
            .buffer("manifest.json", vec![b'['], None);

        let message = builder.build().to_message();
        assert_eq!(message.position, "7");

        let view = ContentBuffer::from_message(message);
        assert_eq!(view.position(), "7");
        assert_eq!(view.get("a"), Some(&[1u8, 2][..]));
        assert_eq!(view.get("manifest.json"), Some(&[b'['][..]));
        assert!(view.manifest().is_empty());
    }
}
