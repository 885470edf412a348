use ulid::Ulid;

/// One logical record in a rawdata topic: a caller-assigned position, an
/// optional ULID identity, and an insertion-ordered set of named payloads.
///
/// A `None` ulid lets the backend assign one at publish time. Payload keys
/// are unique within one message; re-putting a key overwrites the payload
/// in place, keeping the key's original slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawdataMessage {
    pub ulid: Option<Ulid>,
    pub position: String,
    data: Vec<(String, Vec<u8>)>,
}

impl RawdataMessage {
    pub fn new(position: &str) -> Self {
        Self {
            ulid: None,
            position: position.to_string(),
            data: Vec::new(),
        }
    }

    pub fn with_ulid(mut self, ulid: Ulid) -> Self {
        self.ulid = Some(ulid);
        self
    }

    /// Add a payload under `key`, overwriting any existing payload for the
    /// same key.
    pub fn put(&mut self, key: &str, payload: Vec<u8>) -> &mut Self {
        match self.data.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = payload,
            None => self.data.push((key.to_string(), payload)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, payload)| payload.as_slice())
    }

    /// Payload keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(|(k, _)| k.as_str())
    }

    /// The ordered payload entries.
    pub fn data(&self) -> &[(String, Vec<u8>)] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_preserves_insertion_order() {
        let mut message = RawdataMessage::new("1");
        message.put("b", vec![1]).put("a", vec![2]).put("c", vec![3]);

        let keys: Vec<_> = message.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn re_put_overwrites_in_place() {
        let mut message = RawdataMessage::new("1");
        message.put("a", vec![1]).put("b", vec![2]).put("a", vec![9]);

        let keys: Vec<_> = message.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(message.get("a"), Some(&[9u8][..]));
        assert_eq!(message.len(), 2);
    }
}
