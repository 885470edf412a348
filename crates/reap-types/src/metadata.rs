use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::headers::Headers;

/// Classification of a content item within a published record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    /// A pagination document (one fetched result page).
    Page,
    /// An entry extracted from a pagination document.
    Entry,
    /// A full document fetched for an entry.
    Document,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "PAGE"),
            Self::Entry => write!(f, "ENTRY"),
            Self::Document => write!(f, "DOCUMENT"),
        }
    }
}

/// One manifest entry: the provenance of a single content item.
///
/// The JSON field names and their order are a compatibility contract:
/// manifests must be bit-reproducible across implementations. `statusCode`
/// is omitted when the response never produced one, `state` when empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub resource_type: ResourceType,
    #[serde(rename = "correlationId")]
    pub correlation_ids: Vec<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub topic: String,
    pub position: String,
    pub content_key: String,
    pub content_type: String,
    pub content_length: u64,
    #[serde(rename = "requestDurationNanoTime")]
    pub request_duration_nanos: u64,
    pub request_headers: Headers,
    pub response_headers: Headers,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state: BTreeMap<String, serde_json::Value>,
}

impl MetadataRecord {
    pub fn builder(resource_type: ResourceType) -> MetadataRecordBuilder {
        MetadataRecordBuilder::new(resource_type)
    }
}

/// Chainable constructor for [`MetadataRecord`].
///
/// `content_type` falls back to `application/octet-stream` when the response
/// carried none.
#[derive(Debug)]
pub struct MetadataRecordBuilder {
    record: MetadataRecord,
}

impl MetadataRecordBuilder {
    fn new(resource_type: ResourceType) -> Self {
        Self {
            record: MetadataRecord {
                resource_type,
                correlation_ids: Vec::new(),
                url: String::new(),
                status_code: None,
                topic: String::new(),
                position: String::new(),
                content_key: String::new(),
                content_type: "application/octet-stream".to_string(),
                content_length: 0,
                request_duration_nanos: 0,
                request_headers: Headers::new(),
                response_headers: Headers::new(),
                state: BTreeMap::new(),
            },
        }
    }

    pub fn correlation_ids(mut self, ids: Vec<String>) -> Self {
        self.record.correlation_ids = ids;
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.record.url = url.to_string();
        self
    }

    pub fn status_code(mut self, status_code: Option<u16>) -> Self {
        self.record.status_code = status_code;
        self
    }

    pub fn topic(mut self, topic: &str) -> Self {
        self.record.topic = topic.to_string();
        self
    }

    pub fn position(mut self, position: &str) -> Self {
        self.record.position = position.to_string();
        self
    }

    pub fn content_key(mut self, content_key: &str) -> Self {
        self.record.content_key = content_key.to_string();
        self
    }

    /// Set the content type; `None` keeps the octet-stream default.
    pub fn content_type(mut self, content_type: Option<&str>) -> Self {
        if let Some(content_type) = content_type {
            self.record.content_type = content_type.to_string();
        }
        self
    }

    pub fn content_length(mut self, content_length: u64) -> Self {
        self.record.content_length = content_length;
        self
    }

    pub fn request_duration_nanos(mut self, nanos: u64) -> Self {
        self.record.request_duration_nanos = nanos;
        self
    }

    pub fn request_headers(mut self, headers: Headers) -> Self {
        self.record.request_headers = headers;
        self
    }

    pub fn response_headers(mut self, headers: Headers) -> Self {
        self.record.response_headers = headers;
        self
    }

    pub fn state(mut self, state: BTreeMap<String, serde_json::Value>) -> Self {
        self.record.state = state;
        self
    }

    pub fn build(self) -> MetadataRecord {
        self.record
    }
}
