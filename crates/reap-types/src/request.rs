use crate::headers::Headers;

/// Request/response provenance captured by the harvesting pipeline for one
/// fetched resource. Carried into every manifest record built from it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpRequestInfo {
    /// Correlation ids linking this fetch to its pipeline execution,
    /// outermost first.
    pub correlation_ids: Vec<String>,
    pub url: String,
    /// HTTP status of the response; `None` when the fetch never produced
    /// one.
    pub status_code: Option<u16>,
    pub request_headers: Headers,
    pub response_headers: Headers,
    pub request_duration_nanos: u64,
}

impl HttpRequestInfo {
    pub fn new(correlation_ids: Vec<String>, url: &str) -> Self {
        Self {
            correlation_ids,
            url: url.to_string(),
            ..Self::default()
        }
    }

    /// The response `content-type`, when one was recorded.
    pub fn content_type(&self) -> Option<&str> {
        self.response_headers.first_value("content-type")
    }
}
