use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::error::{RawdataError, Result};
use crate::memory::MemoryRawdataClient;
use crate::traits::RawdataClient;

/// Settings key selecting the backend provider.
pub const PROVIDER_KEY: &str = "rawdata.client.provider";

/// Build a rawdata client from a settings map.
///
/// Provider-specific keys in the map are the provider's own concern; this
/// configurator only consumes [`PROVIDER_KEY`]. The `memory` provider ships
/// in-tree; other providers plug in externally through [`RawdataClient`].
pub fn configure(settings: &BTreeMap<String, String>) -> Result<Arc<dyn RawdataClient>> {
    let provider = settings
        .get(PROVIDER_KEY)
        .ok_or_else(|| RawdataError::UnknownProvider(format!("{PROVIDER_KEY} not set")))?;

    match provider.as_str() {
        "memory" => {
            info!(provider = %provider, "rawdata client configured");
            Ok(Arc::new(MemoryRawdataClient::new()))
        }
        other => Err(RawdataError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_provider_is_configured_by_name() {
        let mut settings = BTreeMap::new();
        settings.insert(PROVIDER_KEY.to_string(), "memory".to_string());

        let client = configure(&settings).unwrap();
        assert!(!client.is_closed());
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let mut settings = BTreeMap::new();
        settings.insert(PROVIDER_KEY.to_string(), "kafka".to_string());

        assert_eq!(
            configure(&settings).err(),
            Some(RawdataError::UnknownProvider("kafka".to_string()))
        );
        assert!(matches!(
            configure(&BTreeMap::new()).err(),
            Some(RawdataError::UnknownProvider(_))
        ));
    }
}
