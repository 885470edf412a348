use std::collections::BTreeMap;

use tracing::info;
use zeroize::Zeroizing;

use crate::error::{ContentError, Result};
use crate::store::ContentStore;

/// Settings key holding the at-rest encryption passphrase.
pub const ENCRYPTION_KEY: &str = "rawdata.encryption.key";

/// Settings key holding the at-rest encryption salt.
pub const ENCRYPTION_SALT: &str = "rawdata.encryption.salt";

/// Build a [`ContentStore`] from a settings map.
///
/// The backend provider is selected by `rawdata.client.provider` (its
/// provider-specific keys pass through opaquely). Encryption is enabled
/// when both [`ENCRYPTION_KEY`] and [`ENCRYPTION_SALT`] are present;
/// specifying exactly one is fatal here, not deferred to first use. The
/// credential copies taken for derivation are wiped on every path.
pub fn initialize(settings: &BTreeMap<String, String>) -> Result<ContentStore> {
    info!(
        provider = settings.get(reap_rawdata::provider::PROVIDER_KEY).map(String::as_str),
        encryption = settings.contains_key(ENCRYPTION_KEY),
        "initializing content store"
    );

    let client = reap_rawdata::configure(settings)?;

    match (settings.get(ENCRYPTION_KEY), settings.get(ENCRYPTION_SALT)) {
        (None, None) => Ok(ContentStore::new(client)),
        (Some(passphrase), Some(salt)) => {
            let passphrase = Zeroizing::new(passphrase.as_bytes().to_vec());
            let salt = Zeroizing::new(salt.as_bytes().to_vec());
            ContentStore::with_encryption(client, &passphrase, &salt)
        }
        (Some(_), None) => Err(ContentError::Configuration(format!(
            "{ENCRYPTION_KEY} is set but {ENCRYPTION_SALT} is missing"
        ))),
        (None, Some(_)) => Err(ContentError::Configuration(format!(
            "{ENCRYPTION_SALT} is set but {ENCRYPTION_KEY} is missing"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn initializes_plain_store_from_memory_provider() {
        let store = initialize(&settings(&[("rawdata.client.provider", "memory")])).unwrap();
        assert!(!store.is_closed());
    }

    #[test]
    fn initializes_encrypting_store_when_both_credentials_present() {
        let store = initialize(&settings(&[
            ("rawdata.client.provider", "memory"),
            (ENCRYPTION_KEY, "password"),
            (ENCRYPTION_SALT, "salt"),
        ]))
        .unwrap();
        assert!(!store.is_closed());
    }

    #[test]
    fn half_configured_encryption_is_fatal() {
        let missing_salt = initialize(&settings(&[
            ("rawdata.client.provider", "memory"),
            (ENCRYPTION_KEY, "password"),
        ]))
        .unwrap_err();
        assert!(matches!(missing_salt, ContentError::Configuration(_)));

        let missing_key = initialize(&settings(&[
            ("rawdata.client.provider", "memory"),
            (ENCRYPTION_SALT, "salt"),
        ]))
        .unwrap_err();
        assert!(matches!(missing_key, ContentError::Configuration(_)));
    }

    #[test]
    fn empty_credential_is_fatal() {
        let error = initialize(&settings(&[
            ("rawdata.client.provider", "memory"),
            (ENCRYPTION_KEY, ""),
            (ENCRYPTION_SALT, "salt"),
        ]))
        .unwrap_err();
        assert!(matches!(error, ContentError::Crypto(_)));
    }

    #[test]
    fn unknown_provider_is_fatal() {
        let error = initialize(&settings(&[("rawdata.client.provider", "pulsar")])).unwrap_err();
        assert!(matches!(error, ContentError::Backend(_)));
    }
}
