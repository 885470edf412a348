use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use reap_crypto::ContentCipher;
use reap_rawdata::RawdataClient;
use reap_types::{ContentStateKey, HttpRequestInfo, MetadataRecord, ResourceType};
use tracing::debug;

use crate::buffer::ContentBufferBuilder;
use crate::error::{ContentError, Result};
use crate::lock::{TopicLock, TopicLockError};
use crate::monitor::{HealthMonitor, HealthSnapshot};
use crate::producer::PayloadTransform;
use crate::stream::ContentStream;

/// Suffix isolating pagination documents into a sibling stream of their
/// topic.
const PAGINATION_TOPIC_SUFFIX: &str = "-pages";

/// The content store: buffers related content items per (topic, position),
/// packages them with a generated manifest, optionally encrypts payloads at
/// rest, and publishes each complete set atomically as one backend message.
///
/// Buffer mutation for a single (topic, position) is not auto-serialized;
/// callers that buffer the same position from several threads must bracket
/// those calls with [`lock`](Self::lock)/[`unlock`](Self::unlock). The
/// store's lifetime bounds all registries; there is no module-level state.
pub struct ContentStore {
    monitor: HealthMonitor,
    content_stream: ContentStream,
    transform: PayloadTransform,
    content_buffers: Mutex<HashMap<ContentStateKey, ContentBufferBuilder>>,
    lock_by_topic: Mutex<HashMap<String, Arc<TopicLock>>>,
    closed: AtomicBool,
}

impl ContentStore {
    /// A store without at-rest encryption: payloads pass through unchanged.
    pub fn new(client: Arc<dyn RawdataClient>) -> Self {
        Self::build(client, None)
    }

    /// A store that seals every payload (manifest included) under a key
    /// derived once from `passphrase` and `salt`. Callers own the wiping of
    /// the buffers they pass in; [`crate::config::initialize`] does so via
    /// `Zeroizing`.
    pub fn with_encryption(
        client: Arc<dyn RawdataClient>,
        passphrase: &[u8],
        salt: &[u8],
    ) -> Result<Self> {
        let key = reap_crypto::SecretKey::derive(passphrase, salt)?;
        Ok(Self::build(client, Some(ContentCipher::new(key))))
    }

    fn build(client: Arc<dyn RawdataClient>, cipher: Option<ContentCipher>) -> Self {
        let transform: PayloadTransform = match cipher {
            Some(cipher) => {
                let cipher = Arc::new(cipher);
                Arc::new(move |payload| cipher.encrypt(&payload).map_err(ContentError::from))
            }
            None => Arc::new(|payload| Ok(payload)),
        };

        Self {
            monitor: HealthMonitor::new(),
            content_stream: ContentStream::new(client, Arc::clone(&transform)),
            transform,
            content_buffers: Mutex::new(HashMap::new()),
            lock_by_topic: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// The stream registry, for downstream readers that consume published
    /// buffers.
    pub fn content_stream(&self) -> &ContentStream {
        &self.content_stream
    }

    /// Acquire `topic`'s reentrant lock. An acquisition abandoned because a
    /// holder panicked surfaces as [`ContentError::LockInterrupted`],
    /// never silently swallowed.
    pub fn lock(&self, topic: &str) -> Result<()> {
        self.ensure_open()?;
        let lock = {
            let mut locks = self.lock_by_topic.lock().expect("topic lock registry poisoned");
            Arc::clone(locks.entry(topic.to_string()).or_default())
        };
        lock.acquire().map_err(|e| Self::lock_error(e, topic))
    }

    /// Release `topic`'s lock; the calling thread must hold it.
    pub fn unlock(&self, topic: &str) -> Result<()> {
        let lock = {
            let locks = self.lock_by_topic.lock().expect("topic lock registry poisoned");
            locks.get(topic).cloned()
        };
        match lock {
            Some(lock) => lock.release().map_err(|e| Self::lock_error(e, topic)),
            None => Err(ContentError::LockNotHeld {
                topic: topic.to_string(),
            }),
        }
    }

    fn lock_error(error: TopicLockError, topic: &str) -> ContentError {
        match error {
            TopicLockError::Interrupted => ContentError::LockInterrupted {
                topic: topic.to_string(),
            },
            TopicLockError::NotHeld => ContentError::LockNotHeld {
                topic: topic.to_string(),
            },
        }
    }

    /// The backend's most recent position for `topic`; `None` when the
    /// topic has never been written.
    pub fn last_position(&self, topic: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        self.content_stream.last_position(topic)
    }

    /// Content keys currently buffered (not yet published) for the given
    /// position; empty when nothing is buffered.
    pub fn content_keys(&self, topic: &str, position: &str) -> Result<BTreeSet<String>> {
        self.ensure_open()?;
        let buffers = self.content_buffers.lock().expect("content buffer lock poisoned");
        Ok(buffers
            .get(&ContentStateKey::new(topic, position))
            .map(|builder| builder.keys())
            .unwrap_or_default())
    }

    /// Single-item immediate-publish path for pagination documents.
    ///
    /// Publishes to the sibling stream `topic + "-pages"` in the same call;
    /// the shared buffer map is never involved.
    pub fn add_pagination_document(
        &self,
        topic: &str,
        position: &str,
        content_key: &str,
        content: &[u8],
        request_info: &HttpRequestInfo,
    ) -> Result<()> {
        self.ensure_open()?;
        let started = Instant::now();

        let pagination_topic = format!("{topic}{PAGINATION_TOPIC_SUFFIX}");
        let producer = self.content_stream.producer(&pagination_topic)?;
        let mut builder = producer.builder()?;
        builder.position(position);

        let metadata = self.metadata_record(
            &pagination_topic,
            position,
            content_key,
            content.len() as u64,
            ResourceType::Page,
            request_info,
            BTreeMap::new(),
        );

        let content = (self.transform)(content.to_vec())?;
        let stored_len = content.len() as u64;
        builder.buffer(content_key, content, Some(metadata));

        producer.produce(&builder)?;
        producer.publish(&[position])?;

        self.monitor
            .record_pagination_document(stored_len, started.elapsed());
        Ok(())
    }

    /// Accumulate one pagination entry into the shared buffer for
    /// (topic, position), creating it on first reference. Not sent to the
    /// backend until [`publish`](Self::publish).
    pub fn buffer_pagination_entry_document(
        &self,
        topic: &str,
        position: &str,
        content_key: &str,
        content: &[u8],
        request_info: &HttpRequestInfo,
        state: BTreeMap<String, serde_json::Value>,
    ) -> Result<()> {
        self.ensure_open()?;
        let started = Instant::now();

        let stored_len = self.buffer_content(
            topic,
            position,
            content_key,
            content,
            ResourceType::Entry,
            request_info,
            state,
        )?;

        self.monitor.record_entry_buffer(stored_len, started.elapsed());
        Ok(())
    }

    /// Accumulate one document into the shared buffer for (topic,
    /// position), creating it on first reference. Not sent to the backend
    /// until [`publish`](Self::publish).
    pub fn buffer_document(
        &self,
        topic: &str,
        position: &str,
        content_key: &str,
        content: &[u8],
        request_info: &HttpRequestInfo,
    ) -> Result<()> {
        self.ensure_open()?;
        let started = Instant::now();

        let stored_len = self.buffer_content(
            topic,
            position,
            content_key,
            content,
            ResourceType::Document,
            request_info,
            BTreeMap::new(),
        )?;

        self.monitor
            .record_document_buffer(stored_len, started.elapsed());
        Ok(())
    }

    fn buffer_content(
        &self,
        topic: &str,
        position: &str,
        content_key: &str,
        content: &[u8],
        resource_type: ResourceType,
        request_info: &HttpRequestInfo,
        state: BTreeMap<String, serde_json::Value>,
    ) -> Result<u64> {
        let producer = self.content_stream.producer(topic)?;

        let metadata = self.metadata_record(
            topic,
            position,
            content_key,
            content.len() as u64,
            resource_type,
            request_info,
            state,
        );

        let content = (self.transform)(content.to_vec())?;
        let stored_len = content.len() as u64;

        let mut buffers = self.content_buffers.lock().expect("content buffer lock poisoned");
        let builder = match buffers.entry(ContentStateKey::new(topic, position)) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => vacant.insert(producer.builder()?),
        };
        builder
            .position(position)
            .buffer(content_key, content, Some(metadata));
        Ok(stored_len)
    }

    /// Seal and publish the buffers of the given positions as one backend
    /// call, then drop them from the in-process map.
    ///
    /// A position never buffered publishes a manifest-only message (empty
    /// manifest array). On failure the error propagates and the failed
    /// position's buffer stays in the map, so the caller may retry.
    pub fn publish(&self, topic: &str, positions: &[&str]) -> Result<()> {
        self.ensure_open()?;
        let started = Instant::now();

        let producer = self.content_stream.producer(topic)?;
        for position in positions {
            let key = ContentStateKey::new(topic, position);
            let builder = {
                let buffers = self.content_buffers.lock().expect("content buffer lock poisoned");
                match buffers.get(&key) {
                    Some(builder) => builder.clone(),
                    None => {
                        let mut builder = producer.builder()?;
                        builder.position(position);
                        builder
                    }
                }
            };

            let buffered_keys = producer.produce(&builder)?;
            // Exclude the synthetic manifest entry: it was never counted
            // during buffering.
            self.monitor
                .record_published_buffer(buffered_keys.saturating_sub(1) as u64);
            self.content_buffers
                .lock()
                .expect("content buffer lock poisoned")
                .remove(&key);
        }
        producer.publish(positions)?;

        // The backend is only touched when buffers are published; a
        // successful publish is the liveness signal.
        self.monitor.update_last_seen();
        self.monitor
            .record_publish(positions.len() as u64, started.elapsed());
        Ok(())
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    /// Counter snapshot plus gauges sampled from the in-process buffer map.
    pub fn health(&self) -> HealthSnapshot {
        let (active_position_count, active_buffer_count) = {
            let buffers = self.content_buffers.lock().expect("content buffer lock poisoned");
            let keys = buffers.values().map(ContentBufferBuilder::key_count).sum();
            (buffers.len(), keys)
        };
        self.monitor
            .snapshot(!self.is_closed(), active_position_count, active_buffer_count)
    }

    /// Close and evict `topic`'s producer under the topic lock; other
    /// topics are unaffected.
    pub fn close_topic(&self, topic: &str) -> Result<()> {
        self.ensure_open()?;
        self.lock(topic)?;
        let result = self.content_stream.close_and_remove_producer(topic);
        self.unlock(topic)?;
        result
    }

    /// Idempotent. Closes the stream registry (all producers and
    /// consumers, then the backend client).
    pub fn close(&self) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }
        self.content_stream.close()?;
        debug!("content store closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ContentError::ClosedStream);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn metadata_record(
        &self,
        topic: &str,
        position: &str,
        content_key: &str,
        content_length: u64,
        resource_type: ResourceType,
        request_info: &HttpRequestInfo,
        state: BTreeMap<String, serde_json::Value>,
    ) -> MetadataRecord {
        MetadataRecord::builder(resource_type)
            .correlation_ids(request_info.correlation_ids.clone())
            .url(&request_info.url)
            .status_code(request_info.status_code)
            .topic(topic)
            .position(position)
            .content_key(content_key)
            .content_type(request_info.content_type())
            .content_length(content_length)
            .request_duration_nanos(request_info.request_duration_nanos)
            .request_headers(request_info.request_headers.clone())
            .response_headers(request_info.response_headers.clone())
            .state(state)
            .build()
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active_positions = self
            .content_buffers
            .lock()
            .map(|buffers| buffers.len())
            .unwrap_or(0);
        f.debug_struct("ContentStore")
            .field("closed", &self.is_closed())
            .field("active_positions", &active_positions)
            .finish()
    }
}
