use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use reap_rawdata::{RawdataMessage, RawdataProducer};
use tracing::debug;

use crate::buffer::ContentBufferBuilder;
use crate::error::{ContentError, Result};
use crate::manifest::{self, MANIFEST_KEY};
use crate::stream::StreamInner;

/// Payload transform applied to everything handed to the backend: the
/// at-rest encryption gate, or identity when no key was configured.
pub type PayloadTransform = Arc<dyn Fn(Vec<u8>) -> Result<Vec<u8>> + Send + Sync>;

/// Per-topic write path: turns sealed content buffers into backend messages
/// and stages them until `publish` makes them externally visible.
///
/// Producing is a staging step: the buffer's message set becomes durable
/// only when `publish` is called for its position. Closing flushes anything
/// still staged, deregisters from the stream registry, then releases the
/// backend handle, in that order.
pub struct ContentStreamProducer {
    producer: Arc<dyn RawdataProducer>,
    stream: Weak<StreamInner>,
    transform: PayloadTransform,
    staged: Mutex<HashMap<String, Vec<RawdataMessage>>>,
    closed: AtomicBool,
}

impl ContentStreamProducer {
    pub(crate) fn new(
        producer: Arc<dyn RawdataProducer>,
        stream: Weak<StreamInner>,
        transform: PayloadTransform,
    ) -> Self {
        Self {
            producer,
            stream,
            transform,
            staged: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn topic(&self) -> &str {
        self.producer.topic()
    }

    /// A fresh buffer builder for this topic.
    pub fn builder(&self) -> Result<ContentBufferBuilder> {
        if self.is_closed() {
            return Err(ContentError::ClosedStream);
        }
        Ok(ContentBufferBuilder::new())
    }

    /// Seal `builder` and stage the resulting message for its position.
    ///
    /// Sealing appends the manifest JSON (transformed like any payload)
    /// under [`MANIFEST_KEY`]. The caller's builder is left untouched, so a
    /// failed produce leaves the in-process buffer intact for retry.
    /// Returns the sealed buffer's content-key count, manifest included.
    pub fn produce(&self, builder: &ContentBufferBuilder) -> Result<usize> {
        if self.is_closed() {
            return Err(ContentError::ClosedStream);
        }

        let manifest_json = manifest::serialize(builder.manifest())?;
        let manifest_json = (self.transform)(manifest_json)?;

        let mut sealing = builder.clone();
        sealing.buffer(MANIFEST_KEY, manifest_json, None);
        let sealed = sealing.build();
        let key_count = sealed.key_count();

        let message = sealed.to_message();
        debug!(
            topic = %self.topic(),
            position = %message.position,
            keys = key_count,
            "content buffer staged"
        );
        self.stage(message);
        Ok(key_count)
    }

    /// Hand every staged message for the given positions to the backend in
    /// one publish call. Positions with nothing staged are skipped.
    pub fn publish(&self, positions: &[&str]) -> Result<()> {
        if self.is_closed() {
            return Err(ContentError::ClosedStream);
        }

        let mut messages = Vec::new();
        {
            let mut staged = self.staged.lock().expect("staged message lock poisoned");
            for position in positions {
                if let Some(batch) = staged.remove(*position) {
                    messages.extend(batch);
                }
            }
        }

        if !messages.is_empty() {
            self.producer.publish(messages)?;
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Idempotent. Flushes staged messages, deregisters from the stream,
    /// then closes the backend handle.
    pub fn close(&self) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let flush = self.publish_all_staged();

        if let Some(stream) = self.stream.upgrade() {
            stream.evict_producer(self.topic());
        }
        let backend = self.producer.close().map_err(ContentError::from);

        debug!(topic = %self.topic(), "content producer closed");
        flush.and(backend)
    }

    fn stage(&self, message: RawdataMessage) {
        let mut staged = self.staged.lock().expect("staged message lock poisoned");
        staged
            .entry(message.position.clone())
            .or_default()
            .push(message);
    }

    fn publish_all_staged(&self) -> Result<()> {
        let messages: Vec<RawdataMessage> = {
            let mut staged = self.staged.lock().expect("staged message lock poisoned");
            staged.drain().flat_map(|(_, batch)| batch).collect()
        };

        if !messages.is_empty() {
            self.producer.publish(messages)?;
        }
        Ok(())
    }
}
