use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use reap_rawdata::RawdataClient;
use tracing::debug;

use crate::consumer::ContentStreamConsumer;
use crate::error::{ContentError, Result};
use crate::producer::{ContentStreamProducer, PayloadTransform};

/// Shared registry state. Producers/consumers hold a `Weak` back-reference
/// so closing a handle deregisters it without keeping the registry alive.
pub(crate) struct StreamInner {
    client: Arc<dyn RawdataClient>,
    transform: PayloadTransform,
    producers: RwLock<HashMap<String, Arc<ContentStreamProducer>>>,
    consumers: RwLock<HashMap<String, Arc<ContentStreamConsumer>>>,
    closed: AtomicBool,
}

impl StreamInner {
    pub(crate) fn evict_producer(&self, topic: &str) {
        self.producers
            .write()
            .expect("producer registry lock poisoned")
            .remove(topic);
    }

    pub(crate) fn evict_consumer(&self, topic: &str) {
        self.consumers
            .write()
            .expect("consumer registry lock poisoned")
            .remove(topic);
    }
}

/// Process-wide registry mapping topic name to its producer/consumer.
///
/// Handles are created lazily, at most once per topic (single winner on
/// concurrent first access), and live until explicitly closed or until the
/// registry itself closes.
pub struct ContentStream {
    inner: Arc<StreamInner>,
}

impl ContentStream {
    pub(crate) fn new(client: Arc<dyn RawdataClient>, transform: PayloadTransform) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                client,
                transform,
                producers: RwLock::new(HashMap::new()),
                consumers: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The most recently published position of `topic`; `None` when the
    /// topic has never been written.
    pub fn last_position(&self, topic: &str) -> Result<Option<String>> {
        if self.is_closed() {
            return Err(ContentError::ClosedStream);
        }
        Ok(self
            .inner
            .client
            .last_message(topic)?
            .map(|message| message.position))
    }

    /// The producer for `topic`, created on first access.
    pub fn producer(&self, topic: &str) -> Result<Arc<ContentStreamProducer>> {
        if self.is_closed() {
            return Err(ContentError::ClosedStream);
        }

        {
            let producers = self
                .inner
                .producers
                .read()
                .expect("producer registry lock poisoned");
            if let Some(producer) = producers.get(topic) {
                return Ok(Arc::clone(producer));
            }
        }

        let mut producers = self
            .inner
            .producers
            .write()
            .expect("producer registry lock poisoned");
        // Re-check under the write lock: exactly one winner creates the
        // backend handle under concurrent first access.
        if let Some(producer) = producers.get(topic) {
            return Ok(Arc::clone(producer));
        }

        let backend = self.inner.client.producer(topic)?;
        let producer = Arc::new(ContentStreamProducer::new(
            backend,
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.transform),
        ));
        producers.insert(topic.to_string(), Arc::clone(&producer));
        debug!(topic = %topic, "content producer opened");
        Ok(producer)
    }

    /// The consumer for `topic`, created on first access.
    pub fn consumer(&self, topic: &str) -> Result<Arc<ContentStreamConsumer>> {
        if self.is_closed() {
            return Err(ContentError::ClosedStream);
        }

        {
            let consumers = self
                .inner
                .consumers
                .read()
                .expect("consumer registry lock poisoned");
            if let Some(consumer) = consumers.get(topic) {
                return Ok(Arc::clone(consumer));
            }
        }

        let mut consumers = self
            .inner
            .consumers
            .write()
            .expect("consumer registry lock poisoned");
        if let Some(consumer) = consumers.get(topic) {
            return Ok(Arc::clone(consumer));
        }

        let backend = self.inner.client.consumer(topic)?;
        let consumer = Arc::new(ContentStreamConsumer::new(
            backend,
            Arc::downgrade(&self.inner),
        ));
        consumers.insert(topic.to_string(), Arc::clone(&consumer));
        debug!(topic = %topic, "content consumer opened");
        Ok(consumer)
    }

    /// Close and evict `topic`'s producer, leaving other topics untouched.
    /// A topic with no open producer is a no-op.
    pub fn close_and_remove_producer(&self, topic: &str) -> Result<()> {
        let producer = self
            .inner
            .producers
            .write()
            .expect("producer registry lock poisoned")
            .remove(topic);
        match producer {
            Some(producer) => producer.close(),
            None => Ok(()),
        }
    }

    /// Close and evict `topic`'s consumer, leaving other topics untouched.
    pub fn close_and_remove_consumer(&self, topic: &str) -> Result<()> {
        let consumer = self
            .inner
            .consumers
            .write()
            .expect("consumer registry lock poisoned")
            .remove(topic);
        match consumer {
            Some(consumer) => consumer.close(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Idempotent. Closes every producer, then every consumer, then the
    /// backend client. The maps are drained first so no member-close runs
    /// while a registry lock is held.
    pub fn close(&self) -> Result<()> {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let producers: Vec<_> = {
            let mut map = self
                .inner
                .producers
                .write()
                .expect("producer registry lock poisoned");
            map.drain().map(|(_, producer)| producer).collect()
        };
        let consumers: Vec<_> = {
            let mut map = self
                .inner
                .consumers
                .write()
                .expect("consumer registry lock poisoned");
            map.drain().map(|(_, consumer)| consumer).collect()
        };

        for producer in producers {
            producer.close()?;
        }
        for consumer in consumers {
            consumer.close()?;
        }
        self.inner.client.close()?;

        debug!("content stream closed");
        Ok(())
    }
}
