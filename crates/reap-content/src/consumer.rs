use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use reap_rawdata::RawdataConsumer;
use tracing::debug;

use crate::buffer::ContentBuffer;
use crate::error::{ContentError, Result};
use crate::stream::StreamInner;

/// Per-topic pull-based reader: converts backend messages back into
/// [`ContentBuffer`] views for downstream readers.
pub struct ContentStreamConsumer {
    consumer: Arc<dyn RawdataConsumer>,
    stream: Weak<StreamInner>,
    closed: AtomicBool,
}

impl ContentStreamConsumer {
    pub(crate) fn new(consumer: Arc<dyn RawdataConsumer>, stream: Weak<StreamInner>) -> Self {
        Self {
            consumer,
            stream,
            closed: AtomicBool::new(false),
        }
    }

    pub fn topic(&self) -> &str {
        self.consumer.topic()
    }

    /// Blocking pull. `None` once `timeout` elapses with nothing new;
    /// "no data" is never an error.
    pub fn receive(&self, timeout: Duration) -> Result<Option<ContentBuffer>> {
        if self.is_closed() {
            return Err(ContentError::ClosedStream);
        }
        Ok(self
            .consumer
            .receive(timeout)?
            .map(ContentBuffer::from_message))
    }

    /// Reposition the read cursor; semantics are the backend's, passed
    /// through unchanged.
    pub fn seek(&self, timestamp_millis: u64) -> Result<()> {
        if self.is_closed() {
            return Err(ContentError::ClosedStream);
        }
        self.consumer.seek(timestamp_millis)?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.consumer.is_closed()
    }

    /// Idempotent. Deregisters from the stream, then closes the backend
    /// handle.
    pub fn close(&self) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        if let Some(stream) = self.stream.upgrade() {
            stream.evict_consumer(self.topic());
        }
        self.consumer.close()?;

        debug!(topic = %self.topic(), "content consumer closed");
        Ok(())
    }
}
