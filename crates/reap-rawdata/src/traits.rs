use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::message::RawdataMessage;

/// Entry point to one rawdata backend instance.
///
/// Handles returned by `producer`/`consumer` are independent; deduplication
/// per topic is the caller's concern. All implementations must be safe for
/// concurrent use from arbitrary threads.
pub trait RawdataClient: Send + Sync {
    fn producer(&self, topic: &str) -> Result<Arc<dyn RawdataProducer>>;

    fn consumer(&self, topic: &str) -> Result<Arc<dyn RawdataConsumer>>;

    /// The most recently published message of `topic`, or `None` when the
    /// topic has never been written.
    fn last_message(&self, topic: &str) -> Result<Option<RawdataMessage>>;

    fn is_closed(&self) -> bool;

    /// Idempotent.
    fn close(&self) -> Result<()>;
}

/// Write handle for one topic.
pub trait RawdataProducer: Send + Sync {
    fn topic(&self) -> &str;

    /// Publish a batch of messages atomically with respect to readers:
    /// a consumer observes either none or all of the batch.
    fn publish(&self, messages: Vec<RawdataMessage>) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Idempotent.
    fn close(&self) -> Result<()>;
}

/// Pull-based read handle for one topic.
pub trait RawdataConsumer: Send + Sync {
    fn topic(&self) -> &str;

    /// Blocking pull. Returns `None` once `timeout` elapses with no new
    /// message; "no data" is never an error.
    fn receive(&self, timeout: Duration) -> Result<Option<RawdataMessage>>;

    /// Reposition the read cursor to the first message published at or
    /// after `timestamp_millis` (epoch milliseconds, backend clock).
    fn seek(&self, timestamp_millis: u64) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Idempotent.
    fn close(&self) -> Result<()>;
}
