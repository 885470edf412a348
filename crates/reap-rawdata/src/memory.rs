use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use ulid::Ulid;

use crate::error::{RawdataError, Result};
use crate::message::RawdataMessage;
use crate::traits::{RawdataClient, RawdataConsumer, RawdataProducer};

/// One published message plus its publish timestamp (for `seek`).
#[derive(Clone, Debug)]
struct PublishedMessage {
    publish_millis: u64,
    message: RawdataMessage,
}

/// Topic logs shared between the client and its handles. The condvar wakes
/// consumers blocked in `receive` whenever a publish lands.
#[derive(Default)]
struct Shared {
    topics: Mutex<HashMap<String, Vec<PublishedMessage>>>,
    arrivals: Condvar,
}

/// In-memory rawdata provider for tests, local runs, and embedding.
///
/// Messages are held per topic in publish order. A message published
/// without a ULID gets one assigned here, matching backend behavior.
pub struct MemoryRawdataClient {
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl MemoryRawdataClient {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            closed: AtomicBool::new(false),
        }
    }
}

impl Default for MemoryRawdataClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RawdataClient for MemoryRawdataClient {
    fn producer(&self, topic: &str) -> Result<Arc<dyn RawdataProducer>> {
        if self.is_closed() {
            return Err(RawdataError::Closed);
        }
        Ok(Arc::new(MemoryProducer {
            topic: topic.to_string(),
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        }))
    }

    fn consumer(&self, topic: &str) -> Result<Arc<dyn RawdataConsumer>> {
        if self.is_closed() {
            return Err(RawdataError::Closed);
        }
        Ok(Arc::new(MemoryConsumer {
            topic: topic.to_string(),
            shared: Arc::clone(&self.shared),
            cursor: Mutex::new(0),
            closed: AtomicBool::new(false),
        }))
    }

    fn last_message(&self, topic: &str) -> Result<Option<RawdataMessage>> {
        if self.is_closed() {
            return Err(RawdataError::Closed);
        }
        let topics = self
            .shared
            .topics
            .lock()
            .map_err(|_| RawdataError::Backend("topic log lock poisoned".into()))?;
        Ok(topics
            .get(topic)
            .and_then(|log| log.last())
            .map(|published| published.message.clone()))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<()> {
        if self.closed.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            // Wake blocked receivers so they can observe the timeout path.
            self.shared.arrivals.notify_all();
        }
        Ok(())
    }
}

struct MemoryProducer {
    topic: String,
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl RawdataProducer for MemoryProducer {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn publish(&self, messages: Vec<RawdataMessage>) -> Result<()> {
        if self.is_closed() {
            return Err(RawdataError::Closed);
        }

        let publish_millis = now_millis();
        let mut topics = self
            .shared
            .topics
            .lock()
            .map_err(|_| RawdataError::Backend("topic log lock poisoned".into()))?;
        let log = topics.entry(self.topic.clone()).or_default();

        for mut message in messages {
            if message.ulid.is_none() {
                message.ulid = Some(Ulid::new());
            }
            log.push(PublishedMessage {
                publish_millis,
                message,
            });
        }

        drop(topics);
        self.shared.arrivals.notify_all();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryConsumer {
    topic: String,
    shared: Arc<Shared>,
    cursor: Mutex<usize>,
    closed: AtomicBool,
}

impl RawdataConsumer for MemoryConsumer {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn receive(&self, timeout: Duration) -> Result<Option<RawdataMessage>> {
        if self.is_closed() {
            return Err(RawdataError::Closed);
        }

        let deadline = Instant::now() + timeout;
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| RawdataError::Backend("consumer cursor lock poisoned".into()))?;
        let mut topics = self
            .shared
            .topics
            .lock()
            .map_err(|_| RawdataError::Backend("topic log lock poisoned".into()))?;

        loop {
            if let Some(log) = topics.get(&self.topic) {
                if *cursor < log.len() {
                    let message = log[*cursor].message.clone();
                    *cursor += 1;
                    return Ok(Some(message));
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let (guard, wait) = self
                .shared
                .arrivals
                .wait_timeout(topics, remaining)
                .map_err(|_| RawdataError::Backend("topic log lock poisoned".into()))?;
            topics = guard;
            if wait.timed_out() {
                // One final check below the timeout: a publish may have
                // raced the wakeup.
                continue;
            }
        }
    }

    fn seek(&self, timestamp_millis: u64) -> Result<()> {
        if self.is_closed() {
            return Err(RawdataError::Closed);
        }

        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| RawdataError::Backend("consumer cursor lock poisoned".into()))?;
        let topics = self
            .shared
            .topics
            .lock()
            .map_err(|_| RawdataError::Backend("topic log lock poisoned".into()))?;

        let log = topics.get(&self.topic);
        *cursor = match log {
            Some(log) => log
                .iter()
                .position(|published| published.publish_millis >= timestamp_millis)
                .unwrap_or(log.len()),
            None => 0,
        };
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn message(position: &str, key: &str, payload: &[u8]) -> RawdataMessage {
        let mut message = RawdataMessage::new(position);
        message.put(key, payload.to_vec());
        message
    }

    #[test]
    fn publish_assigns_ulid_and_updates_last_message() {
        let client = MemoryRawdataClient::new();
        let producer = client.producer("t").unwrap();

        producer.publish(vec![message("1", "a", &[1])]).unwrap();
        producer.publish(vec![message("2", "b", &[2])]).unwrap();

        let last = client.last_message("t").unwrap().unwrap();
        assert_eq!(last.position, "2");
        assert!(last.ulid.is_some());
        assert_eq!(client.last_message("unwritten").unwrap(), None);
    }

    #[test]
    fn receive_drains_in_publish_order() {
        let client = MemoryRawdataClient::new();
        let producer = client.producer("t").unwrap();
        let consumer = client.consumer("t").unwrap();

        producer
            .publish(vec![message("1", "a", &[1]), message("2", "b", &[2])])
            .unwrap();

        let first = consumer.receive(Duration::from_millis(100)).unwrap().unwrap();
        let second = consumer.receive(Duration::from_millis(100)).unwrap().unwrap();
        assert_eq!(first.position, "1");
        assert_eq!(second.position, "2");
    }

    #[test]
    fn receive_times_out_with_none() {
        let client = MemoryRawdataClient::new();
        let consumer = client.consumer("t").unwrap();

        let received = consumer.receive(Duration::from_millis(20)).unwrap();
        assert_eq!(received, None);
    }

    #[test]
    fn blocked_receive_wakes_on_publish() {
        let client = Arc::new(MemoryRawdataClient::new());
        let consumer = client.consumer("t").unwrap();

        let publisher = {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                let producer = client.producer("t").unwrap();
                producer.publish(vec![message("1", "a", &[1])]).unwrap();
            })
        };

        let received = consumer.receive(Duration::from_secs(5)).unwrap();
        publisher.join().unwrap();
        assert_eq!(received.unwrap().position, "1");
    }

    #[test]
    fn seek_repositions_the_cursor() {
        let client = MemoryRawdataClient::new();
        let producer = client.producer("t").unwrap();
        let consumer = client.consumer("t").unwrap();

        producer.publish(vec![message("1", "a", &[1])]).unwrap();
        assert!(consumer.receive(Duration::from_millis(100)).unwrap().is_some());
        assert!(consumer.receive(Duration::from_millis(10)).unwrap().is_none());

        // Rewind to the beginning of time and re-read everything.
        consumer.seek(0).unwrap();
        let replayed = consumer.receive(Duration::from_millis(100)).unwrap().unwrap();
        assert_eq!(replayed.position, "1");

        // Seeking past the newest message leaves nothing to read.
        consumer.seek(u64::MAX).unwrap();
        assert!(consumer.receive(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn closed_handles_reject_operations() {
        let client = MemoryRawdataClient::new();
        let producer = client.producer("t").unwrap();
        let consumer = client.consumer("t").unwrap();

        producer.close().unwrap();
        consumer.close().unwrap();

        assert_eq!(
            producer.publish(vec![message("1", "a", &[1])]).unwrap_err(),
            RawdataError::Closed
        );
        assert_eq!(
            consumer.receive(Duration::from_millis(10)).unwrap_err(),
            RawdataError::Closed
        );

        client.close().unwrap();
        client.close().unwrap();
        assert!(client.is_closed());
        assert_eq!(client.producer("t").err(), Some(RawdataError::Closed));
    }
}
