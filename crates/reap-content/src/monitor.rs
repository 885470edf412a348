use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Passive health counters fed by the content store.
///
/// Counters are monotonic; `last_*` values are last-observed. `last_seen`
/// is updated only on successful publish: the rawdata backend is touched
/// only when buffers are published, so that is the liveness signal, not
/// "last call attempted". The active-position and active-buffer gauges are
/// not tracked here: the store samples its buffer map when building a
/// [`HealthSnapshot`].
#[derive(Debug, Default)]
pub struct HealthMonitor {
    pagination_document_count: AtomicU64,
    pagination_document_size: AtomicU64,
    entry_buffer_count: AtomicU64,
    entry_buffer_size: AtomicU64,
    document_buffer_count: AtomicU64,
    document_buffer_size: AtomicU64,
    published_buffer_count: AtomicU64,
    last_published_buffer_count: AtomicU64,
    published_position_count: AtomicU64,
    last_pagination_document_write_millis: AtomicU64,
    last_entry_buffer_write_millis: AtomicU64,
    last_document_buffer_write_millis: AtomicU64,
    last_publish_write_millis: AtomicU64,
    last_seen_epoch_millis: AtomicU64,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_pagination_document(&self, bytes: u64, elapsed: Duration) {
        self.pagination_document_count.fetch_add(1, Ordering::Relaxed);
        self.pagination_document_size.fetch_add(bytes, Ordering::Relaxed);
        self.last_pagination_document_write_millis
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_entry_buffer(&self, bytes: u64, elapsed: Duration) {
        self.entry_buffer_count.fetch_add(1, Ordering::Relaxed);
        self.entry_buffer_size.fetch_add(bytes, Ordering::Relaxed);
        self.last_entry_buffer_write_millis
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_document_buffer(&self, bytes: u64, elapsed: Duration) {
        self.document_buffer_count.fetch_add(1, Ordering::Relaxed);
        self.document_buffer_size.fetch_add(bytes, Ordering::Relaxed);
        self.last_document_buffer_write_millis
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    /// Record one published buffer's content-key count, excluding the
    /// synthetic manifest entry (it is not counted during buffering).
    pub(crate) fn record_published_buffer(&self, content_keys: u64) {
        self.published_buffer_count.fetch_add(content_keys, Ordering::Relaxed);
        self.last_published_buffer_count.store(content_keys, Ordering::Relaxed);
    }

    pub(crate) fn record_publish(&self, positions: u64, elapsed: Duration) {
        self.published_position_count.fetch_add(positions, Ordering::Relaxed);
        self.last_publish_write_millis
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn update_last_seen(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        self.last_seen_epoch_millis.store(now, Ordering::Relaxed);
    }

    pub fn published_position_count(&self) -> u64 {
        self.published_position_count.load(Ordering::Relaxed)
    }

    pub fn published_buffer_count(&self) -> u64 {
        self.published_buffer_count.load(Ordering::Relaxed)
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        match self.last_seen_epoch_millis.load(Ordering::Relaxed) {
            0 => None,
            millis => Utc.timestamp_millis_opt(millis as i64).single(),
        }
    }

    pub(crate) fn snapshot(
        &self,
        up: bool,
        active_position_count: usize,
        active_buffer_count: usize,
    ) -> HealthSnapshot {
        HealthSnapshot {
            up,
            last_seen: self.last_seen(),
            pagination_document_count: self.pagination_document_count.load(Ordering::Relaxed),
            pagination_document_size_bytes: self.pagination_document_size.load(Ordering::Relaxed),
            entry_buffer_count: self.entry_buffer_count.load(Ordering::Relaxed),
            entry_buffer_size_bytes: self.entry_buffer_size.load(Ordering::Relaxed),
            document_buffer_count: self.document_buffer_count.load(Ordering::Relaxed),
            document_buffer_size_bytes: self.document_buffer_size.load(Ordering::Relaxed),
            published_buffer_count: self.published_buffer_count.load(Ordering::Relaxed),
            last_published_buffer_count: self.last_published_buffer_count.load(Ordering::Relaxed),
            published_position_count: self.published_position_count.load(Ordering::Relaxed),
            last_pagination_document_write_millis: self
                .last_pagination_document_write_millis
                .load(Ordering::Relaxed),
            last_entry_buffer_write_millis: self
                .last_entry_buffer_write_millis
                .load(Ordering::Relaxed),
            last_document_buffer_write_millis: self
                .last_document_buffer_write_millis
                .load(Ordering::Relaxed),
            last_publish_write_millis: self.last_publish_write_millis.load(Ordering::Relaxed),
            active_position_count,
            active_buffer_count,
        }
    }
}

/// Point-in-time view of the monitor's counters plus the sampled gauges.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    pub pagination_document_count: u64,
    pub pagination_document_size_bytes: u64,
    pub entry_buffer_count: u64,
    pub entry_buffer_size_bytes: u64,
    pub document_buffer_count: u64,
    pub document_buffer_size_bytes: u64,
    pub published_buffer_count: u64,
    pub last_published_buffer_count: u64,
    pub published_position_count: u64,
    pub last_pagination_document_write_millis: u64,
    pub last_entry_buffer_write_millis: u64,
    pub last_document_buffer_write_millis: u64,
    pub last_publish_write_millis: u64,
    pub active_position_count: usize,
    pub active_buffer_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_last_values_overwrite() {
        let monitor = HealthMonitor::new();

        monitor.record_entry_buffer(10, Duration::from_millis(5));
        monitor.record_entry_buffer(20, Duration::from_millis(9));
        monitor.record_published_buffer(2);
        monitor.record_published_buffer(3);
        monitor.record_publish(2, Duration::from_millis(12));

        let snapshot = monitor.snapshot(true, 1, 4);
        assert_eq!(snapshot.entry_buffer_count, 2);
        assert_eq!(snapshot.entry_buffer_size_bytes, 30);
        assert_eq!(snapshot.last_entry_buffer_write_millis, 9);
        assert_eq!(snapshot.published_buffer_count, 5);
        assert_eq!(snapshot.last_published_buffer_count, 3);
        assert_eq!(snapshot.published_position_count, 2);
        assert_eq!(snapshot.active_position_count, 1);
        assert_eq!(snapshot.active_buffer_count, 4);
    }

    #[test]
    fn last_seen_starts_absent_and_moves_on_update() {
        let monitor = HealthMonitor::new();
        assert!(monitor.last_seen().is_none());

        monitor.update_last_seen();
        assert!(monitor.last_seen().is_some());
    }

    #[test]
    fn snapshot_serializes_with_camel_case_names() {
        let monitor = HealthMonitor::new();
        monitor.record_document_buffer(7, Duration::from_millis(1));

        let json: serde_json::Value =
            serde_json::to_value(monitor.snapshot(true, 0, 0)).unwrap();
        assert_eq!(json["documentBufferCount"], 1);
        assert_eq!(json["documentBufferSizeBytes"], 7);
        assert_eq!(json["up"], true);
        assert!(json.get("lastSeen").is_none());
    }
}
