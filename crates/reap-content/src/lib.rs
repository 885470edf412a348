//! Content store for the Reap harvesting pipeline.
//!
//! Sits between the pipeline's content-store contract and the rawdata
//! append-log transport. Related content items accumulate per
//! (topic, position), get packaged with a generated `manifest.json`
//! describing their provenance, are optionally sealed at rest, and are
//! published atomically as one logical backend message.
//!
//! The protocol is two-phase: `buffer_*` calls only mutate the in-process
//! buffer map; [`ContentStore::publish`] is the single point at which
//! buffered content becomes externally visible. Pagination documents are
//! the exception: they publish immediately to a `-pages` sibling topic.

pub mod buffer;
pub mod config;
pub mod consumer;
pub mod error;
pub mod manifest;
pub mod monitor;
pub mod producer;
pub mod store;
pub mod stream;

mod lock;

pub use buffer::{ContentBuffer, ContentBufferBuilder};
pub use config::initialize;
pub use consumer::ContentStreamConsumer;
pub use error::{ContentError, Result};
pub use manifest::MANIFEST_KEY;
pub use monitor::{HealthMonitor, HealthSnapshot};
pub use producer::{ContentStreamProducer, PayloadTransform};
pub use store::ContentStore;
pub use stream::ContentStream;
