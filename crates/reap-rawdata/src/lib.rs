//! Rawdata append-log transport boundary.
//!
//! The content store delegates durability and message transport to a
//! "rawdata" backend consumed through the narrow [`RawdataClient`] /
//! [`RawdataProducer`] / [`RawdataConsumer`] interface. The backend's
//! storage format, replication, and retry behavior are its own concern;
//! this crate only defines the boundary and ships the in-memory provider
//! used for tests and embedding.

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod traits;

pub use error::{RawdataError, Result};
pub use memory::MemoryRawdataClient;
pub use message::RawdataMessage;
pub use provider::configure;
pub use traits::{RawdataClient, RawdataConsumer, RawdataProducer};
