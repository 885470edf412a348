//! Foundation types for the Reap content pipeline.
//!
//! This crate provides the identity, provenance, and manifest types shared
//! by the content-store crates. Every other Reap crate depends on
//! `reap-types`.
//!
//! # Key Types
//!
//! - [`ContentStateKey`] — Identity of one unit of work being assembled
//!   (topic + position)
//! - [`MetadataRecord`] — One manifest entry describing a fetched document's
//!   provenance
//! - [`ResourceType`] — Classification of a content item (page, entry,
//!   document)
//! - [`Headers`] — Insertion-ordered multi-valued HTTP header map
//! - [`HttpRequestInfo`] — Request/response provenance captured by the
//!   harvesting pipeline

pub mod headers;
pub mod metadata;
pub mod request;
pub mod state;

pub use headers::Headers;
pub use metadata::{MetadataRecord, MetadataRecordBuilder, ResourceType};
pub use request::HttpRequestInfo;
pub use state::ContentStateKey;
