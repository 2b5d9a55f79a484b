//! `shopfront-core`: record primitives shared by every layer.
//!
//! This crate contains **pure** building blocks (no storage, no IO).

pub mod error;
pub mod id;
pub mod record;

pub use error::DomainError;
pub use id::{CollectionId, RecordId};
pub use record::Record;
