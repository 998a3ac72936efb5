//! # Content Migrate Shared
//!
//! This crate defines shared data structures used across the content migration crates.
//! It includes record identifiers, media asset metadata and the run-scoped identifier map
//! used to translate source-side identifiers into target-side ones.

pub mod types;

pub use types::identifier_map::IdentifierMap;
pub use types::media_asset::MediaAsset;
pub use types::record_id::RecordId;
