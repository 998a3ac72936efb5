//! # Content Migrate Repository
//!
//! This crate provides the interface to a headless content store and its implementations.
//! It includes the error type shared by all store operations, the `ContentStore` trait,
//! a reqwest-backed HTTP client and an in-memory mock used by tests and dry runs.

pub mod config;
pub mod errors;
pub mod http;
pub mod interfaces;
pub mod mock;
pub mod types;
pub mod utils;

pub use config::StoreConfig;
pub use errors::ContentStoreError;
pub use http::HttpContentStore;
pub use interfaces::ContentStore;
pub use mock::{MockContentStore, StoreCall};
pub use types::{ListQuery, MediaUpload, RecordPage, UploadedMedia};
