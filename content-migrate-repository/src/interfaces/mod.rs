//! Interface definitions for the content store.
//!
//! This module defines the abstract `ContentStore` trait that allows the pipeline to run
//! against a live store or an in-memory mock.

mod content_store;

pub use content_store::ContentStore;
