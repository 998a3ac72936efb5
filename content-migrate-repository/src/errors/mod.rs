//! Error types for the content migrate repository.
//!
//! This module provides a unified error type for all content store operations.

mod content_store_error;

pub use content_store_error::ContentStoreError;
