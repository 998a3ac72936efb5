//! HTTP implementation of the content store.

mod client;

pub use client::HttpContentStore;
