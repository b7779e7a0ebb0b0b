//! Typed operations against the remote datastore that tracks profile and
//! account assignment state.
//!
//! The runner only sees the [`StateStore`] trait. The production
//! implementation is [`HttpStateStore`], REST over a retrying HTTP core
//! with its own circuit breaker (independent from the browser-layer
//! breaker — two failure domains, two breakers). [`InMemoryStateStore`]
//! backs tests and dry runs.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod store;

pub use client::HttpStateStore;
pub use error::StateStoreError;
pub use http::{HttpClientConfig, ResilientHttpClient};
pub use memory::InMemoryStateStore;
pub use store::StateStore;
