//! Browser session acquisition and teardown.
//!
//! A [`SessionFactory`] turns a [`LaunchSpec`] into a ready-to-use
//! [`BrowserSession`]: it refuses tainted proxies before spending a launch,
//! waits out an open circuit breaker, applies the launch identity, and
//! guarantees the underlying context is released when the session ends.
//! The actual browser is behind the [`BrowserBackend`] trait; production
//! embeds a real driver, tests and dry runs use [`sim::SimBackend`].

pub mod backend;
pub mod error;
pub mod factory;
pub mod page;
pub mod sim;

pub use backend::{BrowserBackend, BrowserContext, LaunchSpec};
pub use error::SessionError;
pub use factory::{BrowserSession, SessionConfig, SessionFactory};
pub use page::Page;
