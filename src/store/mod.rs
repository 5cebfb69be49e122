//! # List Store Abstraction
//!
//! The seam between queue semantics and the server that holds the lists.
//!
//! - [`ListStore`]: list, transaction and script primitives a queue needs
//! - [`RedisListStore`]: production provider over the `redis` crate
//! - [`InMemoryListStore`]: process-local provider for tests and development

pub mod providers;
mod traits;

pub use providers::{InMemoryListStore, RedisListStore};
pub use traits::{BlockingReply, ListStore};
