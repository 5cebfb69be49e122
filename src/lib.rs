#![allow(clippy::doc_markdown)] // Allow technical terms like BRPOPLPUSH, LREM in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # simpleq
//!
//! Super-simple queues backed by Redis lists.
//!
//! ## Overview
//!
//! A [`Queue`] is a handle on one list key. Elements are opaque byte strings,
//! pushed on the left and popped from the right. Ordering, durability and
//! atomicity all come from the store; this crate adds queue vocabulary, atomic
//! transfers between queues, and background [`Listener`]s.
//!
//! ## Features
//!
//! - **Transfers**: `pop_pipe`, `blocking_pop_pipe`, `pull_pipe` (MULTI/EXEC)
//!   and `safe_pull_pipe` (server-side script) move elements between queues
//!   atomically
//! - **Listeners**: one background blocking-pop loop per queue, reporting
//!   elements and store errors over bounded channels
//! - **Pluggable Stores**: [`store::RedisListStore`] for production,
//!   [`store::InMemoryListStore`] for tests
//!
//! ## Timeout conventions
//!
//! [`Queue::blocking_pop`] reports a timeout as [`SimpleqError::Timeout`],
//! while [`Queue::blocking_pop_pipe`] reports it as `Ok(None)`. Both are
//! deliberate and stable.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use simpleq::{Queue, SimpleqConfig};
//! use simpleq::store::RedisListStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> simpleq::Result<()> {
//! let config = SimpleqConfig::from_env()?;
//! let store = Arc::new(RedisListStore::from_config(&config).await?);
//!
//! let inbox = Queue::with_config(store.clone(), "mail:inbox", config.queue_config())?;
//! let processing = Queue::with_config(store, "mail:processing", config.queue_config())?;
//!
//! inbox.push(b"message-1").await?;
//!
//! let mut listener = inbox.pop_pipe_listen(&processing)?;
//! while let Some(element) = listener.next_element().await {
//!     // handle the element, then remove it from `processing`
//!     processing.pull(&element).await?;
//! }
//!
//! inbox.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod queue;
pub mod store;

pub use crate::config::{QueueConfig, SimpleqConfig};
pub use crate::error::{Result, SimpleqError};
pub use crate::listener::{Listener, ListenerState, ListenerStats};
pub use crate::queue::Queue;
