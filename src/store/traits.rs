//! # List Store Traits
//!
//! Core trait definition for provider-agnostic list storage.

use async_trait::async_trait;

use crate::error::Result;

/// Decoded reply of a blocking pop
///
/// Blocking pops have three distinguishable outcomes. How each is surfaced to
/// callers differs between `Queue::blocking_pop` and
/// `Queue::blocking_pop_pipe`, so providers report the raw outcome and leave
/// the mapping to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockingReply {
    /// An element was popped
    Element(Vec<u8>),
    /// The timeout elapsed with the list still empty
    TimedOut,
    /// The store answered with a reply of an unexpected shape
    Unrecognized,
}

impl BlockingReply {
    /// The popped element, if any
    pub fn into_element(self) -> Option<Vec<u8>> {
        match self {
            Self::Element(element) => Some(element),
            Self::TimedOut | Self::Unrecognized => None,
        }
    }
}

/// Core list store trait - provider-agnostic operations
///
/// Implementations provide the actual backend (Redis, in-memory). Lists are
/// addressed by key; a missing key behaves as an empty list. Elements enter
/// on the left and leave on the right.
///
/// Blocking timeouts are whole seconds, and `0` blocks until an element
/// arrives.
#[async_trait]
pub trait ListStore: Send + Sync + 'static {
    /// LPUSH: push onto the left end, returning the new length
    async fn push_left(&self, key: &str, element: &[u8]) -> Result<i64>;

    /// RPOP: pop from the right end without blocking
    async fn pop_right(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// BRPOP: pop from the right end, waiting up to `timeout_secs`
    async fn blocking_pop_right(&self, key: &str, timeout_secs: u64) -> Result<BlockingReply>;

    /// LREM key -1 element: remove the occurrence nearest the right end,
    /// returning the number removed
    async fn remove_last(&self, key: &str, element: &[u8]) -> Result<i64>;

    /// MULTI / LREM source -1 element / LPUSH destination element / EXEC
    ///
    /// The push is applied even when nothing was removed. Returns the
    /// destination length, or 0 if the transaction reply was not understood.
    async fn remove_then_push(&self, source: &str, destination: &str, element: &[u8])
        -> Result<i64>;

    /// Atomic scripted transfer: remove the occurrence nearest the right end
    /// of `source` and, only if one was removed, LPUSH it onto
    /// `destination`. Returns the destination length, or 0 when absent.
    async fn remove_and_push_if_present(
        &self,
        source: &str,
        destination: &str,
        element: &[u8],
    ) -> Result<i64>;

    /// RPOPLPUSH
    async fn pop_right_push_left(&self, source: &str, destination: &str)
        -> Result<Option<Vec<u8>>>;

    /// BRPOPLPUSH
    async fn blocking_pop_right_push_left(
        &self,
        source: &str,
        destination: &str,
        timeout_secs: u64,
    ) -> Result<BlockingReply>;

    /// DEL: returns the number of keys removed
    async fn delete(&self, key: &str) -> Result<i64>;

    /// LRANGE key 0 -1: all elements, left to right
    async fn range(&self, key: &str) -> Result<Vec<Vec<u8>>>;

    /// LLEN
    async fn length(&self, key: &str) -> Result<i64>;

    /// Provider name for logging and diagnostics
    fn provider_name(&self) -> &'static str;
}
