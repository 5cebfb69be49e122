//! # In-Memory List Store
//!
//! Thread-safe in-memory list store for testing and development.
//!
//! ## Features
//!
//! - **Redis Semantics**: Same list ordering, LREM direction and transfer
//!   behavior as the Redis provider
//! - **Blocking Pops**: Waiters are woken by pushes via `tokio::sync::Notify`
//! - **Atomic Transfers**: Every operation runs under a single lock, so two-list
//!   moves are never observed half-applied
//! - **Fault Injection**: `fail_next` makes upcoming calls report store errors

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::{Result, SimpleqError};
use crate::store::traits::{BlockingReply, ListStore};

type Lists = HashMap<String, VecDeque<Vec<u8>>>;

/// In-memory list store
///
/// The front of each `VecDeque` is the left (head) end of the list.
///
/// # Example
///
/// ```rust
/// use simpleq::store::{InMemoryListStore, ListStore};
///
/// # async fn example() -> simpleq::Result<()> {
/// let store = InMemoryListStore::new();
/// store.push_left("jobs", b"first").await?;
/// store.push_left("jobs", b"second").await?;
///
/// assert_eq!(store.pop_right("jobs").await?, Some(b"first".to_vec()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryListStore {
    /// List storage (key -> elements)
    lists: Mutex<Lists>,
    /// Signalled whenever any list grows
    pushed: Notify,
    /// Number of upcoming operations that fail with a store error
    pending_failures: AtomicUsize,
}

impl InMemoryListStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` operations fail with a store error
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.fetch_add(count, Ordering::SeqCst);
    }

    /// Number of keys currently holding a non-empty list
    pub fn key_count(&self) -> usize {
        self.lists.lock().len()
    }

    fn check_fault(&self) -> Result<()> {
        let consumed = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();

        if consumed {
            Err(SimpleqError::store("injected in-memory store failure"))
        } else {
            Ok(())
        }
    }

    /// Run a mutation under the lock, waking blocked pops afterwards
    fn mutate<T>(&self, f: impl FnOnce(&mut Lists) -> T) -> T {
        let result = {
            let mut lists = self.lists.lock();
            f(&mut *lists)
        };
        self.pushed.notify_waiters();
        result
    }

    /// Retry `attempt` whenever a list grows until it yields an element or
    /// `timeout_secs` elapses (0 waits forever)
    async fn wait_for<F>(&self, timeout_secs: u64, mut attempt: F) -> Result<BlockingReply>
    where
        F: FnMut(&mut Lists) -> Option<Vec<u8>> + Send,
    {
        let deadline =
            (timeout_secs > 0).then(|| Instant::now() + Duration::from_secs(timeout_secs));

        loop {
            // Registered before the attempt so a concurrent push is not missed
            let notified = self.pushed.notified();

            let popped = {
                let mut lists = self.lists.lock();
                attempt(&mut *lists)
            };

            if let Some(element) = popped {
                // A pipe may have grown the destination list
                self.pushed.notify_waiters();
                return Ok(BlockingReply::Element(element));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(BlockingReply::TimedOut);
                    }
                }
                None => notified.await,
            }
        }
    }
}

fn push_left(lists: &mut Lists, key: &str, element: &[u8]) -> i64 {
    let list = lists.entry(key.to_string()).or_default();
    list.push_front(element.to_vec());
    list.len() as i64
}

fn pop_right(lists: &mut Lists, key: &str) -> Option<Vec<u8>> {
    let list = lists.get_mut(key)?;
    let element = list.pop_back();
    if list.is_empty() {
        lists.remove(key);
    }
    element
}

fn remove_last(lists: &mut Lists, key: &str, element: &[u8]) -> i64 {
    let Some(list) = lists.get_mut(key) else {
        return 0;
    };

    let removed = match list.iter().rposition(|candidate| candidate == element) {
        Some(index) => {
            list.remove(index);
            1
        }
        None => 0,
    };

    if list.is_empty() {
        lists.remove(key);
    }
    removed
}

fn pop_right_push_left(lists: &mut Lists, source: &str, destination: &str) -> Option<Vec<u8>> {
    let element = pop_right(lists, source)?;
    push_left(lists, destination, &element);
    Some(element)
}

#[async_trait]
impl ListStore for InMemoryListStore {
    async fn push_left(&self, key: &str, element: &[u8]) -> Result<i64> {
        self.check_fault()?;
        Ok(self.mutate(|lists| push_left(lists, key, element)))
    }

    async fn pop_right(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check_fault()?;
        Ok(pop_right(&mut self.lists.lock(), key))
    }

    async fn blocking_pop_right(&self, key: &str, timeout_secs: u64) -> Result<BlockingReply> {
        self.check_fault()?;
        self.wait_for(timeout_secs, |lists| pop_right(lists, key))
            .await
    }

    async fn remove_last(&self, key: &str, element: &[u8]) -> Result<i64> {
        self.check_fault()?;
        Ok(remove_last(&mut self.lists.lock(), key, element))
    }

    async fn remove_then_push(
        &self,
        source: &str,
        destination: &str,
        element: &[u8],
    ) -> Result<i64> {
        self.check_fault()?;
        Ok(self.mutate(|lists| {
            remove_last(lists, source, element);
            push_left(lists, destination, element)
        }))
    }

    async fn remove_and_push_if_present(
        &self,
        source: &str,
        destination: &str,
        element: &[u8],
    ) -> Result<i64> {
        self.check_fault()?;
        Ok(self.mutate(|lists| {
            if remove_last(lists, source, element) > 0 {
                push_left(lists, destination, element)
            } else {
                0
            }
        }))
    }

    async fn pop_right_push_left(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<Option<Vec<u8>>> {
        self.check_fault()?;
        Ok(self.mutate(|lists| pop_right_push_left(lists, source, destination)))
    }

    async fn blocking_pop_right_push_left(
        &self,
        source: &str,
        destination: &str,
        timeout_secs: u64,
    ) -> Result<BlockingReply> {
        self.check_fault()?;
        self.wait_for(timeout_secs, |lists| {
            pop_right_push_left(lists, source, destination)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<i64> {
        self.check_fault()?;
        Ok(i64::from(self.lists.lock().remove(key).is_some()))
    }

    async fn range(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.check_fault()?;
        Ok(self
            .lists
            .lock()
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn length(&self, key: &str) -> Result<i64> {
        self.check_fault()?;
        Ok(self
            .lists
            .lock()
            .get(key)
            .map(|list| list.len() as i64)
            .unwrap_or(0))
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}
