//! # Queue
//!
//! A named handle on one list in the store. Elements are pushed on the left
//! and popped from the right, so each queue is FIFO. Transfers between two
//! queues are applied by the store atomically; both queues must live in the
//! same store.
//!
//! Cloning a `Queue` yields another handle on the same logical queue,
//! including its listener slot.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::{Result, SimpleqError};
use crate::listener::{Listener, ListenerHandle};
use crate::store::{BlockingReply, ListStore};

/// Queue backed by a list in a [`ListStore`]
///
/// # Example
///
/// ```rust
/// use simpleq::store::InMemoryListStore;
/// use simpleq::Queue;
/// use std::sync::Arc;
///
/// # async fn example() -> simpleq::Result<()> {
/// let store = Arc::new(InMemoryListStore::new());
/// let pending = Queue::new(store.clone(), "jobs:pending")?;
/// let working = Queue::new(store, "jobs:working")?;
///
/// pending.push(b"job-1").await?;
/// let job = pending.pop_pipe(&working).await?;
/// assert_eq!(job, Some(b"job-1".to_vec()));
/// assert_eq!(working.len().await?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Queue {
    key: String,
    store: Arc<dyn ListStore>,
    config: QueueConfig,
    listener: Arc<Mutex<Option<ListenerHandle>>>,
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("key", &self.key)
            .field("store", &self.store.provider_name())
            .field("config", &self.config)
            .field("has_listener", &self.has_listener())
            .finish()
    }
}

impl Queue {
    /// Create a queue on `key` with default listener settings
    pub fn new<S: Into<String>>(store: Arc<dyn ListStore>, key: S) -> Result<Self> {
        Self::with_config(store, key, QueueConfig::default())
    }

    /// Create a queue on `key` with explicit listener settings
    pub fn with_config<S: Into<String>>(
        store: Arc<dyn ListStore>,
        key: S,
        config: QueueConfig,
    ) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(SimpleqError::InvalidKey { key });
        }
        config.validate()?;

        Ok(Self {
            key,
            store,
            config,
            listener: Arc::new(Mutex::new(None)),
        })
    }

    /// The list key this queue is bound to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Listener settings of this queue
    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Whether a listener is currently attached
    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Push an element onto the queue, returning the new length
    #[instrument(skip(self, element), fields(queue = %self.key))]
    pub async fn push(&self, element: &[u8]) -> Result<i64> {
        let length = self.store.push_left(&self.key, element).await?;
        debug!(length, "Pushed element");
        Ok(length)
    }

    /// Pop the oldest element, or `None` if the queue is empty
    #[instrument(skip(self), fields(queue = %self.key))]
    pub async fn pop(&self) -> Result<Option<Vec<u8>>> {
        let element = self.store.pop_right(&self.key).await?;
        if element.is_none() {
            debug!("Queue empty");
        }
        Ok(element)
    }

    /// Block until an element can be popped. `timeout_secs = 0` blocks
    /// indefinitely.
    ///
    /// A timeout is reported as [`SimpleqError::Timeout`], not as `Ok(None)`;
    /// use [`SimpleqError::is_timeout`] to tell it apart from a real failure.
    /// `Ok(None)` only results from a reply the store should never send.
    #[instrument(skip(self), fields(queue = %self.key))]
    pub async fn blocking_pop(&self, timeout_secs: u64) -> Result<Option<Vec<u8>>> {
        match self
            .store
            .blocking_pop_right(&self.key, timeout_secs)
            .await?
        {
            BlockingReply::Element(element) => Ok(Some(element)),
            BlockingReply::TimedOut => Err(SimpleqError::timeout(&self.key, timeout_secs)),
            BlockingReply::Unrecognized => {
                debug!("Unrecognized blocking pop reply treated as empty");
                Ok(None)
            }
        }
    }

    /// Remove the occurrence of `element` nearest the pop end (the oldest
    /// push), returning how many were removed
    #[instrument(skip(self, element), fields(queue = %self.key))]
    pub async fn pull(&self, element: &[u8]) -> Result<i64> {
        self.store.remove_last(&self.key, element).await
    }

    /// Pull `element` out of this queue and push it onto `destination` in one
    /// transaction, returning the destination length.
    ///
    /// The push happens whether or not the pull removed anything; only the
    /// pair is atomic. Use [`Queue::safe_pull_pipe`] when the push must depend
    /// on the element having been present.
    #[instrument(skip(self, destination, element), fields(queue = %self.key, destination = %destination.key))]
    pub async fn pull_pipe(&self, destination: &Queue, element: &[u8]) -> Result<i64> {
        self.store
            .remove_then_push(&self.key, &destination.key, element)
            .await
    }

    /// Pull `element` out of this queue and, only if it was present, push it
    /// onto `destination`, atomically.
    ///
    /// Returns 0 when `element` was not in this queue, otherwise the
    /// destination length.
    #[instrument(skip(self, destination, element), fields(queue = %self.key, destination = %destination.key))]
    pub async fn safe_pull_pipe(&self, destination: &Queue, element: &[u8]) -> Result<i64> {
        let result = self
            .store
            .remove_and_push_if_present(&self.key, &destination.key, element)
            .await?;
        if result == 0 {
            debug!("Element not present, nothing transferred");
        }
        Ok(result)
    }

    /// Pop the oldest element and push it onto `destination` atomically
    #[instrument(skip(self, destination), fields(queue = %self.key, destination = %destination.key))]
    pub async fn pop_pipe(&self, destination: &Queue) -> Result<Option<Vec<u8>>> {
        self.store
            .pop_right_push_left(&self.key, &destination.key)
            .await
    }

    /// Blocking [`Queue::pop_pipe`]. `timeout_secs = 0` blocks indefinitely.
    ///
    /// Unlike [`Queue::blocking_pop`], a timeout is not an error: it returns
    /// `Ok(None)`.
    #[instrument(skip(self, destination), fields(queue = %self.key, destination = %destination.key))]
    pub async fn blocking_pop_pipe(
        &self,
        destination: &Queue,
        timeout_secs: u64,
    ) -> Result<Option<Vec<u8>>> {
        let reply = self
            .store
            .blocking_pop_right_push_left(&self.key, &destination.key, timeout_secs)
            .await?;
        Ok(reply.into_element())
    }

    /// Delete every element, returning the number of keys removed (0 or 1)
    #[instrument(skip(self), fields(queue = %self.key))]
    pub async fn clear(&self) -> Result<i64> {
        self.store.delete(&self.key).await
    }

    /// Snapshot of the queue from newest to oldest
    #[instrument(skip(self), fields(queue = %self.key))]
    pub async fn list(&self) -> Result<Vec<Vec<u8>>> {
        self.store.range(&self.key).await
    }

    /// Current number of elements
    #[instrument(skip(self), fields(queue = %self.key))]
    pub async fn len(&self) -> Result<i64> {
        self.store.length(&self.key).await
    }

    /// Whether the queue currently holds no elements
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Attach a listener that pops from this queue.
    ///
    /// Fails with [`SimpleqError::AlreadyListening`] if a listener is already
    /// attached, and with [`SimpleqError::NoRuntime`] when called outside a
    /// tokio runtime.
    pub fn pop_listen(&self) -> Result<Listener> {
        self.attach_listener(None)
    }

    /// Attach a listener that moves elements from this queue onto
    /// `destination` and reports each one moved.
    pub fn pop_pipe_listen(&self, destination: &Queue) -> Result<Listener> {
        self.attach_listener(Some(destination.clone()))
    }

    fn attach_listener(&self, destination: Option<Queue>) -> Result<Listener> {
        let mut slot = self.listener.lock();
        if slot.is_some() {
            return Err(SimpleqError::already_listening(&self.key));
        }

        let runtime =
            Handle::try_current().map_err(|_| SimpleqError::no_runtime(&self.key))?;
        let listener = Listener::spawn(&runtime, self.clone(), destination);
        *slot = Some(listener.handle().clone());

        info!(
            queue = %self.key,
            listener_id = %listener.id(),
            destination = ?listener.destination(),
            "Listener attached"
        );
        Ok(listener)
    }

    /// Clear the slot if it still holds listener `id`
    pub(crate) fn release_listener(&self, id: Uuid) {
        let mut slot = self.listener.lock();
        if slot.as_ref().map(ListenerHandle::id) == Some(id) {
            *slot = None;
            debug!(queue = %self.key, listener_id = %id, "Listener slot released");
        }
    }

    /// Close the attached listener, if any, and wait for it to end
    #[instrument(skip(self), fields(queue = %self.key))]
    pub async fn close(&self) -> Result<()> {
        let handle = self.listener.lock().clone();

        if let Some(handle) = handle {
            handle.close().await;
            info!(listener_id = %handle.id(), "Queue closed its listener");
        }
        Ok(())
    }
}
