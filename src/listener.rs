//! Background blocking-pop listener
//!
//! A [`Listener`] owns a tokio task that repeatedly performs a blocking pop on
//! its source queue (or a blocking pop-and-push into a destination queue) and
//! delivers what it gets over bounded channels. Store errors are reported on a
//! separate channel and never stop the loop; only a close request does.
//!
//! ```text
//! Idle -> Running -> Closing -> Ended
//! ```
//!
//! Close requests are observed between blocking calls, so closing takes at most
//! one poll timeout. When the loop exits it frees the owning queue's listener
//! slot and then publishes the ended signal every closer is waiting on.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, SimpleqError};
use crate::queue::Queue;

/// Pause after a failed poll so an unreachable store is not hammered
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Lifecycle of a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Created, task not yet running
    Idle,
    /// Polling the source queue
    Running,
    /// Close requested, waiting for the current poll to finish
    Closing,
    /// Loop exited; terminal
    Ended,
}

/// Statistics about the listener
#[derive(Debug, Clone, Default)]
pub struct ListenerStats {
    pub polls: u64,
    pub elements_delivered: u64,
    pub errors_reported: u64,
    /// Errors discarded because the error channel was full or closed
    pub errors_dropped: u64,
    /// Elements popped after close was requested and never delivered
    pub elements_dropped: u64,
    pub last_element_at: Option<SystemTime>,
    pub last_error_at: Option<SystemTime>,
}

#[derive(Debug)]
struct ListenerShared {
    state: Mutex<ListenerState>,
    stats: RwLock<ListenerStats>,
}

impl ListenerShared {
    fn new() -> Self {
        Self {
            state: Mutex::new(ListenerState::Idle),
            stats: RwLock::new(ListenerStats::default()),
        }
    }

    fn set_state(&self, state: ListenerState) {
        *self.state.lock() = state;
    }
}

/// Close/ended signalling shared by a `Listener` and its owning queue's slot
#[derive(Debug, Clone)]
pub(crate) struct ListenerHandle {
    id: Uuid,
    shutdown: Arc<watch::Sender<bool>>,
    ended: watch::Receiver<bool>,
    shared: Arc<ListenerShared>,
}

impl ListenerHandle {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the loop to stop at its next poll boundary
    fn request_close(&self) {
        let previous = self.shutdown.send_replace(true);
        if !previous {
            let mut state = self.shared.state.lock();
            if matches!(*state, ListenerState::Idle | ListenerState::Running) {
                *state = ListenerState::Closing;
            }
        }
    }

    /// Request close and wait until the loop has exited
    pub(crate) async fn close(&self) {
        self.request_close();

        let mut ended = self.ended.clone();
        // A dropped sender means the task is gone, which also counts as ended
        let _ = ended.wait_for(|ended| *ended).await;
    }
}

/// Handle to a running listener
///
/// Elements are read with [`Listener::next_element`], store errors with
/// [`Listener::next_error`]. Dropping the handle requests close without
/// waiting; call [`Listener::close`] to wait for the loop to finish.
#[derive(Debug)]
pub struct Listener {
    handle: ListenerHandle,
    source: String,
    destination: Option<String>,
    elements: mpsc::Receiver<Vec<u8>>,
    errors: mpsc::Receiver<SimpleqError>,
}

impl Listener {
    /// Start a listener task on `runtime` popping from `source`, piping into
    /// `destination` when given
    pub(crate) fn spawn(runtime: &Handle, source: Queue, destination: Option<Queue>) -> Self {
        let config = source.config();
        let (element_tx, element_rx) = mpsc::channel(config.buffer_size);
        let (error_tx, error_rx) = mpsc::channel(config.buffer_size);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ended_tx, ended_rx) = watch::channel(false);

        let id = Uuid::new_v4();
        let shared = Arc::new(ListenerShared::new());

        let handle = ListenerHandle {
            id,
            shutdown: Arc::new(shutdown_tx),
            ended: ended_rx,
            shared: Arc::clone(&shared),
        };

        let listener = Self {
            handle,
            source: source.key().to_string(),
            destination: destination.as_ref().map(|queue| queue.key().to_string()),
            elements: element_rx,
            errors: error_rx,
        };

        let task = ListenerTask {
            id,
            poll_timeout_secs: config.poll_timeout_secs,
            source,
            destination,
            elements: element_tx,
            errors: error_tx,
            shutdown: shutdown_rx,
            ended: ended_tx,
            shared,
        };
        runtime.spawn(task.run());

        listener
    }

    pub(crate) fn handle(&self) -> &ListenerHandle {
        &self.handle
    }

    /// Unique identifier of this listener
    pub fn id(&self) -> Uuid {
        self.handle.id
    }

    /// Key of the queue being popped
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Key of the queue popped elements are pushed onto, in pipe mode
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ListenerState {
        *self.handle.shared.state.lock()
    }

    /// Get listener statistics
    pub fn stats(&self) -> ListenerStats {
        self.handle.shared.stats.read().clone()
    }

    /// Wait for the next popped element.
    ///
    /// Returns `None` once the listener has ended and every buffered element
    /// has been read.
    pub async fn next_element(&mut self) -> Option<Vec<u8>> {
        self.elements.recv().await
    }

    /// Wait for the next store error.
    ///
    /// Returns `None` once the listener has ended and every buffered error has
    /// been read.
    pub async fn next_error(&mut self) -> Option<SimpleqError> {
        self.errors.recv().await
    }

    /// Take a buffered store error without waiting
    pub fn try_next_error(&mut self) -> Option<SimpleqError> {
        self.errors.try_recv().ok()
    }

    /// Close the listener and wait for its loop to end.
    ///
    /// Idempotent, and safe to race with `Queue::close`.
    pub async fn close(&self) -> Result<()> {
        self.handle.close().await;
        Ok(())
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.handle.request_close();
    }
}

/// State owned by the spawned loop
struct ListenerTask {
    id: Uuid,
    poll_timeout_secs: u64,
    source: Queue,
    destination: Option<Queue>,
    elements: mpsc::Sender<Vec<u8>>,
    errors: mpsc::Sender<SimpleqError>,
    shutdown: watch::Receiver<bool>,
    ended: watch::Sender<bool>,
    shared: Arc<ListenerShared>,
}

impl ListenerTask {
    #[instrument(
        name = "listener",
        skip(self),
        fields(
            listener_id = %self.id,
            queue = %self.source.key(),
            destination = ?self.destination.as_ref().map(|queue| queue.key().to_string()),
        )
    )]
    async fn run(mut self) {
        {
            let mut state = self.shared.state.lock();
            if *state == ListenerState::Idle {
                *state = ListenerState::Running;
            }
        }
        info!(
            poll_timeout_secs = self.poll_timeout_secs,
            "Listener started"
        );

        while !self.shutdown_requested() {
            self.shared.stats.write().polls += 1;

            match self.poll().await {
                Ok(Some(element)) => {
                    if !self.deliver(element).await {
                        break;
                    }
                }
                Ok(None) => {}
                // Empty poll, not a failure
                Err(error) if error.is_timeout() => {}
                Err(error) => {
                    warn!(error = %error, "Listener poll failed");
                    self.report(error);
                    self.pause_after_error().await;
                }
            }
        }

        self.finish();
    }

    async fn poll(&self) -> Result<Option<Vec<u8>>> {
        match &self.destination {
            Some(destination) => {
                self.source
                    .blocking_pop_pipe(destination, self.poll_timeout_secs)
                    .await
            }
            None => self.source.blocking_pop(self.poll_timeout_secs).await,
        }
    }

    fn shutdown_requested(&self) -> bool {
        // A dropped sender means every handle is gone
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    /// Returns false when the loop should stop
    async fn deliver(&mut self, element: Vec<u8>) -> bool {
        let size = element.len();

        tokio::select! {
            biased;

            sent = self.elements.send(element) => match sent {
                Ok(()) => {
                    let mut stats = self.shared.stats.write();
                    stats.elements_delivered += 1;
                    stats.last_element_at = Some(SystemTime::now());
                    true
                }
                Err(_) => {
                    warn!("Element receiver dropped, stopping listener");
                    false
                }
            },
            _ = self.shutdown.wait_for(|closed| *closed) => {
                self.shared.stats.write().elements_dropped += 1;
                warn!(size, "Listener closed before a popped element could be delivered");
                false
            }
        }
    }

    fn report(&self, error: SimpleqError) {
        let mut stats = self.shared.stats.write();
        stats.last_error_at = Some(SystemTime::now());

        match self.errors.try_send(error) {
            Ok(()) => stats.errors_reported += 1,
            Err(e) => {
                stats.errors_dropped += 1;
                debug!(error = %e, "Listener error channel unavailable, error dropped");
            }
        }
    }

    async fn pause_after_error(&mut self) {
        tokio::select! {
            _ = tokio::time::sleep(ERROR_BACKOFF) => {}
            _ = self.shutdown.wait_for(|closed| *closed) => {}
        }
    }

    fn finish(self) {
        self.shared.set_state(ListenerState::Ended);

        self.source.release_listener(self.id);

        self.ended.send_replace(true);
        info!("Listener ended");
    }
}
