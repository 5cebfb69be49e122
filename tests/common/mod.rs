//! Shared helpers for simpleq integration tests

#![allow(dead_code)]

use simpleq::store::{InMemoryListStore, ListStore};
use simpleq::{Queue, QueueConfig};
use std::sync::Arc;
use uuid::Uuid;

/// Pair of queues on a fresh in-memory store
pub struct TestQueues {
    pub store: Arc<InMemoryListStore>,
    pub source: Queue,
    pub destination: Queue,
}

impl TestQueues {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryListStore::new());
        let source = queue_on(&store, "source");
        let destination = queue_on(&store, "destination");

        Self {
            store,
            source,
            destination,
        }
    }
}

/// Queue with a unique key on `store`, using a short listener poll
pub fn queue_on(store: &Arc<InMemoryListStore>, base_name: &str) -> Queue {
    let key = format!("{}:{}", base_name, &Uuid::new_v4().to_string()[..8]);
    let config = QueueConfig {
        poll_timeout_secs: 1,
        buffer_size: 16,
    };
    Queue::with_config(Arc::clone(store) as Arc<dyn ListStore>, key, config)
        .expect("valid queue")
}

/// Convenience for comparing lists of byte elements
pub fn elements(items: &[&str]) -> Vec<Vec<u8>> {
    items.iter().map(|item| item.as_bytes().to_vec()).collect()
}
