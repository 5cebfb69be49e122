//! List store providers

mod in_memory;
mod redis;

pub use self::in_memory::InMemoryListStore;
pub use self::redis::RedisListStore;
