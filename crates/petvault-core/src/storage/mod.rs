mod kv_store;

pub use kv_store::{InMemoryKeyValueStore, KeyValueStore, StorageError};
