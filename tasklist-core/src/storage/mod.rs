//! Storage layer
//!
//! [`backend`] defines the key-value contract the rest of the crate is
//! written against. [`RedbBackend`] persists rows in an embedded redb file,
//! [`MemoryBackend`] keeps them in process for tests and local runs.
//! [`TaskStore`] maps tasks and the per-user quota counter onto that contract.

pub mod backend;
pub mod codec;
pub mod memory_backend;
pub mod redb_backend;
pub mod task_store;

pub use backend::{
    AttributeValue, CancellationReason, Condition, Item, ItemKey, KeyValueBackend, KvError,
    KvResult, TransactWriteItem, UpdateAction, UpdateItem, PARTITION_KEY, SORT_KEY,
};
pub use codec::{decode_task, encode_task, task_sort_key, TASK_PREFIX};
pub use memory_backend::MemoryBackend;
pub use redb_backend::RedbBackend;
pub use task_store::{DeleteOutcome, TaskStore, COUNTER_ATTRIBUTE, COUNTER_SORT_KEY, DEFAULT_MAX_TASKS};
