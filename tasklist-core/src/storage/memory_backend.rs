//! In-memory key-value backend
//!
//! Same semantics as the redb backend without touching disk. Used by tests
//! and by `storage.backend = "memory"` for local development.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::backend::{
    check_transaction, Item, ItemKey, KeyValueBackend, KvError, KvResult, TransactWriteItem,
    UpdateItem,
};

#[derive(Default)]
pub struct MemoryBackend {
    rows: Mutex<BTreeMap<ItemKey, Item>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows across all partitions
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Insert a row as-is, bypassing conditions (test seeding)
    pub fn insert_raw(&self, item: Item) -> KvResult<()> {
        let key = item
            .key()
            .ok_or_else(|| KvError::invalid("item is missing its key attributes"))?;
        self.rows.lock().insert(key, item);
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get_item(&self, key: &ItemKey) -> KvResult<Option<Item>> {
        Ok(self.rows.lock().get(key).cloned())
    }

    async fn query(&self, partition: &str, sort_prefix: &str) -> KvResult<Vec<Item>> {
        let rows = self.rows.lock();
        let start = ItemKey::new(partition, sort_prefix);

        Ok(rows
            .range(start..)
            .take_while(|(key, _)| key.partition == partition && key.sort.starts_with(sort_prefix))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn update_item(&self, update: UpdateItem) -> KvResult<Item> {
        let mut rows = self.rows.lock();
        let current = rows.get(&update.key).cloned();

        if let Some(condition) = &update.condition {
            if !condition.evaluate(current.as_ref()) {
                return Err(KvError::ConditionalCheckFailed);
            }
        }

        let updated = update.apply(current)?;
        rows.insert(update.key.clone(), updated.clone());
        Ok(updated)
    }

    async fn transact_write(&self, items: Vec<TransactWriteItem>) -> KvResult<()> {
        let mut rows = self.rows.lock();

        if let Some(reasons) = check_transaction(&items, |key| Ok(rows.get(key).cloned()))? {
            return Err(KvError::TransactionCanceled { reasons });
        }

        // Build every new row before touching the map so a failing member
        // leaves the map untouched.
        let mut staged = Vec::with_capacity(items.len());
        for item in items {
            let key = item.key()?;
            let next = match item {
                TransactWriteItem::Put { item, .. } => Some(item),
                TransactWriteItem::Update(update) => Some(update.apply(rows.get(&key).cloned())?),
                TransactWriteItem::Delete { .. } => None,
            };
            staged.push((key, next));
        }

        for (key, next) in staged {
            match next {
                Some(item) => rows.insert(key, item),
                None => rows.remove(&key),
            };
        }
        Ok(())
    }

    async fn ping(&self) -> KvResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::{Condition, SORT_KEY};

    #[tokio::test]
    async fn test_failed_member_leaves_rows_untouched() {
        let backend = MemoryBackend::new();
        let counter = ItemKey::new("alice", "META#COUNT");

        let result = backend
            .transact_write(vec![
                TransactWriteItem::Update(UpdateItem::new(counter.clone()).add("CurrentCount", 1)),
                TransactWriteItem::Delete {
                    key: ItemKey::new("alice", "TASK#1"),
                    condition: Some(Condition::exists(SORT_KEY)),
                },
            ])
            .await;

        assert!(result.unwrap_err().cancelled_at(1));
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_query_prefix() {
        let backend = MemoryBackend::new();
        for sort in ["META#COUNT", "TASK#2", "TASK#1"] {
            backend
                .insert_raw(Item::from_key(&ItemKey::new("alice", sort)))
                .unwrap();
        }
        backend
            .insert_raw(Item::from_key(&ItemKey::new("bob", "TASK#3")))
            .unwrap();

        let rows = backend.query("alice", "TASK").await.unwrap();
        let sorts: Vec<_> = rows.iter().filter_map(|item| item.get_str(SORT_KEY)).collect();
        assert_eq!(sorts, vec!["TASK#1", "TASK#2"]);
    }
}
