//! Embedded key-value backend on redb
//!
//! Rows live in one redb table named after the configured table identifier,
//! keyed by `(partition, sort)` and stored as bincode-encoded [`Item`]s. redb
//! serializes write transactions, so conditions are checked and writes
//! applied inside a single write transaction; a failed condition aborts it
//! before anything is committed.

use async_trait::async_trait;
use redb::{Database, ReadableTable, Table, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::backend::{
    check_transaction, BackendContext, Item, ItemKey, KeyValueBackend, KvError, KvResult,
    TransactWriteItem, UpdateItem,
};
use crate::error::TaskListResult;

type RowKey = (&'static str, &'static str);

fn definition(table_name: &str) -> TableDefinition<'_, RowKey, &'static [u8]> {
    TableDefinition::new(table_name)
}

/// Production backend using redb
#[derive(Clone)]
pub struct RedbBackend {
    database: Arc<Database>,
    table_name: Arc<str>,
}

impl RedbBackend {
    /// Open (or create) the database file and make sure the table exists
    pub fn open(path: impl AsRef<Path>, table_name: &str) -> TaskListResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database = Database::create(path)?;
        Self::with_database(Arc::new(database), table_name)
    }

    /// Use an already opened database
    pub fn with_database(database: Arc<Database>, table_name: &str) -> TaskListResult<Self> {
        let write_txn = database.begin_write()?;
        {
            write_txn.open_table(definition(table_name))?;
        }
        write_txn.commit()?;

        debug!("Opened task table {}", table_name);

        Ok(Self {
            database,
            table_name: Arc::from(table_name),
        })
    }

    /// Run a blocking closure against the database off the async executor
    async fn blocking<F, R>(&self, operation: &'static str, f: F) -> KvResult<R>
    where
        F: FnOnce(&Database, &str) -> KvResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let database = self.database.clone();
        let table_name = self.table_name.clone();

        tokio::task::spawn_blocking(move || f(&database, &table_name))
            .await
            .backend_context(operation)?
    }

    /// Run `f` inside a write transaction, committing on success and
    /// aborting on any error
    fn write_transaction<R>(
        database: &Database,
        table_name: &str,
        operation: &str,
        f: impl FnOnce(&mut Table<'_, RowKey, &'static [u8]>) -> KvResult<R>,
    ) -> KvResult<R> {
        let write_txn = database.begin_write().backend_context(operation)?;

        let outcome = match write_txn.open_table(definition(table_name)) {
            Ok(mut table) => f(&mut table),
            Err(e) => Err(KvError::backend(operation, e)),
        };

        match outcome {
            Ok(result) => {
                write_txn.commit().backend_context(operation)?;
                debug!("Committed write transaction for: {}", operation);
                Ok(result)
            }
            Err(e) => {
                write_txn.abort().backend_context(operation)?;
                debug!("Aborted write transaction for {}: {}", operation, e);
                Err(e)
            }
        }
    }
}

fn read_row<T>(table: &T, key: &ItemKey) -> KvResult<Option<Item>>
where
    T: ReadableTable<RowKey, &'static [u8]>,
{
    match table
        .get((key.partition.as_str(), key.sort.as_str()))
        .backend_context("get row")?
    {
        Some(data) => Ok(Some(
            bincode::deserialize(data.value()).backend_context("deserialize row")?,
        )),
        None => Ok(None),
    }
}

fn write_row(table: &mut Table<'_, RowKey, &'static [u8]>, item: &Item) -> KvResult<()> {
    let key = item
        .key()
        .ok_or_else(|| KvError::invalid("item is missing its key attributes"))?;
    let data = bincode::serialize(item).backend_context("serialize row")?;
    table
        .insert((key.partition.as_str(), key.sort.as_str()), data.as_slice())
        .backend_context("insert row")?;
    Ok(())
}

fn remove_row(table: &mut Table<'_, RowKey, &'static [u8]>, key: &ItemKey) -> KvResult<()> {
    table
        .remove((key.partition.as_str(), key.sort.as_str()))
        .backend_context("remove row")?;
    Ok(())
}

#[async_trait]
impl KeyValueBackend for RedbBackend {
    async fn get_item(&self, key: &ItemKey) -> KvResult<Option<Item>> {
        let key = key.clone();

        self.blocking("get item", move |database, table_name| {
            let read_txn = database.begin_read().backend_context("begin read")?;
            let table = read_txn
                .open_table(definition(table_name))
                .backend_context("open table")?;
            read_row(&table, &key)
        })
        .await
    }

    async fn query(&self, partition: &str, sort_prefix: &str) -> KvResult<Vec<Item>> {
        let partition = partition.to_string();
        let sort_prefix = sort_prefix.to_string();

        self.blocking("query", move |database, table_name| {
            let read_txn = database.begin_read().backend_context("begin read")?;
            let table = read_txn
                .open_table(definition(table_name))
                .backend_context("open table")?;

            let mut items = Vec::new();
            let range = table
                .range((partition.as_str(), sort_prefix.as_str())..)
                .backend_context("range query")?;

            for entry in range {
                let (key, value) = entry.backend_context("read query entry")?;
                let (row_partition, row_sort) = key.value();
                if row_partition != partition.as_str() || !row_sort.starts_with(sort_prefix.as_str())
                {
                    break;
                }
                items.push(bincode::deserialize(value.value()).backend_context("deserialize row")?);
            }

            debug!("Query {} / {}* returned {} rows", partition, sort_prefix, items.len());
            Ok(items)
        })
        .await
    }

    async fn update_item(&self, update: UpdateItem) -> KvResult<Item> {
        self.blocking("update item", move |database, table_name| {
            Self::write_transaction(database, table_name, "update item", |table| {
                let current = read_row(&*table, &update.key)?;
                if let Some(condition) = &update.condition {
                    if !condition.evaluate(current.as_ref()) {
                        return Err(KvError::ConditionalCheckFailed);
                    }
                }

                let updated = update.apply(current)?;
                write_row(table, &updated)?;
                Ok(updated)
            })
        })
        .await
    }

    async fn transact_write(&self, items: Vec<TransactWriteItem>) -> KvResult<()> {
        self.blocking("transact write", move |database, table_name| {
            Self::write_transaction(database, table_name, "transact write", |table| {
                if let Some(reasons) = check_transaction(&items, |key| read_row(&*table, key))? {
                    return Err(KvError::TransactionCanceled { reasons });
                }

                for item in items {
                    match item {
                        TransactWriteItem::Put { item, .. } => write_row(table, &item)?,
                        TransactWriteItem::Update(update) => {
                            let current = read_row(&*table, &update.key)?;
                            let updated = update.apply(current)?;
                            write_row(table, &updated)?;
                        }
                        TransactWriteItem::Delete { key, .. } => remove_row(table, &key)?,
                    }
                }
                Ok(())
            })
        })
        .await
    }

    async fn ping(&self) -> KvResult<()> {
        self.blocking("ping", |database, table_name| {
            let read_txn = database.begin_read().backend_context("begin read")?;
            read_txn
                .open_table(definition(table_name))
                .backend_context("open table")?;
            Ok(())
        })
        .await
    }
}
