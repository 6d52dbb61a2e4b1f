//! Key-value backend abstraction
//!
//! The task store talks to its backend through [`KeyValueBackend`]: point
//! reads, partition/prefix queries, single-row conditional updates and
//! all-or-nothing conditional transactions. Rows are attribute maps addressed
//! by a composite `(partition, sort)` key.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

/// Attribute holding the partition key of every row.
pub const PARTITION_KEY: &str = "PK";
/// Attribute holding the sort key of every row.
pub const SORT_KEY: &str = "SK";

/// Typed attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(i64),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(value) => Some(value),
            AttributeValue::N(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttributeValue::N(value) => Some(*value),
            AttributeValue::S(_) => None,
        }
    }

    /// Values of different types are not comparable.
    fn compare(&self, other: &AttributeValue) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.cmp(b)),
            (AttributeValue::N(a), AttributeValue::N(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::N(value)
    }
}

/// Composite row key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub partition: String,
    pub sort: String,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

/// A stored row: attribute name to value, key attributes included
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item(BTreeMap<String, AttributeValue>);

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty row carrying only the key attributes
    pub fn from_key(key: &ItemKey) -> Self {
        let mut item = Self::new();
        item.insert(PARTITION_KEY, key.partition.as_str());
        item.insert(SORT_KEY, key.sort.as_str());
        item
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.0.get(attribute)
    }

    pub fn get_str(&self, attribute: &str) -> Option<&str> {
        self.get(attribute).and_then(AttributeValue::as_str)
    }

    pub fn get_number(&self, attribute: &str) -> Option<i64> {
        self.get(attribute).and_then(AttributeValue::as_number)
    }

    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(attribute.into(), value.into());
    }

    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(attribute, value);
        self
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.0.contains_key(attribute)
    }

    /// Key of this row, if both key attributes are present strings
    pub fn key(&self) -> Option<ItemKey> {
        Some(ItemKey::new(
            self.get_str(PARTITION_KEY)?,
            self.get_str(SORT_KEY)?,
        ))
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Precondition evaluated against the current state of a row
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    AttributeExists(String),
    AttributeNotExists(String),
    LessThan(String, AttributeValue),
    GreaterThan(String, AttributeValue),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub fn exists(attribute: impl Into<String>) -> Self {
        Condition::AttributeExists(attribute.into())
    }

    pub fn not_exists(attribute: impl Into<String>) -> Self {
        Condition::AttributeNotExists(attribute.into())
    }

    pub fn less_than(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Condition::LessThan(attribute.into(), value.into())
    }

    pub fn greater_than(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Condition::GreaterThan(attribute.into(), value.into())
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    /// Evaluate against a row; `None` means the row does not exist.
    pub fn evaluate(&self, item: Option<&Item>) -> bool {
        let attribute = |name: &str| item.and_then(|item| item.get(name));
        match self {
            Condition::AttributeExists(name) => attribute(name).is_some(),
            Condition::AttributeNotExists(name) => attribute(name).is_none(),
            Condition::LessThan(name, value) => {
                attribute(name).and_then(|current| current.compare(value)) == Some(Ordering::Less)
            }
            Condition::GreaterThan(name, value) => {
                attribute(name).and_then(|current| current.compare(value))
                    == Some(Ordering::Greater)
            }
            Condition::Or(left, right) => left.evaluate(item) || right.evaluate(item),
        }
    }
}

/// Single attribute modification
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// `SET attribute = value`
    Set(String, AttributeValue),
    /// `ADD attribute delta`; a missing attribute counts as zero
    Add(String, i64),
}

/// Conditional update of one row
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateItem {
    pub key: ItemKey,
    pub actions: Vec<UpdateAction>,
    pub condition: Option<Condition>,
}

impl UpdateItem {
    pub fn new(key: ItemKey) -> Self {
        Self {
            key,
            actions: Vec::new(),
            condition: None,
        }
    }

    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.actions.push(UpdateAction::Set(attribute.into(), value.into()));
        self
    }

    pub fn add(mut self, attribute: impl Into<String>, delta: i64) -> Self {
        self.actions.push(UpdateAction::Add(attribute.into(), delta));
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Apply the actions to the current row, creating it when absent
    pub fn apply(&self, current: Option<Item>) -> KvResult<Item> {
        let mut item = current.unwrap_or_else(|| Item::from_key(&self.key));

        for action in &self.actions {
            match action {
                UpdateAction::Set(attribute, value) => {
                    if attribute == PARTITION_KEY || attribute == SORT_KEY {
                        return Err(KvError::invalid(format!(
                            "cannot update key attribute {}",
                            attribute
                        )));
                    }
                    item.insert(attribute.as_str(), value.clone());
                }
                UpdateAction::Add(attribute, delta) => {
                    let current = match item.get(attribute) {
                        None => 0,
                        Some(AttributeValue::N(value)) => *value,
                        Some(AttributeValue::S(_)) => {
                            return Err(KvError::invalid(format!(
                                "ADD on non-numeric attribute {}",
                                attribute
                            )))
                        }
                    };
                    item.insert(attribute.as_str(), current + delta);
                }
            }
        }

        Ok(item)
    }
}

/// One member of a transactional write
#[derive(Debug, Clone, PartialEq)]
pub enum TransactWriteItem {
    Put {
        item: Item,
        condition: Option<Condition>,
    },
    Update(UpdateItem),
    Delete {
        key: ItemKey,
        condition: Option<Condition>,
    },
}

impl TransactWriteItem {
    pub fn key(&self) -> KvResult<ItemKey> {
        match self {
            TransactWriteItem::Put { item, .. } => item
                .key()
                .ok_or_else(|| KvError::invalid("put item is missing its key attributes")),
            TransactWriteItem::Update(update) => Ok(update.key.clone()),
            TransactWriteItem::Delete { key, .. } => Ok(key.clone()),
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            TransactWriteItem::Put { condition, .. } => condition.as_ref(),
            TransactWriteItem::Update(update) => update.condition.as_ref(),
            TransactWriteItem::Delete { condition, .. } => condition.as_ref(),
        }
    }
}

/// Why a transaction member caused the transaction to be cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    None,
    ConditionalCheckFailed,
}

/// Failure of a backend call
#[derive(Error, Debug)]
pub enum KvError {
    #[error("The conditional request failed")]
    ConditionalCheckFailed,

    #[error("Transaction cancelled, reasons: {reasons:?}")]
    TransactionCanceled { reasons: Vec<CancellationReason> },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Backend operation '{operation}' failed")]
    Backend {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl KvError {
    pub fn invalid(message: impl Into<String>) -> Self {
        KvError::InvalidOperation {
            message: message.into(),
        }
    }

    pub fn backend<E: std::error::Error + Send + Sync + 'static>(
        operation: impl Into<String>,
        source: E,
    ) -> Self {
        KvError::Backend {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Whether the cancellation reason of transaction member `index` was a
    /// failed condition.
    pub fn cancelled_at(&self, index: usize) -> bool {
        matches!(
            self,
            KvError::TransactionCanceled { reasons }
                if reasons.get(index) == Some(&CancellationReason::ConditionalCheckFailed)
        )
    }
}

pub type KvResult<T> = std::result::Result<T, KvError>;

/// Helper trait for attaching the failing operation to backend errors
pub trait BackendContext<T> {
    fn backend_context(self, operation: &str) -> KvResult<T>;
}

impl<T, E> BackendContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn backend_context(self, operation: &str) -> KvResult<T> {
        self.map_err(|e| KvError::backend(operation, e))
    }
}

/// Key-value store operations used by the task store
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Point lookup
    async fn get_item(&self, key: &ItemKey) -> KvResult<Option<Item>>;

    /// All rows of `partition` whose sort key starts with `sort_prefix`, in
    /// ascending sort-key order
    async fn query(&self, partition: &str, sort_prefix: &str) -> KvResult<Vec<Item>>;

    /// Conditional single-row update returning the row after the update
    async fn update_item(&self, update: UpdateItem) -> KvResult<Item>;

    /// Apply every member or none of them
    async fn transact_write(&self, items: Vec<TransactWriteItem>) -> KvResult<()>;

    /// Check the table is reachable without reading any row
    async fn ping(&self) -> KvResult<()>;
}

/// Evaluate every member's condition against `current`, which yields the row
/// state for a key. Returns the per-member reasons when any condition fails.
pub(crate) fn check_transaction<F>(
    items: &[TransactWriteItem],
    mut current: F,
) -> KvResult<Option<Vec<CancellationReason>>>
where
    F: FnMut(&ItemKey) -> KvResult<Option<Item>>,
{
    let mut seen = std::collections::HashSet::new();
    let mut reasons = Vec::with_capacity(items.len());

    for item in items {
        let key = item.key()?;
        if !seen.insert(key.clone()) {
            return Err(KvError::invalid(
                "transaction cannot include multiple operations on one item",
            ));
        }
        let passed = match item.condition() {
            Some(condition) => condition.evaluate(current(&key)?.as_ref()),
            None => true,
        };
        reasons.push(if passed {
            CancellationReason::None
        } else {
            CancellationReason::ConditionalCheckFailed
        });
    }

    if reasons.contains(&CancellationReason::ConditionalCheckFailed) {
        Ok(Some(reasons))
    } else {
        Ok(None)
    }
}
