//! Per-user task persistence with an atomic quota counter
//!
//! Each user owns one partition. Task rows use the sort key `TASK#<id>`; a
//! single `META#COUNT` row holds the number of tasks the user owns. Creating
//! and deleting a task always moves the counter in the same backend
//! transaction as the row itself, so two concurrent creates can never push a
//! user past the quota.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::backend::{
    Condition, ItemKey, KeyValueBackend, KvError, TransactWriteItem, UpdateItem, PARTITION_KEY,
    SORT_KEY,
};
use super::codec::{decode_task, encode_task, task_sort_key, TASK_PREFIX};
use crate::error::constructors::{NO_TASK_WITH_ID, QUOTA_REACHED};
use crate::error::{TaskListError, TaskListResult};
use crate::types::{Task, TaskUpdate};

/// Sort key of the per-user counter row.
pub const COUNTER_SORT_KEY: &str = "META#COUNT";
/// Counter attribute on the counter row.
pub const COUNTER_ATTRIBUTE: &str = "CurrentCount";
/// Default maximum number of tasks per user.
pub const DEFAULT_MAX_TASKS: u64 = 2;

/// Result of a delete that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The row and one counter unit were removed
    Deleted,
    /// A concurrent delete removed the row first; nothing was changed
    AlreadyDeleted,
}

/// Task persistence on top of a [`KeyValueBackend`]
#[derive(Clone)]
pub struct TaskStore {
    backend: Arc<dyn KeyValueBackend>,
    max_tasks: u64,
}

impl TaskStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, max_tasks: u64) -> Self {
        Self { backend, max_tasks }
    }

    pub fn max_tasks(&self) -> u64 {
        self.max_tasks
    }

    fn task_key(user_id: &str, task_id: &str) -> ItemKey {
        ItemKey::new(user_id, task_sort_key(task_id))
    }

    fn counter_key(user_id: &str) -> ItemKey {
        ItemKey::new(user_id, COUNTER_SORT_KEY)
    }

    /// All tasks of a user ordered by ascending deadline
    ///
    /// Tasks sharing a deadline keep the backend's sort-key order.
    #[instrument(skip(self))]
    pub async fn list_by_user(&self, user_id: &str) -> TaskListResult<Vec<Task>> {
        let items = self
            .backend
            .query(user_id, TASK_PREFIX)
            .await
            .map_err(|e| TaskListError::storage("list tasks", e))?;

        let mut tasks = items
            .iter()
            .map(decode_task)
            .collect::<TaskListResult<Vec<_>>>()?;
        tasks.sort_by(|a, b| a.deadline.cmp(&b.deadline));

        debug!("Listed {} tasks", tasks.len());
        Ok(tasks)
    }

    /// A single task, `None` when the user has no task with that id
    #[instrument(skip(self))]
    pub async fn get_one(&self, user_id: &str, task_id: &str) -> TaskListResult<Option<Task>> {
        let item = self
            .backend
            .get_item(&Self::task_key(user_id, task_id))
            .await
            .map_err(|e| TaskListError::storage("get task", e))?;

        item.as_ref().map(decode_task).transpose()
    }

    /// Whether the backend table is reachable
    pub async fn ping(&self) -> TaskListResult<()> {
        self.backend
            .ping()
            .await
            .map_err(|e| TaskListError::storage("ping table", e))
    }

    /// Number of tasks the counter row says the user owns
    pub async fn count(&self, user_id: &str) -> TaskListResult<u64> {
        let counter = self
            .backend
            .get_item(&Self::counter_key(user_id))
            .await
            .map_err(|e| TaskListError::storage("get task counter", e))?;

        Ok(counter
            .and_then(|item| item.get_number(COUNTER_ATTRIBUTE))
            .map(|count| count.max(0) as u64)
            .unwrap_or(0))
    }

    /// Store a new task, incrementing the user's counter in the same
    /// transaction
    ///
    /// Fails with `QuotaExceeded` when the user already owns the maximum
    /// number of tasks.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn create(&self, user_id: &str, task: &Task) -> TaskListResult<()> {
        let item = encode_task(task)?.with(PARTITION_KEY, user_id);
        let max_tasks = i64::try_from(self.max_tasks).unwrap_or(i64::MAX);

        let increment = UpdateItem::new(Self::counter_key(user_id))
            .add(COUNTER_ATTRIBUTE, 1)
            .condition(
                Condition::not_exists(COUNTER_ATTRIBUTE)
                    .or(Condition::less_than(COUNTER_ATTRIBUTE, max_tasks)),
            );
        let insert = TransactWriteItem::Put {
            item,
            condition: Some(Condition::not_exists(SORT_KEY)),
        };

        match self
            .backend
            .transact_write(vec![TransactWriteItem::Update(increment), insert])
            .await
        {
            Ok(()) => {
                info!("Created new task {} for {}", task.id, user_id);
                Ok(())
            }
            Err(e) if e.cancelled_at(0) => {
                info!("User {} reached the limit of {} tasks", user_id, self.max_tasks);
                Err(TaskListError::QuotaExceeded {
                    message: QUOTA_REACHED.to_string(),
                    limit: self.max_tasks,
                    source: Some(Box::new(e)),
                })
            }
            Err(e @ KvError::TransactionCanceled { .. }) => Err(TaskListError::storage(
                format!("create task {}: id already in use", task.id),
                e,
            )),
            Err(e) => Err(TaskListError::storage("create task", e)),
        }
    }

    /// Apply a partial update to an existing task and return the result
    ///
    /// Fails with `NotFound` when the user has no task with that id.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        user_id: &str,
        task_id: &str,
        update: &TaskUpdate,
    ) -> TaskListResult<Task> {
        if update.is_empty() {
            return Err(TaskListError::invalid_request(
                "Task update must change at least one field",
            ));
        }

        let mut request = UpdateItem::new(Self::task_key(user_id, task_id))
            .condition(Condition::exists(SORT_KEY));
        for (field, value) in update.assignments() {
            if field.is_required() && value.is_empty() {
                return Err(TaskListError::validation(
                    field.name(),
                    format!("Task {} cannot be empty", field.name()),
                ));
            }
            request = request.set(field.column(), value);
        }

        match self.backend.update_item(request).await {
            Ok(item) => {
                debug!("Updated task {} for {}", task_id, user_id);
                decode_task(&item)
            }
            Err(KvError::ConditionalCheckFailed) => Err(TaskListError::not_found(NO_TASK_WITH_ID)),
            Err(e) => Err(TaskListError::storage("update task", e)),
        }
    }

    /// Remove a task and decrement the user's counter
    ///
    /// A task that does not exist when the delete starts is `NotFound`. A task
    /// removed by a concurrent delete between the lookup and the transaction
    /// yields [`DeleteOutcome::AlreadyDeleted`].
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: &str, task_id: &str) -> TaskListResult<DeleteOutcome> {
        let existing = self
            .backend
            .get_item(&Self::task_key(user_id, task_id))
            .await
            .map_err(|e| TaskListError::storage("get task", e))?;

        if existing.is_none() {
            return Err(TaskListError::not_found(NO_TASK_WITH_ID));
        }

        self.remove_with_counter(user_id, task_id).await
    }

    /// The counter decrement and row delete as one transaction
    async fn remove_with_counter(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> TaskListResult<DeleteOutcome> {
        let decrement = UpdateItem::new(Self::counter_key(user_id)).add(COUNTER_ATTRIBUTE, -1);
        let remove = TransactWriteItem::Delete {
            key: Self::task_key(user_id, task_id),
            condition: Some(Condition::exists(SORT_KEY)),
        };

        match self
            .backend
            .transact_write(vec![TransactWriteItem::Update(decrement), remove])
            .await
        {
            Ok(()) => {
                info!("Deleted task {} for {}", task_id, user_id);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e @ KvError::TransactionCanceled { .. }) => {
                debug!("Delete of task {} cancelled, treating as already deleted: {}", task_id, e);
                Ok(DeleteOutcome::AlreadyDeleted)
            }
            Err(e) => Err(TaskListError::storage("delete task", e)),
        }
    }
}
