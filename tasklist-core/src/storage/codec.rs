//! Mapping between [`Task`] and its stored row
//!
//! | Task field    | Column        |
//! |---------------|---------------|
//! | `id`          | `SK` suffix   |
//! | `summary`     | `Summary`     |
//! | `description` | `Description` |
//! | `deadline`    | `Deadline`    |
//! | `color`       | `Color`       |
//!
//! Encoding is sparse: empty strings are not written. Decoding restores the
//! description and color defaults.

use crate::error::{TaskListError, TaskListResult};
use crate::storage::backend::{Item, SORT_KEY};
use crate::types::{Task, TaskField, DEFAULT_COLOR};

/// Sort key prefix shared by every task row.
pub const TASK_PREFIX: &str = "TASK";
/// Separator between a sort key prefix and the id.
pub const KEY_SEPARATOR: char = '#';

/// Sort key of the task with `task_id`
pub fn task_sort_key(task_id: &str) -> String {
    format!("{}{}{}", TASK_PREFIX, KEY_SEPARATOR, task_id)
}

/// Non-empty string value of a column
fn non_empty<'a>(item: &'a Item, column: &str) -> Option<&'a str> {
    item.get_str(column).filter(|value| !value.is_empty())
}

/// Decode a stored row into a task
pub fn decode_task(item: &Item) -> TaskListResult<Task> {
    let summary = non_empty(item, TaskField::Summary.column())
        .ok_or_else(|| TaskListError::malformed_record("Missing summary in task item"))?;
    let deadline = non_empty(item, TaskField::Deadline.column())
        .ok_or_else(|| TaskListError::malformed_record("Missing deadline in task item"))?;
    let sort_key = non_empty(item, SORT_KEY)
        .ok_or_else(|| TaskListError::malformed_record("Missing sort key in task item"))?;

    let id = sort_key
        .split_once(KEY_SEPARATOR)
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TaskListError::malformed_record("Missing task ID in task item"))?;

    Ok(Task {
        id: id.to_string(),
        summary: summary.to_string(),
        description: non_empty(item, TaskField::Description.column())
            .unwrap_or_default()
            .to_string(),
        deadline: deadline.to_string(),
        color: non_empty(item, TaskField::Color.column())
            .unwrap_or(DEFAULT_COLOR)
            .to_string(),
    })
}

/// Encode a task into a row carrying its sort key and non-empty fields.
/// The partition key is added by the store.
pub fn encode_task(task: &Task) -> TaskListResult<Item> {
    if uuid::Uuid::parse_str(&task.id).is_err() {
        return Err(TaskListError::validation(
            "id",
            "Task ID is not a valid UUID format",
        ));
    }
    if task.summary.is_empty() {
        return Err(TaskListError::validation("summary", "Task summary cannot be empty"));
    }
    if task.deadline.is_empty() {
        return Err(TaskListError::validation("deadline", "Task deadline cannot be empty"));
    }

    let mut item = Item::new().with(SORT_KEY, task_sort_key(&task.id));
    let fields = [
        (TaskField::Summary, &task.summary),
        (TaskField::Description, &task.description),
        (TaskField::Deadline, &task.deadline),
        (TaskField::Color, &task.color),
    ];
    for (field, value) in fields {
        if !value.is_empty() {
            item.insert(field.column(), value.as_str());
        }
    }

    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::PARTITION_KEY;
    use proptest::prelude::*;

    fn task(description: &str, color: &str) -> Task {
        Task {
            id: "0b7f4a9e-63b5-4d43-9f0c-2f7c1e1d2a10".to_string(),
            summary: "Buy milk".to_string(),
            description: description.to_string(),
            deadline: "2023-02-08".to_string(),
            color: color.to_string(),
        }
    }

    #[test]
    fn test_encode_is_sparse() {
        let item = encode_task(&task("", "")).unwrap();

        assert_eq!(
            item.get_str(SORT_KEY),
            Some("TASK#0b7f4a9e-63b5-4d43-9f0c-2f7c1e1d2a10")
        );
        assert_eq!(item.get_str("Summary"), Some("Buy milk"));
        assert_eq!(item.get_str("Deadline"), Some("2023-02-08"));
        assert!(!item.contains("Description"));
        assert!(!item.contains("Color"));
        assert!(!item.contains(PARTITION_KEY));
    }

    #[test]
    fn test_round_trip_restores_defaults() {
        let decoded = decode_task(&encode_task(&task("", "")).unwrap()).unwrap();
        assert_eq!(decoded, task("", "red"));

        let full = task("semi-skimmed", "blue");
        assert_eq!(decode_task(&encode_task(&full).unwrap()).unwrap(), full);
    }

    #[test]
    fn test_encode_rejects_invalid_tasks() {
        let mut bad_id = task("", "red");
        bad_id.id = "not-a-uuid".to_string();
        assert!(matches!(
            encode_task(&bad_id),
            Err(TaskListError::Validation { .. })
        ));

        let mut no_summary = task("", "red");
        no_summary.summary.clear();
        assert!(encode_task(&no_summary).is_err());

        let mut no_deadline = task("", "red");
        no_deadline.deadline.clear();
        assert!(encode_task(&no_deadline).is_err());
    }

    #[test]
    fn test_decode_requires_fields() {
        let full = Item::new()
            .with(SORT_KEY, "TASK#abc")
            .with("Summary", "s")
            .with("Deadline", "2023-01-01");
        assert_eq!(decode_task(&full).unwrap().id, "abc");

        let missing = [
            Item::new().with(SORT_KEY, "TASK#abc").with("Deadline", "d"),
            Item::new().with(SORT_KEY, "TASK#abc").with("Summary", "s"),
            Item::new().with("Summary", "s").with("Deadline", "d"),
            Item::new().with(SORT_KEY, "TASK").with("Summary", "s").with("Deadline", "d"),
            Item::new().with(SORT_KEY, "TASK#").with("Summary", "s").with("Deadline", "d"),
            Item::new().with(SORT_KEY, "TASK#abc").with("Summary", 7i64).with("Deadline", "d"),
        ];
        for item in missing {
            assert!(matches!(
                decode_task(&item),
                Err(TaskListError::MalformedRecord { .. })
            ));
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            summary in "[^\\x00]{1,40}",
            deadline in "[0-9]{4}-[0-9]{2}-[0-9]{2}",
            description in "[a-z ]{0,20}",
            color in "[a-z]{0,8}",
        ) {
            let original = Task {
                id: uuid::Uuid::new_v4().to_string(),
                summary,
                description: description.clone(),
                deadline,
                color: color.clone(),
            };

            let decoded = decode_task(&encode_task(&original).unwrap()).unwrap();

            prop_assert_eq!(&decoded.id, &original.id);
            prop_assert_eq!(&decoded.summary, &original.summary);
            prop_assert_eq!(&decoded.deadline, &original.deadline);
            prop_assert_eq!(decoded.description, description);
            let expected_color = if color.is_empty() { "red".to_string() } else { color };
            prop_assert_eq!(decoded.color, expected_color);
        }

        #[test]
        fn prop_encode_rejects_non_uuid_ids(id in "[a-z]{1,30}") {
            let mut invalid = task("", "red");
            invalid.id = id;
            prop_assert!(encode_task(&invalid).is_err());
        }
    }
}
