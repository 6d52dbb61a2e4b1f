//! Domain types for the task-list service

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Color assigned to a task when none is given.
pub const DEFAULT_COLOR: &str = "red";

/// A single task item owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Task identifier (UUID)
    pub id: String,
    /// Short summary, never empty once stored
    pub summary: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Deadline as a date string (e.g. `2023-02-08`)
    pub deadline: String,
    /// Display color
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Task {
    /// Create a task with a fresh v4 id, applying the description/color defaults
    pub fn new(
        summary: impl Into<String>,
        deadline: impl Into<String>,
        description: Option<String>,
        color: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            summary: summary.into(),
            description: description.unwrap_or_default(),
            deadline: deadline.into(),
            color: color
                .filter(|color| !color.is_empty())
                .unwrap_or_else(default_color),
        }
    }
}

/// The settable fields of a task, with their store column names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Summary,
    Description,
    Deadline,
    Color,
}

impl TaskField {
    pub const ALL: [TaskField; 4] = [
        TaskField::Summary,
        TaskField::Description,
        TaskField::Deadline,
        TaskField::Color,
    ];

    /// Column (attribute) name of this field in the store
    pub const fn column(self) -> &'static str {
        match self {
            TaskField::Summary => "Summary",
            TaskField::Description => "Description",
            TaskField::Deadline => "Deadline",
            TaskField::Color => "Color",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            TaskField::Summary => "summary",
            TaskField::Description => "description",
            TaskField::Deadline => "deadline",
            TaskField::Color => "color",
        }
    }

    /// Whether a stored task must always carry a non-empty value for this field
    pub const fn is_required(self) -> bool {
        matches!(self, TaskField::Summary | TaskField::Deadline)
    }
}

/// Partial update of a task; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub color: Option<String>,
}

impl TaskUpdate {
    pub fn get(&self, field: TaskField) -> Option<&str> {
        match field {
            TaskField::Summary => self.summary.as_deref(),
            TaskField::Description => self.description.as_deref(),
            TaskField::Deadline => self.deadline.as_deref(),
            TaskField::Color => self.color.as_deref(),
        }
    }

    /// Present fields in the fixed field order
    pub fn assignments(&self) -> impl Iterator<Item = (TaskField, &str)> + '_ {
        TaskField::ALL
            .into_iter()
            .filter_map(move |field| self.get(field).map(|value| (field, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().next().is_none()
    }
}
