//! Task request and response schemas

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::types::{Task, TaskUpdate};

/// Body of `POST /tasks`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateTaskRequest {
    /// Short summary of the task
    #[validate(length(min = 1, message = "Task summary cannot be empty"))]
    pub summary: String,

    /// Deadline as a date string
    #[validate(length(min = 1, message = "Task deadline cannot be empty"))]
    pub deadline: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Defaults to `red`
    #[serde(default)]
    pub color: Option<String>,
}

impl CreateTaskRequest {
    /// The task to store, with a fresh id
    pub fn into_task(self) -> Task {
        Task::new(self.summary, self.deadline, self.description, self.color)
    }
}

/// Body of `PUT /tasks/{id}`; only present fields are changed
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_update_not_empty", skip_on_field_errors = false))]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, message = "Task summary cannot be empty"))]
    pub summary: Option<String>,

    pub description: Option<String>,

    #[validate(length(min = 1, message = "Task deadline cannot be empty"))]
    pub deadline: Option<String>,

    pub color: Option<String>,
}

fn validate_update_not_empty(request: &UpdateTaskRequest) -> Result<(), ValidationError> {
    if request.summary.is_none()
        && request.description.is_none()
        && request.deadline.is_none()
        && request.color.is_none()
    {
        let mut error = ValidationError::new("empty_update");
        error.message = Some("Task update must change at least one field".into());
        return Err(error);
    }
    Ok(())
}

impl From<UpdateTaskRequest> for TaskUpdate {
    fn from(request: UpdateTaskRequest) -> Self {
        TaskUpdate {
            summary: request.summary,
            description: request.description,
            deadline: request.deadline,
            color: request.color,
        }
    }
}

/// Response of `POST /tasks`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTaskResponse {
    #[validate(custom = "validate_task_id")]
    pub task_id: String,
}

/// Response of `GET /tasks/{id}` and `PUT /tasks/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct TaskResponse {
    #[validate(custom = "validate_task")]
    pub data: Task,
}

/// Response of `GET /tasks`
///
/// Listing is not paginated: the single page always holds every task.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskListResponse {
    #[validate(custom = "validate_tasks")]
    pub results: Vec<Task>,

    #[validate(range(min = 1, max = 1))]
    pub page_number: u64,

    #[validate(range(min = 1))]
    pub page_size: u64,

    pub total_results: u64,
}

impl TaskListResponse {
    pub fn single_page(results: Vec<Task>) -> Self {
        let total_results = results.len() as u64;
        Self {
            results,
            page_number: 1,
            page_size: total_results.max(1),
            total_results,
        }
    }
}

/// Response of `DELETE /tasks/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct DeleteTaskResponse {}

fn validate_task_id(id: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid"))
}

fn validate_task(task: &Task) -> Result<(), ValidationError> {
    validate_task_id(&task.id)?;
    if task.summary.is_empty() || task.deadline.is_empty() {
        return Err(ValidationError::new("required_field"));
    }
    Ok(())
}

fn validate_tasks(tasks: &[Task]) -> Result<(), ValidationError> {
    tasks.iter().try_for_each(validate_task)
}
