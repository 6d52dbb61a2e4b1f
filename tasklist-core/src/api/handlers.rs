//! Operation handlers
//!
//! Each handler resolves the acting user from the subject claim, calls the
//! [`TaskStore`] and shapes the response body. [`TaskApi`] wraps every
//! handler in its configured [`RequestPipeline`].

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::auth::AuthGate;
use super::error_normalizer::ErrorNormalizer;
use super::pipeline::{Handler, HandlerResponse, RequestPipeline, ResponseSchema};
use super::request::{ApiRequest, ApiResponse};
use super::schemas::{
    CreateTaskRequest, CreateTaskResponse, DeleteTaskResponse, TaskListResponse, TaskResponse,
    UpdateTaskRequest,
};
use crate::config::TaskListConfig;
use crate::error::constructors::{MISSING_TASK_ID, TASK_NOT_FOUND};
use crate::error::{TaskListError, TaskListResult};
use crate::observability::ObservabilitySink;
use crate::storage::{DeleteOutcome, TaskStore};

/// Path parameter carrying the task id.
pub const TASK_ID_PARAMETER: &str = "id";

fn task_id(request: &ApiRequest) -> TaskListResult<&str> {
    request
        .path_parameter(TASK_ID_PARAMETER)
        .ok_or_else(|| TaskListError::validation(TASK_ID_PARAMETER, MISSING_TASK_ID))
}

/// `POST /tasks`
pub struct CreateTask {
    store: TaskStore,
}

#[async_trait]
impl Handler for CreateTask {
    async fn handle(&self, request: &ApiRequest) -> TaskListResult<HandlerResponse> {
        let user_id = request.context.subject()?;
        let body: CreateTaskRequest = request.parse_body()?;
        let task = body.into_task();

        self.store.create(user_id, &task).await?;

        HandlerResponse::ok(&CreateTaskResponse { task_id: task.id })
    }
}

/// `GET /tasks/{id}`
pub struct GetTask {
    store: TaskStore,
}

#[async_trait]
impl Handler for GetTask {
    async fn handle(&self, request: &ApiRequest) -> TaskListResult<HandlerResponse> {
        let user_id = request.context.subject()?;
        let task_id = task_id(request)?;

        let task = self
            .store
            .get_one(user_id, task_id)
            .await?
            .ok_or_else(|| TaskListError::not_found(TASK_NOT_FOUND))?;

        HandlerResponse::ok(&TaskResponse { data: task })
    }
}

/// `GET /tasks`
pub struct ListTasks {
    store: TaskStore,
}

#[async_trait]
impl Handler for ListTasks {
    async fn handle(&self, request: &ApiRequest) -> TaskListResult<HandlerResponse> {
        let user_id = request.context.subject()?;
        let tasks = self.store.list_by_user(user_id).await?;
        HandlerResponse::ok(&TaskListResponse::single_page(tasks))
    }
}

/// `PUT /tasks/{id}`
pub struct UpdateTask {
    store: TaskStore,
}

#[async_trait]
impl Handler for UpdateTask {
    async fn handle(&self, request: &ApiRequest) -> TaskListResult<HandlerResponse> {
        let user_id = request.context.subject()?;
        let task_id = task_id(request)?;
        let body: UpdateTaskRequest = request.parse_body()?;

        let task = self.store.update(user_id, task_id, &body.into()).await?;

        HandlerResponse::ok(&TaskResponse { data: task })
    }
}

/// `DELETE /tasks/{id}`
pub struct DeleteTask {
    store: TaskStore,
}

#[async_trait]
impl Handler for DeleteTask {
    async fn handle(&self, request: &ApiRequest) -> TaskListResult<HandlerResponse> {
        let user_id = request.context.subject()?;
        let task_id = task_id(request)?;

        if self.store.delete(user_id, task_id).await? == DeleteOutcome::AlreadyDeleted {
            debug!("Task {} was removed by a concurrent request", task_id);
        }

        HandlerResponse::ok(&DeleteTaskResponse {})
    }
}

/// The five task operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    ReadAll,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Read,
        Operation::ReadAll,
        Operation::Update,
        Operation::Delete,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::ReadAll => "read_all",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Whether the operation changes stored tasks
    pub const fn is_write(self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Delete)
    }

    const fn has_body(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }

    fn handler(self, store: TaskStore) -> Arc<dyn Handler> {
        match self {
            Operation::Create => Arc::new(CreateTask { store }),
            Operation::Read => Arc::new(GetTask { store }),
            Operation::ReadAll => Arc::new(ListTasks { store }),
            Operation::Update => Arc::new(UpdateTask { store }),
            Operation::Delete => Arc::new(DeleteTask { store }),
        }
    }

    fn response_schema(self) -> ResponseSchema {
        match self {
            Operation::Create => ResponseSchema::of::<CreateTaskResponse>(),
            Operation::Read | Operation::Update => ResponseSchema::of::<TaskResponse>(),
            Operation::ReadAll => ResponseSchema::of::<TaskListResponse>(),
            Operation::Delete => ResponseSchema::of::<DeleteTaskResponse>(),
        }
    }
}

/// Every operation's pipeline, built from configuration
pub struct TaskApi {
    store: TaskStore,
    normalizer: ErrorNormalizer,
    sink: Arc<dyn ObservabilitySink>,
    create: RequestPipeline,
    read: RequestPipeline,
    read_all: RequestPipeline,
    update: RequestPipeline,
    delete: RequestPipeline,
}

impl TaskApi {
    pub fn new(store: TaskStore, config: &TaskListConfig, sink: Arc<dyn ObservabilitySink>) -> Self {
        let normalizer = ErrorNormalizer::new(config.errors.fallback_message.clone());

        let build = |operation: Operation| {
            let mut pipeline = RequestPipeline::new(
                operation.name(),
                operation.handler(store.clone()),
                normalizer.clone(),
                sink.clone(),
            )
            .with_response_schema(operation.response_schema());

            if operation.has_body() {
                pipeline = pipeline.with_body_parsing();
            }
            if config.auth.enabled {
                let required = if operation.is_write() {
                    config.auth.write_permissions.clone()
                } else {
                    config.auth.read_permissions.clone()
                };
                pipeline = pipeline.with_auth(AuthGate::new(required, config.auth.permission_match));
            }
            pipeline
        };

        Self {
            create: build(Operation::Create),
            read: build(Operation::Read),
            read_all: build(Operation::ReadAll),
            update: build(Operation::Update),
            delete: build(Operation::Delete),
            store,
            normalizer,
            sink,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn pipeline(&self, operation: Operation) -> &RequestPipeline {
        match operation {
            Operation::Create => &self.create,
            Operation::Read => &self.read,
            Operation::ReadAll => &self.read_all,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
        }
    }

    /// Run `request` through the pipeline of `operation`
    pub async fn handle(&self, operation: Operation, request: ApiRequest) -> ApiResponse {
        self.pipeline(operation).run(request).await
    }

    /// Format a failure raised outside any pipeline, such as a transport
    /// rejection, through the same error stage
    pub fn normalize(&self, err: &TaskListError) -> ApiResponse {
        self.normalizer.normalize(err, self.sink.as_ref())
    }
}
