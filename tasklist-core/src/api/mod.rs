//! Request handling for the task-list service
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │          HTTP adapter (axum routes, middleware)          │
//! ├──────────────────────────────────────────────────────────┤
//! │  RequestPipeline per operation                           │
//! │  headers -> body -> AuthGate -> Handler -> schema -> JSON│
//! │                     │ any failure                        │
//! │                     └──> ErrorNormalizer                 │
//! ├──────────────────────────────────────────────────────────┤
//! │  Handlers: Create, Read, ReadAll, Update, Delete         │
//! ├──────────────────────────────────────────────────────────┤
//! │  TaskStore (storage)                                     │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod docs;
pub mod error_normalizer;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod routes;
pub mod schemas;
pub mod server;

pub use auth::{AuthGate, PermissionMatch};
pub use docs::ApiDoc;
pub use error_normalizer::ErrorNormalizer;
pub use handlers::{Operation, TaskApi};
pub use pipeline::{Handler, HandlerResponse, RequestPipeline, ResponseSchema};
pub use request::{ApiRequest, ApiResponse, RequestContext};
pub use server::RestApiServer;
