//! Wire schemas
//!
//! Request and response bodies of the REST API. Every schema derives
//! `ToSchema` for the OpenAPI document and `Validate` so the pipeline can
//! check handler output against it.

pub mod errors;
pub mod health;
pub mod task;

pub use errors::*;
pub use health::*;
pub use task::*;
