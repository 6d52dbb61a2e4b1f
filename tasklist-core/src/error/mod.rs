//! Error handling for the task-list service
//!
//! Every failure raised by the store, the authentication gate or a handler is
//! a [`TaskListError`]. Errors are never formatted for the wire where they are
//! raised; the terminal error stage of the request pipeline does that, using
//! the status classification each variant carries.
//!
//! ## Error Categories
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                  Task-list Error Taxonomy                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │  Classified (exposed)          │  Unclassified (500)          │
//! │  ┌──────────────────────────┐  │  ┌────────────────────────┐  │
//! │  │ • Validation      400    │  │  │ • Storage / Backend    │  │
//! │  │ • Unauthenticated 401    │  │  │ • Malformed record     │  │
//! │  │ • Quota exceeded  402    │  │  │ • Serialization        │  │
//! │  │ • Forbidden       403    │  │  │ • Configuration        │  │
//! │  │ • Not found       404    │  │  │ • Internal             │  │
//! │  │ • Http (explicit)        │  │  └────────────────────────┘  │
//! │  └──────────────────────────┘  │                              │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod types;
pub mod constructors;
pub mod conversions;


pub use types::{ErrorClass, TaskListError, TaskListResult};
