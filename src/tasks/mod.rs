//! Tasks: the record, its store, and the REST surface.

pub mod model;
pub mod routes;
pub mod store;

pub use model::{CreateTaskRequest, Task, TaskStats, TaskStatus};
pub use store::TaskStore;
