#![forbid(unsafe_code)]

pub mod api;
pub mod http;
pub mod memory;
pub mod wire;

pub use api::{BackendError, ProgressStore, QuestionSupply, SubmissionSink, TaskNotifier};
pub use http::{BackendConfig, HttpBackend};
pub use memory::{InMemoryBackend, SubmissionRecord};
