//! Application layer for taskdeck.
//!
//! This crate wires the core filter, validation and merge logic to a store,
//! and provides request dispatch and configuration for hosts.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod response;
pub mod task_store;

// Re-exports for convenience
pub use config::{DispatchConfig, ServiceConfig, StoreConfig};
pub use dispatch::TaskDispatcher;
pub use engine::{EngineError, EngineResult, TaskEngine};
pub use response::{ResponseStatus, TaskRequest, TaskResponse, handle};
pub use task_store::TaskStore;
