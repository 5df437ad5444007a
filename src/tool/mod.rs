//! Tool lifecycle system
//!
//! A `Tool` is the top-level runnable unit of a pipeline: it owns a tree of
//! `Component`s, resolves configuration over that tree (parent before
//! children, child overrides parent), acquires scoped resources through a
//! `ToolContext`, and is driven through exactly one
//! `CREATED -> CONFIGURED -> SETUP -> RUNNING -> {SUCCEEDED|FAILED} ->
//! CLEANED_UP` pass by the `ToolExecutor`.

mod cascade;
mod context;
mod error;
mod executor;
mod traits;

pub use crate::config::ConfigError;
pub use context::ToolContext;
pub use error::{EXIT_CONFIG, EXIT_FAULT, ToolError};
pub use executor::{ExecutionReport, LifecycleState, ToolExecutor};
pub use traits::{Component, Tool};
