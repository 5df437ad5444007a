//! ObsPipe application lifecycle core
//!
//! ObsPipe tools are the runnable units of an observatory data-processing
//! pipeline. This crate provides the lifecycle layer those tools are built
//! on: cascading configuration resolution over a tree of components, a
//! resource stack that guarantees reverse-order release on every exit path,
//! and a synchronous test harness for driving one full lifecycle pass.
//!
//! # Core Concepts
//!
//! - **One pass per instance**: a tool runs its lifecycle exactly once;
//!   re-entry is rejected, never silently restarted
//! - **Cleanup on every exit**: resources unwind in reverse acquisition
//!   order whether the run succeeded, failed, or panicked
//! - **Fail-closed configuration**: missing or mistyped options abort
//!   before any resource is acquired
//! - **Isolated runs**: the harness gives every run its own working
//!   directory unless the caller supplies one
//!
//! # Modules
//!
//! - [`config`] - Settings maps, cascading overlay, and argument overrides
//! - [`resources`] - Resource trait and the reverse-order release stack
//! - [`tool`] - Tool/Component traits and the lifecycle state machine
//! - [`harness`] - `run_tool` test harness

pub mod config;
pub mod harness;
pub mod resources;
pub mod tool;

// Re-export commonly used types
pub use config::{Overrides, Settings};
pub use harness::{ExecutionResult, Harness, run_tool};
pub use resources::{CleanupError, Resource, ResourceStack};
pub use tool::{
    Component, ConfigError, EXIT_CONFIG, EXIT_FAULT, ExecutionReport, LifecycleState, Tool, ToolContext, ToolError,
    ToolExecutor,
};
