//! Tool and Component trait definitions

use crate::config::{ConfigError, Settings};

use super::context::ToolContext;
use super::error::ToolError;

/// A configurable sub-unit owned by a tool or another component
///
/// Components form a tree rooted at the tool, and each component is owned
/// by exactly one parent. Configuration resolves top-down: a component sees
/// its owner's effective settings with its own explicit settings overlaid
/// (child overrides parent, unset options inherit). Components acquire
/// resources on the root tool's stack during setup - never on a private
/// stack - so one unwind point governs the whole tree.
pub trait Component {
    /// Component name; scopes `--Name.option=value` overrides
    fn name(&self) -> &str;

    /// Explicit settings declared at construction
    fn settings(&self) -> &Settings;

    /// Validate and store the fully-resolved option set
    ///
    /// Fail-closed: a missing required option or invalid value must return
    /// a `ConfigError`, which aborts the owning tool's lifecycle before any
    /// resource is acquired.
    fn configure(&mut self, effective: &Settings) -> Result<(), ConfigError>;

    /// Child components, visited depth-first, parent before children
    fn children_mut(&mut self) -> Vec<&mut dyn Component> {
        Vec::new()
    }

    /// Acquire scoped resources on the owning tool's stack
    fn setup(&mut self, _ctx: &mut ToolContext) -> Result<(), ToolError> {
        Ok(())
    }
}

/// The top-level runnable, configurable unit of a pipeline
///
/// Implementations supply the work; the [`ToolExecutor`](super::ToolExecutor)
/// supplies the lifecycle: configuration cascades over the component tree,
/// setup and run may acquire resources, and the stack unwinds on every exit
/// path before the terminal status is observable.
pub trait Tool {
    /// Tool name; used in logs, error messages, and override scoping
    fn name(&self) -> &str;

    /// Explicit settings declared at construction
    fn settings(&self) -> &Settings;

    /// Directly owned components
    fn components_mut(&mut self) -> Vec<&mut dyn Component> {
        Vec::new()
    }

    /// Validate and store the fully-resolved option set (fail-closed)
    fn configure(&mut self, effective: &Settings) -> Result<(), ConfigError>;

    /// Acquire scoped resources before the main work starts
    fn setup(&mut self, _ctx: &mut ToolContext) -> Result<(), ToolError> {
        Ok(())
    }

    /// The tool's actual work
    ///
    /// Return `ToolError::failure(..)` for a controlled failure with its own
    /// exit code; any other error is treated as an internal fault.
    fn run(&mut self, ctx: &mut ToolContext) -> Result<(), ToolError>;

    /// Success-path epilogue, skipped when setup or run failed
    ///
    /// An error here is a fault: the run's outputs may be incomplete.
    fn finish(&mut self, _ctx: &mut ToolContext) -> Result<(), ToolError> {
        Ok(())
    }
}
