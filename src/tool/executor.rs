//! ToolExecutor - drives one tool through its lifecycle state machine

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Overrides;
use crate::resources::CleanupError;

use super::cascade::configure_tool;
use super::context::ToolContext;
use super::error::{EXIT_FAULT, ToolError};
use super::traits::{Component, Tool};

/// Lifecycle states of a tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Instance constructed, nothing resolved yet
    #[default]
    Created,
    /// Configuration resolved over the whole component tree
    Configured,
    /// Acquiring scoped resources
    Setup,
    /// Main work executing
    Running,
    /// Run and finish completed normally
    Succeeded,
    /// Controlled failure, fault, or panic
    Failed,
    /// Resource stack unwound; the instance is inert
    CleanedUp,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Configured => write!(f, "configured"),
            Self::Setup => write!(f, "setup"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::CleanedUp => write!(f, "cleaned_up"),
        }
    }
}

/// Terminal report of one lifecycle pass
///
/// Produced only after the resource stack has unwound; a caller can never
/// observe a half-torn-down tool through this type.
pub struct ExecutionReport {
    /// Process-style exit status (0 success, 1..=63 controlled, 64 config, 70 fault)
    pub exit_code: i32,

    /// Terminal state, always `CleanedUp`
    pub state: LifecycleState,

    /// The lifecycle error, if any
    pub error: Option<ToolError>,

    /// Aggregate resource-release failures, if any
    pub cleanup: Option<CleanupError>,

    /// Captured tool output
    pub output: Option<String>,

    /// Payload of a panic caught during setup/run/finish, preserved so the
    /// harness can resume it verbatim after cleanup
    pub panic: Option<Box<dyn Any + Send>>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

impl std::fmt::Debug for ExecutionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionReport")
            .field("exit_code", &self.exit_code)
            .field("state", &self.state)
            .field("error", &self.error)
            .field("cleanup", &self.cleanup)
            .field("panicked", &self.panic.is_some())
            .finish()
    }
}

/// Drives a tool through exactly one lifecycle pass
///
/// The executor owns the tool and the state machine. Every exit path -
/// normal completion, controlled failure, fault, or panic - passes through
/// the unconditional stack unwind before the report is returned.
pub struct ToolExecutor<T: Tool> {
    tool: T,
    state: LifecycleState,
}

impl<T: Tool> ToolExecutor<T> {
    /// Create an executor for a not-yet-run tool
    pub fn new(tool: T) -> Self {
        Self {
            tool,
            state: LifecycleState::Created,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Borrow the owned tool
    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Take the tool back, e.g. to inspect results after execution
    pub fn into_tool(self) -> T {
        self.tool
    }

    /// Execute the full lifecycle once
    ///
    /// Returns `Err(ToolError::AlreadyExecuted)` on re-entry; every other
    /// outcome, including faults and release failures, is carried in the
    /// report with cleanup already completed.
    pub fn execute(&mut self, overrides: &Overrides, workdir: &Path) -> Result<ExecutionReport, ToolError> {
        if self.state != LifecycleState::Created {
            return Err(ToolError::AlreadyExecuted {
                name: self.tool.name().to_string(),
            });
        }

        info!(tool = self.tool.name(), workdir = %workdir.display(), "starting tool lifecycle");
        let mut ctx = ToolContext::new(workdir.to_path_buf());
        let mut error: Option<ToolError> = None;
        let mut panic: Option<Box<dyn Any + Send>> = None;

        // CREATED -> CONFIGURED: resolve the whole tree before anything runs.
        // A failure here owes no cleanup - no resource exists yet.
        match configure_tool(&mut self.tool, overrides) {
            Ok(()) => self.state = LifecycleState::Configured,
            Err(e) => {
                warn!(tool = self.tool.name(), error = %e, "configuration failed");
                error = Some(ToolError::Config(e));
            }
        }

        // CONFIGURED -> SETUP: tool first, then components parent-first
        if error.is_none() {
            self.state = LifecycleState::Setup;
            run_step(
                || {
                    self.tool.setup(&mut ctx)?;
                    setup_components(self.tool.components_mut(), &mut ctx)
                },
                &mut error,
                &mut panic,
                "setup",
            );
        }

        // SETUP -> RUNNING
        if error.is_none() && panic.is_none() {
            self.state = LifecycleState::Running;
            run_step(|| self.tool.run(&mut ctx), &mut error, &mut panic, "run");
        }

        // Success epilogue; an error here is a fault
        if error.is_none() && panic.is_none() {
            run_step(|| self.tool.finish(&mut ctx), &mut error, &mut panic, "finish");
        }

        self.state = if error.is_none() && panic.is_none() {
            LifecycleState::Succeeded
        } else {
            LifecycleState::Failed
        };
        debug!(tool = self.tool.name(), state = %self.state, "terminal state reached");

        // {SUCCEEDED|FAILED} -> CLEANED_UP: unconditional, exactly once
        let cleanup = ctx.resources_mut().release_all().err();
        self.state = LifecycleState::CleanedUp;

        let exit_code = match (&error, &panic) {
            (None, None) => 0,
            (Some(e), _) => e.exit_code(),
            (None, Some(_)) => EXIT_FAULT,
        };
        info!(tool = self.tool.name(), exit_code, "tool lifecycle complete");

        Ok(ExecutionReport {
            exit_code,
            state: self.state,
            error,
            cleanup,
            output: ctx.take_output(),
            panic,
        })
    }
}

/// Run one lifecycle step, containing panics so cleanup still happens
fn run_step<F>(step: F, error: &mut Option<ToolError>, panic: &mut Option<Box<dyn Any + Send>>, phase: &str)
where
    F: FnOnce() -> Result<(), ToolError>,
{
    match catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(phase, error = %e, "lifecycle step failed");
            *error = Some(e);
        }
        Err(payload) => {
            warn!(phase, "lifecycle step panicked");
            *panic = Some(payload);
        }
    }
}

/// Depth-first component setup, parent before children
fn setup_components(components: Vec<&mut dyn Component>, ctx: &mut ToolContext) -> Result<(), ToolError> {
    for component in components {
        debug!(component = component.name(), "component setup");
        component.setup(ctx)?;
        setup_components(component.children_mut(), ctx)?;
    }
    Ok(())
}
