//! run_tool - synchronous test harness for tool lifecycles
//!
//! The harness constructs the overrides, drives one full lifecycle pass of
//! one tool instance, and returns a structured result. Test-friendly
//! defaults: a fresh temporary working directory per call (no run pollutes
//! the caller's directory) and fault re-raising on, so a test can assert on
//! the original error instead of an exit code.

use std::panic::resume_unwind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::Overrides;
use crate::resources::CleanupError;
use crate::tool::{EXIT_CONFIG, ExecutionReport, Tool, ToolError, ToolExecutor};

/// Structured result of one harness-driven lifecycle pass
///
/// When the harness created the working directory itself, the result holds
/// the directory guard: the directory exists for as long as the caller
/// keeps the result and is removed when it drops.
pub struct ExecutionResult {
    /// Process-style exit status (0 success, 1..=63 controlled, 64 config, 70 fault)
    pub exit_code: i32,

    /// Working directory the pass ran against
    pub workdir: PathBuf,

    /// Captured tool output, if the tool emitted any
    pub stdout: Option<String>,

    /// The lifecycle error, populated when re-raising is off and the run failed
    pub error: Option<ToolError>,

    /// Aggregate resource-release failures; never masks the primary outcome
    pub cleanup: Option<CleanupError>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    _tempdir: Option<TempDir>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

impl std::fmt::Debug for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionResult")
            .field("exit_code", &self.exit_code)
            .field("workdir", &self.workdir)
            .field("stdout", &self.stdout)
            .field("error", &self.error)
            .field("cleanup", &self.cleanup)
            .finish()
    }
}

/// Harness configuration builder
///
/// `Harness::new().run(tool, args)` is equivalent to [`run_tool`]; use
/// [`Harness::cwd`] to run against an existing directory and
/// [`Harness::raises(false)`] to swallow errors into the exit status.
#[derive(Debug, Clone)]
pub struct Harness {
    cwd: Option<PathBuf>,
    raises: bool,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self {
            cwd: None,
            raises: true,
        }
    }

    /// Run against an explicit working directory instead of a fresh one
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }

    /// Whether lifecycle errors re-raise to the caller (default `true`)
    ///
    /// With re-raising off, the error is swallowed into the exit status and
    /// attached to the result instead.
    pub fn raises(mut self, raises: bool) -> Self {
        self.raises = raises;
        self
    }

    /// Drive one full lifecycle pass of one tool instance
    ///
    /// Consumes the tool, so the same instance cannot be run twice through
    /// the harness. Cleanup always completes before this returns or
    /// re-raises; a panic from the tool resumes with its original payload
    /// only after the resource stack has unwound.
    pub fn run<T: Tool>(&self, tool: T, arguments: &[&str]) -> Result<ExecutionResult, ToolError> {
        let started_at = Utc::now();

        let (tempdir, workdir) = match &self.cwd {
            Some(path) => (None, path.clone()),
            None => {
                let dir = TempDir::new()
                    .map_err(|e| ToolError::Fault(eyre::eyre!("failed to create working directory: {e}")))?;
                let path = dir.path().to_path_buf();
                (Some(dir), path)
            }
        };
        debug!(tool = tool.name(), workdir = %workdir.display(), raises = self.raises, "run_tool starting");

        let overrides = match Overrides::parse(arguments) {
            Ok(overrides) => overrides,
            Err(e) if self.raises => return Err(e.into()),
            Err(e) => {
                return Ok(ExecutionResult {
                    exit_code: EXIT_CONFIG,
                    workdir,
                    stdout: None,
                    error: Some(e.into()),
                    cleanup: None,
                    started_at,
                    finished_at: Utc::now(),
                    _tempdir: tempdir,
                });
            }
        };

        // A fresh executor per call: re-entry cannot happen through the harness
        let mut executor = ToolExecutor::new(tool);
        let report = executor.execute(&overrides, &workdir)?;

        let ExecutionReport {
            exit_code,
            error,
            cleanup,
            output,
            panic,
            ..
        } = report;

        if self.raises {
            // Cleanup already completed inside the executor
            if let Some(payload) = panic {
                resume_unwind(payload);
            }
            if let Some(error) = error {
                return Err(error);
            }
        }

        let finished_at = Utc::now();
        info!(exit_code, "run_tool finished");
        Ok(ExecutionResult {
            exit_code,
            workdir,
            stdout: output,
            error,
            cleanup,
            started_at,
            finished_at,
            _tempdir: tempdir,
        })
    }
}

/// Run a tool's full lifecycle under test defaults
///
/// Equivalent to `Harness::new().run(tool, arguments)`: a fresh temporary
/// working directory and fault re-raising enabled.
pub fn run_tool<T: Tool>(tool: T, arguments: &[&str]) -> Result<ExecutionResult, ToolError> {
    Harness::new().run(tool, arguments)
}
