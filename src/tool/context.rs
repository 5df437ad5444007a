//! ToolContext - execution context for one lifecycle pass

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::resources::{Resource, ResourceStack};

/// Execution context handed to setup/run/finish - scoped to a single pass
///
/// The context carries the working directory for the pass and the tool's
/// resource stack. Tools and components resolve relative output paths
/// through [`ToolContext::resolve`] instead of the process working
/// directory, which is what keeps a harness-driven run from writing into
/// the caller's own directory.
#[derive(Debug)]
pub struct ToolContext {
    /// Working directory for this pass - relative paths resolve here
    pub workdir: PathBuf,

    resources: ResourceStack,
    output: Vec<String>,
}

impl ToolContext {
    /// Create a context rooted at a working directory
    pub fn new(workdir: PathBuf) -> Self {
        debug!(workdir = %workdir.display(), "ToolContext::new: called");
        Self {
            workdir,
            resources: ResourceStack::new(),
            output: Vec::new(),
        }
    }

    /// Resolve a path against the working directory
    ///
    /// Absolute paths pass through untouched.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    /// Acquire a resource on the tool's stack, returning a shared handle
    ///
    /// Components delegate here too - the root tool's stack is the single
    /// unwind point for the whole component tree.
    pub fn acquire<R: Resource + 'static>(&mut self, resource: R) -> Arc<Mutex<R>> {
        self.resources.acquire(resource)
    }

    /// Inspect the resource stack
    pub fn resources(&self) -> &ResourceStack {
        &self.resources
    }

    pub(crate) fn resources_mut(&mut self) -> &mut ResourceStack {
        &mut self.resources
    }

    /// Record a line of user-facing tool output
    ///
    /// Captured output lands on the execution result so tests can assert
    /// on it; it is also logged.
    pub fn emit(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!(output = %line, "tool output");
        self.output.push(line);
    }

    pub(crate) fn take_output(&mut self) -> Option<String> {
        if self.output.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.output).join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_path() {
        let ctx = ToolContext::new(PathBuf::from("/data/run42"));
        assert_eq!(ctx.resolve("out.h5"), PathBuf::from("/data/run42/out.h5"));
    }

    #[test]
    fn test_resolve_absolute_path_passes_through() {
        let ctx = ToolContext::new(PathBuf::from("/data/run42"));
        assert_eq!(ctx.resolve("/tmp/out.h5"), PathBuf::from("/tmp/out.h5"));
    }

    #[test]
    fn test_output_capture() {
        let mut ctx = ToolContext::new(PathBuf::from("/data"));
        assert!(ctx.take_output().is_none());

        ctx.emit("processed 10 events");
        ctx.emit("wrote out.h5");

        assert_eq!(ctx.take_output().unwrap(), "processed 10 events\nwrote out.h5");
        assert!(ctx.take_output().is_none());
    }
}
