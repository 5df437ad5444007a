//! Resource stack - ordered registry of acquired resources
//!
//! Tools and components acquire scoped resources (output files, locks,
//! external handles) during setup and run. The stack releases them in
//! strict reverse acquisition order, exactly once per lifecycle, on every
//! exit path. Later-acquired resources may depend on earlier ones, so the
//! LIFO order is a contract, not an implementation detail.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

/// A resource that needs explicit release when its tool terminates
pub trait Resource: Send {
    /// Resource name for logs and cleanup reports
    fn name(&self) -> &str;

    /// Release the resource (close, flush, remove, ...)
    fn release(&mut self) -> eyre::Result<()>;
}

/// Aggregate report of every release that failed during unwind
///
/// A failing release never stops the remaining releases; all failures are
/// collected here so none is silently dropped.
#[derive(Debug, Error)]
#[error("cleanup failed for {} resource(s): {}", failures.len(), summary(failures))]
pub struct CleanupError {
    pub failures: Vec<(String, eyre::Report)>,
}

fn summary(failures: &[(String, eyre::Report)]) -> String {
    failures
        .iter()
        .map(|(name, report)| format!("{name}: {report}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Ordered registry of acquired resources with reverse-order release
#[derive(Default)]
pub struct ResourceStack {
    entries: Vec<Arc<Mutex<dyn Resource>>>,
    released: bool,
}

impl ResourceStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource and return a shared handle to it
    ///
    /// The handle stays usable for the rest of the tool's life; the stack
    /// keeps its own handle for the unwind.
    pub fn acquire<R: Resource + 'static>(&mut self, resource: R) -> Arc<Mutex<R>> {
        debug!(resource = resource.name(), depth = self.entries.len() + 1, "acquired resource");
        let handle = Arc::new(Mutex::new(resource));
        let entry: Arc<Mutex<dyn Resource>> = handle.clone();
        self.entries.push(entry);
        handle
    }

    /// Number of resources still registered
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once the stack has been unwound
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release every registered resource in reverse acquisition order
    ///
    /// Each release is attempted even when an earlier one fails; failures
    /// are aggregated into the returned `CleanupError`. The lifecycle
    /// executor calls this exactly once; a repeated call is a no-op.
    pub fn release_all(&mut self) -> Result<(), CleanupError> {
        if self.released {
            warn!("release_all called on an already-released stack");
            return Ok(());
        }
        self.released = true;

        let mut failures = Vec::new();
        for entry in self.entries.drain(..).rev() {
            let mut resource = match entry.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let name = resource.name().to_string();
            match resource.release() {
                Ok(()) => debug!(resource = %name, "released resource"),
                Err(report) => {
                    warn!(resource = %name, error = %report, "resource release failed");
                    failures.push((name, report));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CleanupError { failures })
        }
    }
}

impl std::fmt::Debug for ResourceStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStack")
            .field("len", &self.entries.len())
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
        released: bool,
    }

    impl Probe {
        fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                log,
                fail: false,
                released: false,
            }
        }

        fn failing(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                fail: true,
                ..Self::new(name, log)
            }
        }
    }

    impl Resource for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn release(&mut self) -> eyre::Result<()> {
            self.released = true;
            self.log.lock().unwrap().push(self.name.clone());
            if self.fail {
                eyre::bail!("{} refused to close", self.name);
            }
            Ok(())
        }
    }

    #[test]
    fn test_release_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ResourceStack::new();

        stack.acquire(Probe::new("r1", log.clone()));
        stack.acquire(Probe::new("r2", log.clone()));
        stack.acquire(Probe::new("r3", log.clone()));
        assert_eq!(stack.len(), 3);

        stack.release_all().unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["r3", "r2", "r1"]);
        assert!(stack.is_empty());
        assert!(stack.is_released());
    }

    #[test]
    fn test_release_failure_does_not_stop_unwind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ResourceStack::new();

        stack.acquire(Probe::new("r1", log.clone()));
        stack.acquire(Probe::failing("r2", log.clone()));
        stack.acquire(Probe::new("r3", log.clone()));

        let err = stack.release_all().unwrap_err();

        // All three were attempted, in reverse order
        assert_eq!(*log.lock().unwrap(), vec!["r3", "r2", "r1"]);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].0, "r2");
        assert!(err.to_string().contains("r2 refused to close"));
    }

    #[test]
    fn test_all_failures_are_aggregated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ResourceStack::new();

        stack.acquire(Probe::failing("a", log.clone()));
        stack.acquire(Probe::failing("b", log.clone()));

        let err = stack.release_all().unwrap_err();
        let names: Vec<&str> = err.failures.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_empty_stack_releases_cleanly() {
        let mut stack = ResourceStack::new();
        assert!(stack.release_all().is_ok());
        assert!(stack.is_released());
    }

    #[test]
    fn test_second_release_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ResourceStack::new();
        stack.acquire(Probe::new("r1", log.clone()));

        stack.release_all().unwrap();
        stack.release_all().unwrap();

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handle_usable_after_acquire() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ResourceStack::new();

        let handle = stack.acquire(Probe::new("r1", log.clone()));
        assert!(!handle.lock().unwrap().released);

        stack.release_all().unwrap();
        assert!(handle.lock().unwrap().released);
    }
}
