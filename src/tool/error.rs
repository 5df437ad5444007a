//! Tool error types and the exit-status mapping

use thiserror::Error;
use tracing::warn;

use crate::config::ConfigError;

/// Exit status for configuration errors (EX_USAGE)
pub const EXIT_CONFIG: i32 = 64;

/// Exit status for unexpected internal faults (EX_SOFTWARE)
pub const EXIT_FAULT: i32 = 70;

/// Errors surfaced by a tool lifecycle
///
/// The variants separate the two failure classes the harness reports
/// differently: a controlled `Failure` is the tool's own verdict that it
/// cannot proceed, a `Fault` is an unexpected error from setup/run/finish.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Invalid or missing configuration; always detected before any
    /// resource is acquired
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Controlled failure raised by the tool's own logic
    #[error("{reason}")]
    Failure { reason: String, exit_code: i32 },

    /// Unexpected fault from setup, run, or finish
    #[error("{0}")]
    Fault(eyre::Report),

    /// Lifecycle re-entry on an instance that already ran
    #[error("tool '{name}' has already executed; a tool runs its lifecycle at most once")]
    AlreadyExecuted { name: String },
}

impl ToolError {
    /// Controlled failure with the default exit code 1
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::failure_with_code(reason, 1)
    }

    /// Controlled failure with a tool-specific exit code
    ///
    /// Controlled codes live in `1..=63`, below the reserved configuration
    /// (64) and internal-fault (70) codes. An out-of-range code falls back
    /// to the default 1 so a controlled failure can never masquerade as
    /// success or as one of the reserved bands.
    pub fn failure_with_code(reason: impl Into<String>, exit_code: i32) -> Self {
        let exit_code = if (1..=63).contains(&exit_code) {
            exit_code
        } else {
            warn!(exit_code, "controlled exit code outside 1..=63, using 1");
            1
        };
        Self::Failure {
            reason: reason.into(),
            exit_code,
        }
    }

    /// True for controlled failures, false for configuration errors and faults
    pub fn is_controlled(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Process-style exit status for this error
    ///
    /// Success is 0; controlled failures report their own code; everything
    /// unexpected lands in a distinct band so wrappers can tell the classes
    /// apart without parsing messages.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => EXIT_CONFIG,
            Self::Failure { exit_code, .. } => *exit_code,
            Self::Fault(_) | Self::AlreadyExecuted { .. } => EXIT_FAULT,
        }
    }
}

impl From<eyre::Report> for ToolError {
    fn from(report: eyre::Report) -> Self {
        Self::Fault(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_bands() {
        let config = ToolError::Config(ConfigError::MissingOption {
            owner: "Tool".to_string(),
            option: "input".to_string(),
        });
        assert_eq!(config.exit_code(), EXIT_CONFIG);

        assert_eq!(ToolError::failure("no events").exit_code(), 1);
        assert_eq!(ToolError::failure_with_code("bad run", 3).exit_code(), 3);

        let fault = ToolError::from(eyre::eyre!("broken"));
        assert_eq!(fault.exit_code(), EXIT_FAULT);
    }

    #[test]
    fn test_out_of_range_controlled_codes_fall_back_to_default() {
        // 0 would read as success, 64 and 70 collide with reserved bands
        assert_eq!(ToolError::failure_with_code("bad", 0).exit_code(), 1);
        assert_eq!(ToolError::failure_with_code("bad", -5).exit_code(), 1);
        assert_eq!(ToolError::failure_with_code("bad", EXIT_CONFIG).exit_code(), 1);
        assert_eq!(ToolError::failure_with_code("bad", EXIT_FAULT).exit_code(), 1);
        assert_eq!(ToolError::failure_with_code("bad", 63).exit_code(), 63);
    }

    #[test]
    fn test_controlled_classification() {
        assert!(ToolError::failure("stop").is_controlled());
        assert!(!ToolError::from(eyre::eyre!("boom")).is_controlled());
    }

    #[test]
    fn test_failure_message() {
        let err = ToolError::failure("no usable events in input");
        assert_eq!(err.to_string(), "no usable events in input");
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: ToolError = ConfigError::InvalidArgument("bad".to_string()).into();
        assert!(err.to_string().contains("bad"));
    }
}
