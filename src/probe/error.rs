//! Errors raised while probing the host

use std::time::Duration;
use thiserror::Error;

/// Probe errors. Every variant aborts the whole profile query.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// A required utility is not on the search path.
    #[error("Required tool not found on PATH: {0}")]
    ToolNotFound(String),

    #[error("Command `{command}` failed with {}", describe_status(.status))]
    CommandExecution {
        command: String,
        status: Option<i32>,
    },

    #[error("Command `{command}` timed out after {}s", .timeout.as_secs())]
    CommandTimedOut { command: String, timeout: Duration },

    #[error("Failed to run `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Expected marker text is missing from a tool's output.
    #[error("Could not find `{marker}` in output of {source_name}")]
    ParseNotFound { source_name: String, marker: String },

    #[error("Expected an integer for {field}, got {value:?}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("Cannot derive {field}: processor count is zero")]
    DivisionByZero { field: &'static str },

    #[error("Unexpected output from `{command}`: {output:?}")]
    UnexpectedOutput { command: String, output: String },
}

impl ProbeError {
    /// True for failures of the execution class (non-zero exit, timeout, spawn failure).
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            ProbeError::CommandExecution { .. }
                | ProbeError::CommandTimedOut { .. }
                | ProbeError::CommandSpawn { .. }
        )
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "termination by signal".to_string(),
    }
}
