//! Tool availability report for the `doctor` command

use std::path::PathBuf;

use crate::probe::{CommandRunner, Strategy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStatus {
    pub name: &'static str,
    /// Resolved location, `None` when missing.
    pub path: Option<PathBuf>,
}

impl DependencyStatus {
    pub fn available(&self) -> bool {
        self.path.is_some()
    }

    pub fn details(&self) -> String {
        self.path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "Missing (required for detection)".to_string())
    }
}

/// Status of every tool `strategy` needs, in the order it checks them.
pub fn collect_dependency_statuses(
    strategy: Strategy,
    runner: &dyn CommandRunner,
) -> Vec<DependencyStatus> {
    strategy
        .required_tools()
        .iter()
        .map(|&name| DependencyStatus {
            name,
            path: runner.resolve(name),
        })
        .collect()
}

/// Names of the tools that are not on the search path.
pub fn missing_tools(statuses: &[DependencyStatus]) -> Vec<&'static str> {
    statuses
        .iter()
        .filter(|status| !status.available())
        .map(|status| status.name)
        .collect()
}
