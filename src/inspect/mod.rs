// Operating system inspection: listening sockets, process samples, paging statistics

#[cfg(test)]
pub(crate) mod fake;
#[cfg(target_os = "linux")]
mod linux;
mod lsof;
mod meminfo;
mod vmstat;

#[cfg(target_os = "linux")]
pub use linux::ProcfsInspector;
pub use lsof::{parse_lsof_listeners, parse_ps_line, LsofInspector};
pub use meminfo::parse_meminfo;
pub use vmstat::parse_vm_stat;

use crate::config::Backend;
use thiserror::Error;

/// One process observed at snapshot time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSample {
    pub pid: i32,
    pub resident_memory_kb: u64,
    /// Full command line, never truncated
    pub command: String,
}

/// A TCP listen socket and the process holding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerBinding {
    pub pid: i32,
    pub process_name: String,
    /// `*:N` for a wildcard bind, `host:N` otherwise
    pub port: String,
}

/// Paging statistics in megabytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemMemoryStats {
    pub free_mb: u64,
    pub active_mb: u64,
    pub inactive_mb: u64,
    pub wired_mb: u64,
    pub compressed_mb: u64,
}

/// Result of a paging statistics query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStatus {
    Supported(SystemMemoryStats),
    /// The host exposes no paging statistics facility
    Unsupported,
}

/// Lines a text parser could not make sense of are skipped and counted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum InspectError {
    /// The process exited between the listener snapshot and the lookup
    #[error("process {0} not found")]
    NotFound(i32),

    #[error("permission denied reading process {0}")]
    PermissionDenied(i32),

    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: &'static str, reason: String },

    #[error("procfs: {0}")]
    Procfs(String),
}

/// Missing host facilities, reported once at startup
#[derive(Debug, Error)]
#[error("required system utilities not found: {}", .missing.join(", "))]
pub struct PreconditionError {
    pub missing: Vec<String>,
}

/// Read-only view of the operating system's process table
pub trait ProcessInspector {
    /// Verify that every facility this inspector relies on is present
    fn check_preconditions(&self) -> Result<(), PreconditionError>;

    /// All TCP sockets in the LISTEN state with their owning processes
    fn snapshot_listeners(&self) -> Result<Vec<ListenerBinding>, InspectError>;

    /// Memory and command line of a single process.
    ///
    /// Returns [`InspectError::NotFound`] when the process has already exited.
    fn lookup_process(&self, pid: i32) -> Result<ProcessSample, InspectError>;

    fn snapshot_system_memory(&self) -> Result<MemoryStatus, InspectError>;

    /// Every process for which `predicate` holds
    fn snapshot_processes_matching(
        &self,
        predicate: &dyn Fn(&ProcessSample) -> bool,
    ) -> Result<Vec<ProcessSample>, InspectError>;
}

/// Build the inspector for the selected backend
pub fn inspector_for(backend: Backend) -> Box<dyn ProcessInspector> {
    match backend {
        #[cfg(target_os = "linux")]
        Backend::Procfs => Box::new(ProcfsInspector::new()),
        #[cfg(not(target_os = "linux"))]
        Backend::Procfs => Box::new(LsofInspector::new()),
        Backend::Lsof => Box::new(LsofInspector::new()),
    }
}

/// Names from `tools` that cannot be found on `PATH`
pub(crate) fn missing_tools(tools: &[&str]) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| which::which(tool).is_err())
        .map(|tool| (*tool).to_string())
        .collect()
}

/// Convert a page count to whole megabytes
pub(crate) const fn pages_to_mb(pages: u64, page_size: u64) -> u64 {
    pages.saturating_mul(page_size) / (1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_to_mb() {
        assert_eq!(pages_to_mb(256, 4096), 1);
        assert_eq!(pages_to_mb(64, 16384), 1);
        assert_eq!(pages_to_mb(255, 4096), 0);
    }

    #[test]
    fn test_missing_tools_reports_unknown_binary() {
        let missing = missing_tools(&["definitely-not-a-real-tool-7f3a"]);
        assert_eq!(missing, vec!["definitely-not-a-real-tool-7f3a".to_string()]);
    }

    #[test]
    fn test_precondition_error_names_each_tool() {
        let err = PreconditionError {
            missing: vec!["lsof".to_string(), "ps".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "required system utilities not found: lsof, ps"
        );
    }
}
