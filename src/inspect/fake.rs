// In-memory inspector for tests

use super::{
    InspectError, ListenerBinding, MemoryStatus, PreconditionError, ProcessInspector,
    ProcessSample,
};
use std::cell::Cell;
use std::collections::HashMap;

/// One scripted view of the process table
#[derive(Debug, Clone, Default)]
pub struct FakeSnapshot {
    pub listeners: Vec<ListenerBinding>,
    pub processes: HashMap<i32, ProcessSample>,
}

impl FakeSnapshot {
    /// Add a listener whose process is visible to lookups
    pub fn with_server(mut self, pid: i32, name: &str, port: &str, rss_kb: u64, command: &str) -> Self {
        self.listeners.push(ListenerBinding {
            pid,
            process_name: name.to_string(),
            port: port.to_string(),
        });
        self.processes.insert(
            pid,
            ProcessSample {
                pid,
                resident_memory_kb: rss_kb,
                command: command.to_string(),
            },
        );
        self
    }

    /// Add a listener whose process has exited before lookup
    pub fn with_vanished(mut self, pid: i32, name: &str, port: &str) -> Self {
        self.listeners.push(ListenerBinding {
            pid,
            process_name: name.to_string(),
            port: port.to_string(),
        });
        self
    }

    /// Add a non-listening process (visible to bulk scans only)
    pub fn with_process(mut self, pid: i32, rss_kb: u64, command: &str) -> Self {
        self.processes.insert(
            pid,
            ProcessSample {
                pid,
                resident_memory_kb: rss_kb,
                command: command.to_string(),
            },
        );
        self
    }
}

/// Serves scripted snapshots in order; the last one repeats
#[derive(Debug)]
pub struct FakeInspector {
    snapshots: Vec<FakeSnapshot>,
    cursor: Cell<usize>,
    pub memory: MemoryStatus,
}

impl FakeInspector {
    pub fn new(snapshots: Vec<FakeSnapshot>) -> Self {
        Self {
            snapshots,
            cursor: Cell::new(0),
            memory: MemoryStatus::Unsupported,
        }
    }

    /// Number of listener snapshots taken so far
    pub fn scans(&self) -> usize {
        self.cursor.get()
    }

    fn current(&self) -> FakeSnapshot {
        let index = self.cursor.get().saturating_sub(1);
        self.snapshots
            .get(index.min(self.snapshots.len().saturating_sub(1)))
            .cloned()
            .unwrap_or_default()
    }
}

impl ProcessInspector for FakeInspector {
    fn check_preconditions(&self) -> Result<(), PreconditionError> {
        Ok(())
    }

    fn snapshot_listeners(&self) -> Result<Vec<ListenerBinding>, InspectError> {
        self.cursor.set(self.cursor.get() + 1);
        Ok(self.current().listeners)
    }

    fn lookup_process(&self, pid: i32) -> Result<ProcessSample, InspectError> {
        self.current()
            .processes
            .get(&pid)
            .cloned()
            .ok_or(InspectError::NotFound(pid))
    }

    fn snapshot_system_memory(&self) -> Result<MemoryStatus, InspectError> {
        Ok(self.memory)
    }

    fn snapshot_processes_matching(
        &self,
        predicate: &dyn Fn(&ProcessSample) -> bool,
    ) -> Result<Vec<ProcessSample>, InspectError> {
        let mut samples: Vec<ProcessSample> = self
            .current()
            .processes
            .into_values()
            .filter(|s| predicate(s))
            .collect();
        samples.sort_by_key(|s| s.pid);
        Ok(samples)
    }
}
