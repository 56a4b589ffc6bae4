// Catalog of listening server processes

mod format;
mod runtime;

pub use format::format_memory;
pub use runtime::{
    build_health_report, build_runtime_catalog, Classifier, HealthReport, ProcessClass,
    RuntimeMatcher, RuntimeProcess, SignatureClassifier, DEFAULT_DEV_SIGNATURES,
};

use crate::inspect::{InspectError, ProcessInspector, ProcessSample};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};

/// Shown in place of memory when the process could not be read
pub const MEMORY_UNAVAILABLE: &str = "N/A";
/// Shown in place of the command line when the process could not be read
pub const DETAILS_UNAVAILABLE: &str = "Details unavailable";

/// One row shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// 1-based, valid only until the next rebuild
    pub display_index: usize,
    pub pid: i32,
    pub process_name: String,
    pub port: String,
    /// `None` when the process vanished before it could be read
    pub memory_kb: Option<u64>,
    pub memory_formatted: String,
    pub command_details: String,
}

/// A row before display indices are assigned
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Row {
    pid: i32,
    process_name: String,
    port: String,
    memory_kb: Option<u64>,
    command: String,
}

/// Immutable, indexed snapshot of listening processes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Number rows `1..=N` in the given order
    fn from_rows(rows: Vec<Row>) -> Self {
        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| CatalogEntry {
                display_index: i + 1,
                pid: row.pid,
                process_name: row.process_name,
                port: row.port,
                memory_formatted: row
                    .memory_kb
                    .map_or_else(|| MEMORY_UNAVAILABLE.to_string(), format_memory),
                memory_kb: row.memory_kb,
                command_details: row.command,
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve an operator-supplied 1-based index
    pub fn get(&self, display_index: usize) -> Option<&CatalogEntry> {
        display_index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
    }

    /// Sum of every known `memory_kb`; unavailable entries count as nothing
    pub fn total_memory_kb(&self) -> u64 {
        self.entries
            .iter()
            .filter_map(|e| e.memory_kb)
            .fold(0, u64::saturating_add)
    }
}

/// Snapshot listeners and join each with its process sample.
///
/// A process that exits between the two reads stays in the catalog with
/// unavailable memory and details. Identical rows collapse; the same pid on
/// different ports stays as separate rows.
pub fn build_catalog(inspector: &dyn ProcessInspector) -> Result<Catalog> {
    let listeners = inspector
        .snapshot_listeners()
        .context("Failed to list listening sockets")?;

    log::debug!("Found {} listening socket(s)", listeners.len());

    let mut samples: HashMap<i32, Option<ProcessSample>> = HashMap::new();
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for listener in listeners {
        let sample = samples
            .entry(listener.pid)
            .or_insert_with(|| lookup_tolerant(inspector, listener.pid));

        let row = Row {
            pid: listener.pid,
            process_name: listener.process_name,
            port: listener.port,
            memory_kb: sample.as_ref().map(|s| s.resident_memory_kb),
            command: sample
                .as_ref()
                .map_or_else(|| DETAILS_UNAVAILABLE.to_string(), |s| s.command.clone()),
        };

        if seen.insert(row.clone()) {
            rows.push(row);
        } else {
            log::debug!("Collapsing duplicate row for pid {} on {}", row.pid, row.port);
        }
    }

    Ok(Catalog::from_rows(rows))
}

fn lookup_tolerant(inspector: &dyn ProcessInspector, pid: i32) -> Option<ProcessSample> {
    match inspector.lookup_process(pid) {
        Ok(sample) => Some(sample),
        Err(InspectError::NotFound(_)) => {
            log::debug!("Process {pid} exited before it could be read");
            None
        }
        Err(e) => {
            log::warn!("Could not read process {pid}: {e}");
            None
        }
    }
}
