// Runtime process analysis for the memory health report

use crate::inspect::{MemoryStatus, ProcessInspector, ProcessSample};
use anyhow::{Context, Result};
use regex::Regex;
use std::fmt;

/// Command fragments that suggest a process was started for development
pub const DEFAULT_DEV_SIGNATURES: &[&str] = &[
    "server", "app", "index", "main", "dev", "start", "serve", "watch", "nodemon", "ts-node",
    "next", "vite", "webpack", "npm", "yarn", "pnpm", "jest",
];

/// Coarse classification of a runtime process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessClass {
    Development,
    System,
}

impl fmt::Display for ProcessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Decides which class a command line belongs to
pub trait Classifier {
    fn classify(&self, command: &str) -> ProcessClass;
}

/// Case-insensitive substring match against a fixed token list.
///
/// This is a heuristic. A system daemon whose path happens to contain
/// "app" is reported as development, and a dev server launched under an
/// unusual name is reported as system.
#[derive(Debug, Clone)]
pub struct SignatureClassifier {
    tokens: Vec<String>,
}

impl SignatureClassifier {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// The built-in signatures plus `extra`
    pub fn with_defaults(extra: &[String]) -> Self {
        Self::new(
            DEFAULT_DEV_SIGNATURES
                .iter()
                .map(|s| (*s).to_string())
                .chain(extra.iter().cloned()),
        )
    }
}

impl Classifier for SignatureClassifier {
    fn classify(&self, command: &str) -> ProcessClass {
        let command = command.to_lowercase();
        if self.tokens.iter().any(|t| command.contains(t.as_str())) {
            ProcessClass::Development
        } else {
            ProcessClass::System
        }
    }
}

/// Selects processes of one runtime (e.g. node) by command pattern
#[derive(Debug, Clone)]
pub struct RuntimeMatcher {
    pattern: Regex,
    own_pid: i32,
}

impl RuntimeMatcher {
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            own_pid: std::process::id() as i32,
        }
    }

    pub fn matches(&self, sample: &ProcessSample) -> bool {
        sample.pid != self.own_pid && self.pattern.is_match(&sample.command)
    }
}

/// A runtime process with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeProcess {
    pub sample: ProcessSample,
    pub class: ProcessClass,
}

/// Every process matching `matcher`, classified, largest memory first
pub fn build_runtime_catalog(
    inspector: &dyn ProcessInspector,
    matcher: &RuntimeMatcher,
    classifier: &dyn Classifier,
) -> Result<Vec<RuntimeProcess>> {
    let samples = inspector
        .snapshot_processes_matching(&|s: &ProcessSample| matcher.matches(s))
        .context("Failed to scan runtime processes")?;

    let mut processes: Vec<RuntimeProcess> = samples
        .into_iter()
        .map(|sample| RuntimeProcess {
            class: classifier.classify(&sample.command),
            sample,
        })
        .collect();

    processes.sort_by(|a, b| b.sample.resident_memory_kb.cmp(&a.sample.resident_memory_kb));
    Ok(processes)
}

/// System paging statistics plus the runtime breakdown
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub memory: MemoryStatus,
    /// Sorted by memory, largest first
    pub processes: Vec<RuntimeProcess>,
    pub top_n: usize,
}

impl HealthReport {
    pub fn top(&self) -> &[RuntimeProcess] {
        &self.processes[..self.top_n.min(self.processes.len())]
    }

    pub fn total_kb(&self) -> u64 {
        self.processes
            .iter()
            .map(|p| p.sample.resident_memory_kb)
            .fold(0, u64::saturating_add)
    }

    /// Process count and memory for one class
    pub fn class_totals(&self, class: ProcessClass) -> (usize, u64) {
        self.processes
            .iter()
            .filter(|p| p.class == class)
            .fold((0, 0), |(count, kb), p| {
                (count + 1, kb.saturating_add(p.sample.resident_memory_kb))
            })
    }
}

pub fn build_health_report(
    inspector: &dyn ProcessInspector,
    matcher: &RuntimeMatcher,
    classifier: &dyn Classifier,
    top_n: usize,
) -> Result<HealthReport> {
    let memory = match inspector.snapshot_system_memory() {
        Ok(status) => status,
        Err(e) => {
            log::warn!("Could not read paging statistics: {e}");
            MemoryStatus::Unsupported
        }
    };

    Ok(HealthReport {
        memory,
        processes: build_runtime_catalog(inspector, matcher, classifier)?,
        top_n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::fake::{FakeInspector, FakeSnapshot};
    use crate::inspect::SystemMemoryStats;

    fn node_matcher() -> RuntimeMatcher {
        RuntimeMatcher::new(Regex::new(r"\bnode\b").unwrap())
    }

    fn node_snapshot() -> FakeSnapshot {
        FakeSnapshot::default()
            .with_process(10, 20_480, "node /srv/app/server.js")
            .with_process(11, 512_000, "node /usr/lib/code/extensions/tsserver.js")
            .with_process(12, 8_192, "/usr/bin/python3 worker.py")
            .with_process(13, 96_000, "/usr/local/bin/node /opt/telemetry/agent.js")
            .with_process(14, 4_096, "nodemon")
    }

    #[test]
    fn test_signature_classifier() {
        let classifier = SignatureClassifier::with_defaults(&[]);
        assert_eq!(classifier.classify("node server.js"), ProcessClass::Development);
        assert_eq!(classifier.classify("NPM run build"), ProcessClass::Development);
        assert_eq!(classifier.classify("/usr/bin/node /opt/telemetry/agent.js"), ProcessClass::System);
    }

    #[test]
    fn test_signature_classifier_extra_tokens() {
        let classifier = SignatureClassifier::with_defaults(&["Telemetry".to_string()]);
        assert_eq!(classifier.classify("/usr/bin/node /opt/telemetry/agent.js"), ProcessClass::Development);
    }

    #[test]
    fn test_signature_classifier_ignores_empty_tokens() {
        let classifier = SignatureClassifier::new([""]);
        assert_eq!(classifier.classify("anything"), ProcessClass::System);
    }

    #[test]
    fn test_runtime_matcher_excludes_self_and_partial_words() {
        let matcher = node_matcher();
        let own = ProcessSample {
            pid: std::process::id() as i32,
            resident_memory_kb: 1,
            command: "node".to_string(),
        };
        let nodemon = ProcessSample {
            pid: 14,
            resident_memory_kb: 1,
            command: "nodemon".to_string(),
        };
        assert!(!matcher.matches(&own));
        assert!(!matcher.matches(&nodemon));
    }

    #[test]
    fn test_build_runtime_catalog_sorted_by_memory() {
        let inspector = FakeInspector::new(vec![node_snapshot()]);
        let classifier = SignatureClassifier::with_defaults(&[]);
        let processes = build_runtime_catalog(&inspector, &node_matcher(), &classifier).unwrap();

        let pids: Vec<i32> = processes.iter().map(|p| p.sample.pid).collect();
        assert_eq!(pids, vec![11, 13, 10]);
        assert_eq!(processes[0].class, ProcessClass::Development);
        assert_eq!(processes[1].class, ProcessClass::System);
    }

    #[test]
    fn test_health_report_totals() {
        let mut inspector = FakeInspector::new(vec![node_snapshot()]);
        inspector.memory = MemoryStatus::Supported(SystemMemoryStats {
            free_mb: 100,
            ..SystemMemoryStats::default()
        });
        let classifier = SignatureClassifier::with_defaults(&[]);
        let report = build_health_report(&inspector, &node_matcher(), &classifier, 2).unwrap();

        assert_eq!(report.top().len(), 2);
        assert_eq!(report.total_kb(), 628_480);
        assert_eq!(report.class_totals(ProcessClass::Development), (2, 532_480));
        assert_eq!(report.class_totals(ProcessClass::System), (1, 96_000));
        assert!(matches!(report.memory, MemoryStatus::Supported(s) if s.free_mb == 100));
    }

    #[test]
    fn test_health_report_top_larger_than_list() {
        let inspector = FakeInspector::new(vec![FakeSnapshot::default()]);
        let classifier = SignatureClassifier::with_defaults(&[]);
        let report = build_health_report(&inspector, &node_matcher(), &classifier, 10).unwrap();
        assert!(report.top().is_empty());
        assert_eq!(report.memory, MemoryStatus::Unsupported);
    }
}
