// Inspector backed by the lsof and ps utilities

use super::meminfo::read_meminfo;
use super::vmstat::parse_vm_stat;
use super::{
    missing_tools, InspectError, ListenerBinding, MemoryStatus, Parsed, PreconditionError,
    ProcessInspector, ProcessSample,
};
use std::path::Path;
use std::process::{Command, Output};

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Uses `lsof -iTCP -sTCP:LISTEN` for listeners and `ps` for process samples
#[derive(Debug, Default)]
pub struct LsofInspector;

impl LsofInspector {
    pub const fn new() -> Self {
        Self
    }
}

fn run_tool(tool: &'static str, args: &[&str]) -> Result<Output, InspectError> {
    log::debug!("Running {tool} {}", args.join(" "));
    Command::new(tool)
        .args(args)
        .output()
        .map_err(|e| InspectError::ToolFailed {
            tool,
            reason: e.to_string(),
        })
}

impl ProcessInspector for LsofInspector {
    fn check_preconditions(&self) -> Result<(), PreconditionError> {
        let missing = missing_tools(&["lsof", "ps"]);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PreconditionError { missing })
        }
    }

    fn snapshot_listeners(&self) -> Result<Vec<ListenerBinding>, InspectError> {
        let output = run_tool("lsof", &["-iTCP", "-sTCP:LISTEN", "-P", "-n"])?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        // lsof exits 1 when nothing matched
        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.trim().is_empty() {
                return Ok(Vec::new());
            }
            return Err(InspectError::ToolFailed {
                tool: "lsof",
                reason: stderr.trim().to_string(),
            });
        }

        let parsed = parse_lsof_listeners(&stdout);
        if parsed.skipped > 0 {
            log::warn!("Skipped {} unparseable lsof line(s)", parsed.skipped);
        }
        Ok(parsed.items)
    }

    fn lookup_process(&self, pid: i32) -> Result<ProcessSample, InspectError> {
        let pid_arg = pid.to_string();
        let output = run_tool("ps", &["-o", "rss=,command=", "-p", &pid_arg])?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        let Some(line) = stdout.lines().find(|l| !l.trim().is_empty()) else {
            return Err(InspectError::NotFound(pid));
        };
        if !output.status.success() {
            return Err(InspectError::NotFound(pid));
        }

        let (resident_memory_kb, command) =
            parse_ps_line(line).ok_or_else(|| InspectError::ToolFailed {
                tool: "ps",
                reason: format!("unexpected output for pid {pid}: {line}"),
            })?;

        Ok(ProcessSample {
            pid,
            resident_memory_kb,
            command,
        })
    }

    fn snapshot_system_memory(&self) -> Result<MemoryStatus, InspectError> {
        if which::which("vm_stat").is_ok() {
            let output = run_tool("vm_stat", &[])?;
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Ok(match parse_vm_stat(&stdout) {
                Some(stats) => MemoryStatus::Supported(stats),
                None => {
                    log::warn!("vm_stat output did not contain the expected page counts");
                    MemoryStatus::Unsupported
                }
            });
        }

        if Path::new(MEMINFO_PATH).exists() {
            let stats = read_meminfo(MEMINFO_PATH)
                .map_err(|e| InspectError::Procfs(format!("{e:#}")))?;
            return Ok(stats.map_or(MemoryStatus::Unsupported, MemoryStatus::Supported));
        }

        Ok(MemoryStatus::Unsupported)
    }

    fn snapshot_processes_matching(
        &self,
        predicate: &dyn Fn(&ProcessSample) -> bool,
    ) -> Result<Vec<ProcessSample>, InspectError> {
        let output = run_tool("ps", &["-axo", "pid=,rss=,command="])?;
        if !output.status.success() {
            return Err(InspectError::ToolFailed {
                tool: "ps",
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let parsed = parse_ps_table(&String::from_utf8_lossy(&output.stdout));
        if parsed.skipped > 0 {
            log::debug!("Skipped {} unparseable ps line(s)", parsed.skipped);
        }
        Ok(parsed.items.into_iter().filter(|s| predicate(s)).collect())
    }
}

/// Parse `lsof -iTCP -sTCP:LISTEN -P -n` output.
///
/// Columns are `COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME (STATE)`.
/// The header is ignored; lines that are short, carry a non-numeric pid or
/// a NAME without a port are counted as skipped.
pub fn parse_lsof_listeners(text: &str) -> Parsed<ListenerBinding> {
    let mut parsed = Parsed::default();

    for line in text.lines() {
        if line.trim().is_empty() || line.starts_with("COMMAND") {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 {
            parsed.skipped += 1;
            continue;
        }

        let pid = match parts[1].parse::<i32>() {
            Ok(pid) if pid > 0 => pid,
            _ => {
                parsed.skipped += 1;
                continue;
            }
        };

        let address = parts[8];
        if !address.contains(':') {
            parsed.skipped += 1;
            continue;
        }

        parsed.items.push(ListenerBinding {
            pid,
            process_name: unescape_lsof(parts[0]),
            port: address.to_string(),
        });
    }

    parsed
}

/// lsof prints spaces in command names as `\x20`
fn unescape_lsof(name: &str) -> String {
    name.replace("\\x20", " ")
}

/// Split off the first whitespace-delimited field
fn split_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((&s[..end], s[end..].trim_start()))
}

/// Parse one `ps -o rss=,command=` line into resident KB and command
pub fn parse_ps_line(line: &str) -> Option<(u64, String)> {
    let (rss, command) = split_field(line)?;
    let rss = rss.parse().ok()?;
    let command = command.trim_end();
    if command.is_empty() {
        return None;
    }
    Some((rss, command.to_string()))
}

/// Parse `ps -axo pid=,rss=,command=` output
fn parse_ps_table(text: &str) -> Parsed<ProcessSample> {
    let mut parsed = Parsed::default();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let sample = split_field(line).and_then(|(pid, rest)| {
            let pid = pid.parse::<i32>().ok()?;
            let (resident_memory_kb, command) = parse_ps_line(rest)?;
            Some(ProcessSample {
                pid,
                resident_memory_kb,
                command,
            })
        });

        match sample {
            Some(sample) => parsed.items.push(sample),
            None => parsed.skipped += 1,
        }
    }

    parsed
}
