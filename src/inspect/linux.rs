// Inspector backed by /proc

use super::meminfo::read_meminfo;
use super::{
    InspectError, ListenerBinding, MemoryStatus, PreconditionError, ProcessInspector,
    ProcessSample,
};
use procfs::net::{TcpNetEntry, TcpState};
use procfs::process::{FDTarget, Process};
use procfs::ProcError;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

const REQUIRED_PATHS: [&str; 2] = ["/proc/net/tcp", "/proc/meminfo"];

/// Reads sockets, processes and paging statistics straight from procfs
#[derive(Debug, Default)]
pub struct ProcfsInspector;

impl ProcfsInspector {
    pub const fn new() -> Self {
        Self
    }

    /// Map every socket inode to the processes holding it.
    ///
    /// Pre-fork servers share one listen socket between the master and its
    /// workers, so an inode can have several owners.
    fn socket_owners() -> Result<HashMap<u64, Vec<(i32, String)>>, InspectError> {
        let mut owners: HashMap<u64, Vec<(i32, String)>> = HashMap::new();

        for process in procfs::process::all_processes().map_err(procfs_error)? {
            let Ok(process) = process else { continue };
            // Other users' fd tables are unreadable without privileges
            let Ok(fds) = process.fd() else { continue };
            let name = process
                .stat()
                .map(|stat| stat.comm)
                .unwrap_or_else(|_| "?".to_string());

            for fd in fds.flatten() {
                if let FDTarget::Socket(inode) = fd.target {
                    let holders = owners.entry(inode).or_default();
                    // Duplicated fds of one process still mean one owner
                    if !holders.iter().any(|(pid, _)| *pid == process.pid()) {
                        holders.push((process.pid(), name.clone()));
                    }
                }
            }
        }

        Ok(owners)
    }
}

fn procfs_error(e: ProcError) -> InspectError {
    InspectError::Procfs(e.to_string())
}

/// Render a bound address the way lsof does: `*:3000`, `127.0.0.1:5432`, `[::1]:8080`
fn format_local_address(address: SocketAddr) -> String {
    if address.ip().is_unspecified() {
        format!("*:{}", address.port())
    } else {
        address.to_string()
    }
}

/// Read one process the way `ps -o rss,command` would describe it
fn read_sample(pid: i32) -> Result<ProcessSample, InspectError> {
    let process = Process::new(pid).map_err(|e| lookup_error(pid, e))?;
    let stat = process.stat().map_err(|e| lookup_error(pid, e))?;

    // stat.rss is in pages
    let resident_memory_kb = stat.rss.saturating_mul(procfs::page_size()) / 1024;

    let command = process.cmdline().unwrap_or_default().join(" ");
    let command = if command.is_empty() {
        format!("[{}]", stat.comm)
    } else {
        command
    };

    Ok(ProcessSample {
        pid,
        resident_memory_kb,
        command,
    })
}

fn lookup_error(pid: i32, e: ProcError) -> InspectError {
    match e {
        ProcError::NotFound(_) => InspectError::NotFound(pid),
        ProcError::PermissionDenied(_) => InspectError::PermissionDenied(pid),
        other => InspectError::Procfs(other.to_string()),
    }
}

impl ProcessInspector for ProcfsInspector {
    fn check_preconditions(&self) -> Result<(), PreconditionError> {
        let missing: Vec<String> = REQUIRED_PATHS
            .iter()
            .filter(|path| !Path::new(path).exists())
            .map(|path| format!("{path} (procfs)"))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PreconditionError { missing })
        }
    }

    fn snapshot_listeners(&self) -> Result<Vec<ListenerBinding>, InspectError> {
        let owners = Self::socket_owners()?;

        let mut entries: Vec<TcpNetEntry> = procfs::net::tcp().map_err(procfs_error)?;
        match procfs::net::tcp6() {
            Ok(v6) => entries.extend(v6),
            Err(e) => log::debug!("IPv6 socket table unavailable: {e}"),
        }

        let mut bindings: Vec<ListenerBinding> = entries
            .into_iter()
            .filter(|entry| entry.state == TcpState::Listen)
            .flat_map(|entry| {
                let holders = owners.get(&entry.inode).map(Vec::as_slice).unwrap_or_default();
                if holders.is_empty() {
                    log::debug!(
                        "No visible owner for listening socket {} (inode {})",
                        entry.local_address,
                        entry.inode
                    );
                }
                let port = format_local_address(entry.local_address);
                holders
                    .iter()
                    .map(|(pid, name)| ListenerBinding {
                        pid: *pid,
                        process_name: name.clone(),
                        port: port.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        // lsof lists by pid; keep the same order
        bindings.sort_by_key(|binding| binding.pid);
        Ok(bindings)
    }

    fn lookup_process(&self, pid: i32) -> Result<ProcessSample, InspectError> {
        read_sample(pid)
    }

    fn snapshot_system_memory(&self) -> Result<MemoryStatus, InspectError> {
        let stats = read_meminfo("/proc/meminfo")
            .map_err(|e| InspectError::Procfs(format!("{e:#}")))?;
        Ok(stats.map_or(MemoryStatus::Unsupported, MemoryStatus::Supported))
    }

    fn snapshot_processes_matching(
        &self,
        predicate: &dyn Fn(&ProcessSample) -> bool,
    ) -> Result<Vec<ProcessSample>, InspectError> {
        let mut samples = Vec::new();

        for process in procfs::process::all_processes().map_err(procfs_error)? {
            let Ok(process) = process else { continue };
            match read_sample(process.pid()) {
                Ok(sample) if predicate(&sample) => samples.push(sample),
                Ok(_) => {}
                Err(e) => log::debug!("Skipping process {}: {e}", process.pid()),
            }
        }

        Ok(samples)
    }
}
