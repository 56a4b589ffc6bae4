// Signal delivery for process termination

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// Strategy for killing processes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KillStrategy {
    /// SIGTERM, which the process may handle
    Graceful,
    /// SIGKILL, enforced by the kernel
    Forceful,
}

impl KillStrategy {
    const fn signal(self) -> Signal {
        match self {
            Self::Graceful => Signal::SIGTERM,
            Self::Forceful => Signal::SIGKILL,
        }
    }
}

/// Result of a kill operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillResult {
    /// The kernel accepted the signal; the process may still be running
    Success,
    /// Permission denied (typically need root)
    PermissionDenied,
    /// Process not found
    NotFound,
    /// Other error occurred
    Error(String),
}

impl KillResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get a human-readable description
    pub fn description(&self) -> &str {
        match self {
            Self::Success => "signal delivered",
            Self::PermissionDenied => "permission denied",
            Self::NotFound => "not found",
            Self::Error(msg) => msg,
        }
    }
}

/// Sends termination signals on behalf of the session
pub trait Terminator {
    /// Ask the process to exit
    fn terminate_graceful(&self, pid: i32) -> KillResult;

    /// Kill the process unconditionally
    fn terminate_force(&self, pid: i32) -> KillResult;
}

/// Terminator that signals real processes through kill(2)
#[derive(Debug)]
pub struct SignalTerminator {
    own_pid: i32,
}

impl SignalTerminator {
    pub fn new() -> Self {
        Self {
            own_pid: std::process::id() as i32,
        }
    }

    fn send(&self, pid: i32, strategy: KillStrategy) -> KillResult {
        // kill(2) treats 0 and negative pids as process groups
        if pid <= 1 {
            log::error!("Refusing to signal pid {pid}");
            return KillResult::Error(format!("refusing to signal pid {pid}"));
        }
        if pid == self.own_pid {
            log::error!("Refusing to signal own process {pid}");
            return KillResult::Error("refusing to signal own process".to_string());
        }

        let signal = strategy.signal();
        log::info!("Sending {signal} to process {pid}");

        match signal::kill(Pid::from_raw(pid), signal) {
            Ok(()) => KillResult::Success,
            Err(Errno::ESRCH) => KillResult::NotFound,
            Err(Errno::EPERM) => KillResult::PermissionDenied,
            Err(e) => {
                log::error!("Failed to send {signal} to process {pid}: {e}");
                KillResult::Error(format!("signal error: {e}"))
            }
        }
    }
}

impl Default for SignalTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminator for SignalTerminator {
    fn terminate_graceful(&self, pid: i32) -> KillResult {
        self.send(pid, KillStrategy::Graceful)
    }

    fn terminate_force(&self, pid: i32) -> KillResult {
        self.send(pid, KillStrategy::Forceful)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_strategy_signals() {
        assert_eq!(KillStrategy::Graceful.signal(), Signal::SIGTERM);
        assert_eq!(KillStrategy::Forceful.signal(), Signal::SIGKILL);
    }

    #[test]
    fn test_kill_result_is_success() {
        assert!(KillResult::Success.is_success());
        assert!(!KillResult::PermissionDenied.is_success());
        assert!(!KillResult::NotFound.is_success());
        assert!(!KillResult::Error("boom".to_string()).is_success());
    }

    #[test]
    fn test_kill_result_description() {
        assert_eq!(KillResult::Success.description(), "signal delivered");
        assert_eq!(KillResult::PermissionDenied.description(), "permission denied");
        assert_eq!(KillResult::NotFound.description(), "not found");
        assert_eq!(KillResult::Error("boom".to_string()).description(), "boom");
    }

    #[test]
    fn test_kill_nonexistent_process() {
        let terminator = SignalTerminator::new();
        assert_eq!(terminator.terminate_force(999_999_999), KillResult::NotFound);
    }

    #[test]
    fn test_refuses_group_and_init_pids() {
        let terminator = SignalTerminator::new();
        for pid in [-1, 0, 1] {
            assert!(matches!(terminator.terminate_force(pid), KillResult::Error(_)));
        }
    }

    #[test]
    fn test_refuses_own_process() {
        let terminator = SignalTerminator::new();
        let own = std::process::id() as i32;
        assert!(matches!(terminator.terminate_graceful(own), KillResult::Error(_)));
    }
}
