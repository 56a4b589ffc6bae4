// Command-line argument parsing

use clap::{Parser, ValueEnum};

/// Source of process and socket information
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Read /proc directly (Linux only)
    Procfs,
    /// Run lsof and ps
    Lsof,
}

impl Backend {
    pub const fn platform_default() -> Self {
        if cfg!(target_os = "linux") {
            Self::Procfs
        } else {
            Self::Lsof
        }
    }
}

/// Vampire Hunter - find and kill server processes
///
/// Scans for processes listening on TCP ports, shows their memory usage in
/// a numbered table and lets you terminate them one by one or all at once.
/// Every kill asks for confirmation; SIGKILL is only sent when you ask for
/// it after SIGTERM failed.
#[derive(Parser, Debug)]
#[command(name = "vampire-hunter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect and kill memory-draining server processes", long_about)]
pub struct Args {
    /// Enable debug logging on stderr
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Where to read process information from (default: procfs on Linux, lsof elsewhere)
    #[arg(long = "backend", value_enum, value_name = "BACKEND")]
    pub backend: Option<Backend>,

    /// Number of runtime processes listed in the memory health report (default: 10)
    #[arg(long = "top", value_name = "N")]
    pub top: Option<usize>,

    /// Regex selecting runtime processes for the memory health report (default: \bnode\b)
    #[arg(long = "runtime", value_name = "REGEX")]
    pub runtime: Option<String>,

    /// Extra command fragment marking a runtime process as development (repeatable)
    #[arg(long = "dev-signature", value_name = "TOKEN")]
    pub dev_signatures: Vec<String>,
}

impl Args {
    /// Parse arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_no_arguments() {
        let args = Args::try_parse_from(["vampire-hunter"]).unwrap();
        assert!(!args.debug);
        assert!(args.backend.is_none());
        assert!(args.dev_signatures.is_empty());
    }

    #[test]
    fn test_help_flags_short_circuit() {
        for flag in ["-h", "--help"] {
            let err = Args::try_parse_from(["vampire-hunter", flag]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
            assert_eq!(err.exit_code(), 0);
        }
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = Args::try_parse_from(["vampire-hunter", "--bogus"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
        assert_ne!(err.exit_code(), 0);

        let err = Args::try_parse_from(["vampire-hunter", "stray"]).unwrap_err();
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn test_repeatable_signatures_and_backend() {
        let args = Args::try_parse_from([
            "vampire-hunter",
            "--backend",
            "lsof",
            "--dev-signature",
            "rails",
            "--dev-signature",
            "puma",
        ])
        .unwrap();
        assert_eq!(args.backend, Some(Backend::Lsof));
        assert_eq!(args.dev_signatures, vec!["rails", "puma"]);
    }
}
