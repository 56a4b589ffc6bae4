// Configuration module

mod args;

pub use args::{Args, Backend};
use anyhow::{bail, Context, Result};
use regex::{Regex, RegexBuilder};

/// Runtime selected for the health report when none is given
pub const DEFAULT_RUNTIME_PATTERN: &str = r"\bnode\b";

const DEFAULT_TOP_N: usize = 10;
const MAX_TOP_N: usize = 100;

/// Patterns come from the command line; keep them small
const MAX_REGEX_PATTERN_LENGTH: usize = 256;
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Compile a user-supplied pattern with length and size limits
fn compile_safe_regex(pattern: &str) -> Result<Regex> {
    if pattern.len() > MAX_REGEX_PATTERN_LENGTH {
        bail!(
            "Runtime pattern too long (max {MAX_REGEX_PATTERN_LENGTH} chars): {}...",
            pattern.chars().take(50).collect::<String>()
        );
    }

    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .with_context(|| format!("Invalid runtime pattern: {pattern}"))
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub debug: bool,
    pub color: bool,
    pub backend: Backend,
    /// Rows in the health report's top list
    pub top_n: usize,
    pub runtime_pattern: Regex,
    /// Added to the built-in development signatures
    pub dev_signatures: Vec<String>,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let pattern = args.runtime.as_deref().unwrap_or(DEFAULT_RUNTIME_PATTERN);

        let config = Self {
            debug: args.debug,
            color: !args.no_color,
            backend: args.backend.unwrap_or_else(Backend::platform_default),
            top_n: args.top.unwrap_or(DEFAULT_TOP_N),
            runtime_pattern: compile_safe_regex(pattern)?,
            dev_signatures: args
                .dev_signatures
                .into_iter()
                .map(|s| s.trim().to_string())
                .collect(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if !(1..=MAX_TOP_N).contains(&self.top_n) {
            bail!("--top must be between 1 and {MAX_TOP_N}");
        }

        if self.backend == Backend::Procfs && !cfg!(target_os = "linux") {
            bail!("the procfs backend is only available on Linux");
        }

        if self.dev_signatures.iter().any(String::is_empty) {
            bail!("--dev-signature must not be empty");
        }

        Ok(())
    }
}
