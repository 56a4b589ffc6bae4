// Interactive session: scan, render, read a command, act, repeat

mod command;
pub mod presenter;

pub use command::{is_affirmative, Command};
pub use presenter::{Presenter, TerminalPresenter};

use crate::catalog::{
    build_catalog, build_health_report, format_memory, Catalog, CatalogEntry, Classifier,
    RuntimeMatcher, SignatureClassifier,
};
use crate::config::Config;
use crate::inspect::ProcessInspector;
use crate::killer::{KillResult, Terminator};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::BufRead;

/// Where the session loop currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Idle,
    Rendering,
    AwaitingCommand,
    Killing(CatalogEntry),
    KillingAll,
    Refreshing,
    ReportingHealth,
    Exiting,
}

/// How the `m` report selects and classifies runtime processes
pub struct HealthSettings {
    pub matcher: RuntimeMatcher,
    pub classifier: Box<dyn Classifier>,
    pub top_n: usize,
}

impl HealthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            matcher: RuntimeMatcher::new(config.runtime_pattern.clone()),
            classifier: Box::new(SignatureClassifier::with_defaults(&config.dev_signatures)),
            top_n: config.top_n,
        }
    }
}

/// Owns the current catalog and drives it through the state machine
pub struct Session<'a, R> {
    inspector: &'a dyn ProcessInspector,
    terminator: &'a dyn Terminator,
    presenter: &'a mut dyn Presenter,
    input: R,
    health: HealthSettings,
    catalog: Catalog,
    state: State,
}

impl<'a, R: BufRead> Session<'a, R> {
    pub fn new(
        inspector: &'a dyn ProcessInspector,
        terminator: &'a dyn Terminator,
        presenter: &'a mut dyn Presenter,
        input: R,
        health: HealthSettings,
    ) -> Self {
        Self {
            inspector,
            terminator,
            presenter,
            input,
            health,
            catalog: Catalog::default(),
            state: State::Idle,
        }
    }

    pub const fn state(&self) -> &State {
        &self.state
    }

    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run until the operator quits, input ends or nothing is left to show
    pub fn run(&mut self) -> Result<()> {
        while self.state != State::Exiting {
            let state = std::mem::replace(&mut self.state, State::Exiting);
            log::debug!("Session state: {state:?}");
            self.state = self.step(state)?;
        }
        Ok(())
    }

    fn step(&mut self, state: State) -> Result<State> {
        match state {
            State::Idle => Ok(self.scan()),
            State::Refreshing => {
                self.presenter.info("Refreshing process list...");
                Ok(self.scan())
            }
            State::Rendering => Ok(self.render()),
            State::AwaitingCommand => self.await_command(),
            State::Killing(entry) => self.kill_one(&entry),
            State::KillingAll => Ok(self.kill_all()),
            State::ReportingHealth => Ok(self.report_health()),
            State::Exiting => Ok(State::Exiting),
        }
    }

    /// Replace the catalog with a fresh snapshot
    fn scan(&mut self) -> State {
        self.presenter.info("Scanning for server processes...");
        self.catalog = match build_catalog(self.inspector) {
            Ok(catalog) => catalog,
            Err(e) => {
                self.presenter.error(&format!("{e:#}"));
                Catalog::default()
            }
        };
        State::Rendering
    }

    fn render(&mut self) -> State {
        if self.catalog.is_empty() {
            self.presenter.success("No server processes found");
            return State::Exiting;
        }

        self.presenter.render_catalog(&self.catalog);
        self.presenter
            .info(&format!("Total processes: {}", self.catalog.len()));

        let total_kb = self.catalog.total_memory_kb();
        if total_kb > 0 {
            self.presenter.info(&format!(
                "Total estimated memory usage: {}",
                format_memory(total_kb)
            ));
        }

        State::AwaitingCommand
    }

    /// Read one line; `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read operator input")?;
        Ok((read > 0).then_some(line))
    }

    /// Ask a y/N question; `None` at end of input
    fn confirm(&mut self, question: &str) -> Result<Option<bool>> {
        self.presenter.prompt(question);
        Ok(self.read_line()?.map(|answer| is_affirmative(&answer)))
    }

    fn exit(&mut self) -> State {
        self.presenter.info("Exiting...");
        State::Exiting
    }

    fn await_command(&mut self) -> Result<State> {
        let count = self.catalog.len();
        self.presenter.render_menu(count);
        self.presenter.prompt("Choice: ");

        let Some(line) = self.read_line()? else {
            return Ok(self.exit());
        };

        let next = match Command::parse(&line, count) {
            Command::Quit => self.exit(),
            Command::Refresh => State::Refreshing,
            Command::Health => State::ReportingHealth,
            Command::KillAll => {
                match self.confirm("Are you sure you want to kill ALL server processes? (y/N): ")? {
                    None => self.exit(),
                    Some(true) => State::KillingAll,
                    Some(false) => {
                        self.presenter.info("Cancelled");
                        State::AwaitingCommand
                    }
                }
            }
            Command::Kill(index) => {
                let Some(entry) = self.catalog.get(index).cloned() else {
                    return Ok(State::AwaitingCommand);
                };
                let question = format!(
                    "Kill process {} (PID: {}, Memory: {})? (y/N): ",
                    entry.process_name, entry.pid, entry.memory_formatted
                );
                match self.confirm(&question)? {
                    None => self.exit(),
                    Some(true) => State::Killing(entry),
                    Some(false) => {
                        self.presenter.info("Cancelled");
                        State::AwaitingCommand
                    }
                }
            }
            Command::OutOfRange => {
                self.presenter.warning(&format!(
                    "Invalid choice. Please enter a number between 1 and {count}, 'a', 'r', 'm', or 'q'."
                ));
                State::AwaitingCommand
            }
            Command::Unknown => {
                self.presenter
                    .warning("Invalid choice. Please enter a number, 'a', 'r', 'm', or 'q'.");
                State::AwaitingCommand
            }
        };

        Ok(next)
    }

    fn report_graceful(&mut self, entry: &CatalogEntry, result: &KillResult) {
        let target = format!("{} (PID: {})", entry.process_name, entry.pid);
        match result {
            KillResult::Success => self
                .presenter
                .success(&format!("Successfully terminated process {target}")),
            KillResult::NotFound => self.presenter.error(&format!("Process {target} not found")),
            KillResult::PermissionDenied => self.presenter.error(&format!(
                "Access denied when trying to kill process {target}"
            )),
            KillResult::Error(msg) => self
                .presenter
                .error(&format!("Error killing process {target}: {msg}")),
        }
    }

    fn kill_one(&mut self, entry: &CatalogEntry) -> Result<State> {
        let result = self.terminator.terminate_graceful(entry.pid);
        self.report_graceful(entry, &result);

        // A vanished process cannot be force killed either
        if !result.is_success() && result != KillResult::NotFound {
            match self.confirm("Try force kill? (y/N): ")? {
                None => return Ok(self.exit()),
                Some(true) => {
                    let target = format!("{} (PID: {})", entry.process_name, entry.pid);
                    match self.terminator.terminate_force(entry.pid) {
                        KillResult::Success => self
                            .presenter
                            .warning(&format!("Force killed process {target}")),
                        other => self.presenter.error(&format!(
                            "Force kill of process {target} failed: {}",
                            other.description()
                        )),
                    }
                }
                Some(false) => self.presenter.info("Cancelled"),
            }
        }

        Ok(State::Refreshing)
    }

    /// SIGTERM every listed process once, however many ports it holds
    fn kill_all(&mut self) -> State {
        let mut seen = HashSet::new();
        let targets: Vec<CatalogEntry> = self
            .catalog
            .entries()
            .iter()
            .filter(|entry| seen.insert(entry.pid))
            .cloned()
            .collect();

        let total = targets.len();
        let mut killed = 0;

        for entry in &targets {
            let result = self.terminator.terminate_graceful(entry.pid);
            self.report_graceful(entry, &result);
            if result.is_success() {
                killed += 1;
            }
        }

        self.presenter
            .success(&format!("Killed {killed}/{total} processes"));
        State::Exiting
    }

    fn report_health(&mut self) -> State {
        match build_health_report(
            self.inspector,
            &self.health.matcher,
            self.health.classifier.as_ref(),
            self.health.top_n,
        ) {
            Ok(report) => self.presenter.render_health(&report),
            Err(e) => self.presenter.error(&format!("{e:#}")),
        }
        State::AwaitingCommand
    }
}
