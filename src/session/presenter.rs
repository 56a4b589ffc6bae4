// Operator-facing output

use crate::catalog::{format_memory, Catalog, HealthReport, ProcessClass};
use crate::inspect::MemoryStatus;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use std::io::{self, Write};

const NAME_WIDTH: usize = 15;
const PORT_WIDTH: usize = 15;
const COMMAND_WIDTH: usize = 50;

/// Everything the session shows to the operator goes through here
pub trait Presenter {
    fn banner(&mut self);
    fn info(&mut self, message: &str);
    fn success(&mut self, message: &str);
    fn warning(&mut self, message: &str);
    fn error(&mut self, message: &str);
    fn render_catalog(&mut self, catalog: &Catalog);
    fn render_health(&mut self, report: &HealthReport);
    fn render_menu(&mut self, entry_count: usize);
    /// Show a question and leave the cursor on the same line
    fn prompt(&mut self, question: &str);
}

/// Cut `s` to `max_chars` characters, display only
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

fn truncate_command(s: &str) -> String {
    if s.chars().count() <= COMMAND_WIDTH {
        return s.to_string();
    }
    format!("{}...", truncate(s, COMMAND_WIDTH))
}

fn header(titles: &[&str]) -> Row {
    Row::new(titles.iter().map(|t| Cell::new(t)).collect())
}

/// Build the process table shown after every scan
pub fn catalog_table(catalog: &Catalog) -> Table {
    let mut table = Table::new();
    table.set_titles(header(&["ID", "PID", "Name", "Port", "Memory", "Command"]));

    for entry in catalog.entries() {
        table.add_row(Row::new(vec![
            Cell::new(&entry.display_index.to_string()),
            Cell::new(&entry.pid.to_string()),
            Cell::new(&truncate(&entry.process_name, NAME_WIDTH)),
            Cell::new(&truncate(&entry.port, PORT_WIDTH)),
            Cell::new(&entry.memory_formatted),
            Cell::new(&truncate_command(&entry.command_details)),
        ]));
    }

    table
}

fn health_tables(report: &HealthReport) -> (Option<Table>, Table) {
    let memory = match report.memory {
        MemoryStatus::Supported(stats) => {
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
            table.set_titles(header(&["Free", "Active", "Inactive", "Wired", "Compressed"]));
            table.add_row(Row::new(
                [
                    stats.free_mb,
                    stats.active_mb,
                    stats.inactive_mb,
                    stats.wired_mb,
                    stats.compressed_mb,
                ]
                .iter()
                .map(|mb| Cell::new(&format!("{mb} MB")))
                .collect(),
            ));
            Some(table)
        }
        MemoryStatus::Unsupported => None,
    };

    let mut top = Table::new();
    top.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    top.set_titles(header(&["#", "PID", "Class", "Memory", "Command"]));
    for (rank, process) in report.top().iter().enumerate() {
        top.add_row(Row::new(vec![
            Cell::new(&(rank + 1).to_string()),
            Cell::new(&process.sample.pid.to_string()),
            Cell::new(&process.class.to_string()),
            Cell::new(&format_memory(process.sample.resident_memory_kb)),
            Cell::new(&truncate_command(&process.sample.command)),
        ]));
    }

    (memory, top)
}

/// Colored text on stdout, errors on stderr
#[derive(Debug, Default)]
pub struct TerminalPresenter;

impl TerminalPresenter {
    pub const fn new() -> Self {
        Self
    }
}

impl Presenter for TerminalPresenter {
    fn banner(&mut self) {
        println!("{}", "🧛 Vampire Hunter - Process Manager".green());
        println!("{}", "=".repeat(38));
        println!();
    }

    fn info(&mut self, message: &str) {
        println!("{}", format!("🔹 {message}").blue());
    }

    fn success(&mut self, message: &str) {
        println!("{}", format!("✅ {message}").green());
    }

    fn warning(&mut self, message: &str) {
        println!("{}", format!("⚠️  {message}").yellow());
    }

    fn error(&mut self, message: &str) {
        eprintln!("{}", format!("❌ {message}").red());
    }

    fn render_catalog(&mut self, catalog: &Catalog) {
        print!("{}", catalog_table(catalog));
        println!();
    }

    fn render_health(&mut self, report: &HealthReport) {
        let (memory, top) = health_tables(report);

        println!();
        println!("{}", "System memory".cyan().bold());
        match memory {
            Some(table) => print!("{table}"),
            None => self.warning("Paging statistics are not supported on this platform"),
        }

        let (dev_count, dev_kb) = report.class_totals(ProcessClass::Development);
        let (sys_count, sys_kb) = report.class_totals(ProcessClass::System);

        println!();
        println!("{}", "Runtime processes".cyan().bold());
        println!(
            "  {} process(es), {} total; development: {} ({}), system: {} ({})",
            report.processes.len(),
            format_memory(report.total_kb()),
            dev_count,
            format_memory(dev_kb),
            sys_count,
            format_memory(sys_kb),
        );
        println!("  Classification is a command-line heuristic, not authoritative.");

        if report.processes.is_empty() {
            return;
        }

        println!();
        println!(
            "{}",
            format!("Top {} by memory", report.top().len()).cyan().bold()
        );
        print!("{top}");
    }

    fn render_menu(&mut self, _entry_count: usize) {
        println!();
        println!("Select action:");
        println!("  Enter number to kill a specific process");
        println!("  'a' to kill ALL processes");
        println!("  'r' to refresh the list");
        println!("  'm' to show memory health");
        println!("  'q' to quit");
    }

    fn prompt(&mut self, question: &str) {
        print!("{question}");
        if let Err(e) = io::stdout().flush() {
            log::debug!("Failed to flush stdout: {e}");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_based() {
        assert_eq!(truncate("short", 15), "short");
        assert_eq!(truncate("a-very-long-process-name", 15), "a-very-long-pro");
        assert_eq!(truncate("ünïcödé-ñämé-thät-is-löng", 7), "ünïcödé");
    }

    #[test]
    fn test_truncate_command_appends_ellipsis() {
        let long = "x".repeat(60);
        let shown = truncate_command(&long);
        assert_eq!(shown.chars().count(), COMMAND_WIDTH + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(truncate_command("node server.js"), "node server.js");
    }

    #[test]
    fn test_catalog_table_has_header_and_rows() {
        let table = catalog_table(&Catalog::default());
        assert_eq!(table.len(), 0);
        let rendered = table.to_string();
        assert!(rendered.contains("Memory"));
        assert!(rendered.contains("Command"));
    }
}
