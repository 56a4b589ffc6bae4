// Vampire Hunter - Main entry point

use std::io;
use std::process;
use vampire_hunter::config::{Args, Config};
use vampire_hunter::inspect;
use vampire_hunter::killer::SignalTerminator;
use vampire_hunter::session::{HealthSettings, Presenter, Session, TerminalPresenter};

/// Setup logging on stderr; operator output goes through the presenter
fn setup_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_secs()
        .init();
}

fn main() {
    // -h/--help and unknown arguments are handled by clap before any scan
    let args = Args::parse_args();

    let config = match Config::from_args(args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            eprintln!("Use --help for usage information");
            process::exit(1);
        }
    };

    setup_logging(config.debug);

    if !config.color {
        colored::control::set_override(false);
    }

    let mut presenter = TerminalPresenter::new();

    let inspector = inspect::inspector_for(config.backend);
    if let Err(e) = inspector.check_preconditions() {
        for missing in &e.missing {
            presenter.error(&format!("{missing} not found. It is required to inspect processes."));
        }
        process::exit(1);
    }
    log::debug!("Using {:?} backend", config.backend);

    // Ctrl-C at a prompt ends the session like end of input does
    if let Err(e) = ctrlc::set_handler(|| {
        println!();
        TerminalPresenter::new().info("Exiting...");
        process::exit(0);
    }) {
        log::warn!("Failed to install interrupt handler: {e}");
    }

    presenter.banner();

    let terminator = SignalTerminator::new();
    let stdin = io::stdin();
    let mut session = Session::new(
        inspector.as_ref(),
        &terminator,
        &mut presenter,
        stdin.lock(),
        HealthSettings::from_config(&config),
    );

    if let Err(e) = session.run() {
        eprintln!("Fatal error: {e:#}");
        process::exit(1);
    }
}
