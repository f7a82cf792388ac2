#![forbid(unsafe_code)]

//! Replays a session script against in-memory collaborators and prints the
//! notification trace and its checksum.
//!
//! ```sh
//! cargo run -p formwatch-harness -- crates/formwatch-harness/scripts/demo.json
//! RUST_LOG=formwatch_core=debug cargo run -p formwatch-harness -- --json demo.json
//! ```

mod cli;

use std::process::ExitCode;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Command, HELP_TEXT, Opts, VERSION};
use formwatch_harness::{Report, Script, replay};

#[derive(Serialize)]
struct JsonReport<'a> {
    checksum: String,
    final_state: &'a str,
    trace: Vec<String>,
    violations: &'a [String],
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &Report, json: bool) -> Result<(), serde_json::Error> {
    if json {
        let out = JsonReport {
            checksum: format!("{:016x}", report.checksum),
            final_state: report.final_state.as_str(),
            trace: report.lines(),
            violations: &report.violations,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in report.lines() {
            println!("{line}");
        }
        println!("state: {}", report.final_state);
        println!("checksum: {:016x}", report.checksum);
        for violation in &report.violations {
            println!("violation: {violation}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let opts = match Opts::parse() {
        Ok(Command::Run(opts)) => opts,
        Ok(Command::Help) => {
            println!("{HELP_TEXT}");
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version) => {
            println!("formwatch-harness {VERSION}");
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("Run with --help for usage information.");
            return ExitCode::FAILURE;
        }
    };
    init_tracing();

    let Some(path) = opts.script else {
        eprintln!("No script given.");
        eprintln!("Run with --help for usage information.");
        return ExitCode::FAILURE;
    };

    let report = match Script::load(&path).and_then(|script| replay(&script)) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "replay failed");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = print_report(&report, opts.json) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }
    if opts.check && !report.violations.is_empty() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
