#![forbid(unsafe_code)]

//! Command-line argument parsing for the replay binary.
//!
//! Parsed by hand. `FORMWATCH_SCRIPT` supplies the script path when none is
//! given on the command line.

use std::env;
use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HELP_TEXT: &str = "\
formwatch-harness: replay a form session script

USAGE:
    formwatch-harness [OPTIONS] <SCRIPT>

OPTIONS:
    --json           Print the report as JSON
    --check          Exit non-zero if the trace breaks an invariant
    --help, -h       Show this help message
    --version, -V    Show version

ENVIRONMENT VARIABLES:
    FORMWATCH_SCRIPT   Script path when <SCRIPT> is omitted
    RUST_LOG           Log filter (default: warn)";

/// Parsed command-line options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Opts {
    pub script: Option<PathBuf>,
    pub json: bool,
    pub check: bool,
}

/// What the binary should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse the process arguments.
    ///
    /// # Errors
    ///
    /// Returns a message for unknown flags or extra positional arguments.
    pub fn parse() -> Result<Command, String> {
        let env_script = env::var("FORMWATCH_SCRIPT").ok();
        Self::parse_from(env::args().skip(1), env_script)
    }

    /// Parse from an explicit argument list.
    ///
    /// # Errors
    ///
    /// See [`Opts::parse`].
    pub fn parse_from(
        args: impl IntoIterator<Item = String>,
        env_script: Option<String>,
    ) -> Result<Command, String> {
        let mut opts = Self {
            script: env_script.map(PathBuf::from),
            ..Self::default()
        };
        let mut positional = false;
        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Command::Help),
                "--version" | "-V" => return Ok(Command::Version),
                "--json" => opts.json = true,
                "--check" => opts.check = true,
                other if other.starts_with('-') => {
                    return Err(format!("Unknown argument: {other}"));
                }
                other => {
                    if positional {
                        return Err(format!("Unexpected argument: {other}"));
                    }
                    positional = true;
                    opts.script = Some(PathBuf::from(other));
                }
            }
        }
        Ok(Command::Run(opts))
    }
}
