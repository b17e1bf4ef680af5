//! CLI argument definitions and `ParsedCommand` construction.
use std::ffi::OsString;

use clap::Parser;

use crate::{
    launcher::{parse_level, LaunchRequest},
    lib::errors::LaunchError,
};

/// Parsed command intent from CLI.
#[derive(Debug)]
pub enum ParsedCommand {
    /// Elevate and run the start script.
    Launch(LaunchRequest),
    /// Print the command that would run, without elevating.
    DryRun(LaunchRequest),
    /// `--help` / `--version` text, printed to stdout.
    Info(String),
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "level-launcher",
    version,
    about = "Run the start script as root with a validated level",
    long_about = "Run /usr/local/lib/level-launcher/start.sh as root with a single validated level.\n\nAllowed levels are 0-5; the default is 3. Any other value is rejected before privileges change.",
    after_help = "Hint: use `level-launcher --dry-run <LEVEL>` to print the planned command without running it."
)]
pub struct LauncherArgs {
    /// Level passed to the start script (0-5, default 3).
    #[arg(value_name = "LEVEL")]
    pub level: Option<OsString>,
    /// Validate and print the planned command as JSON; never elevates.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl LauncherArgs {
    /// Validate the level and pick the command mode.
    pub fn into_command(self) -> Result<ParsedCommand, LaunchError> {
        let request = parse_level(self.level.as_deref())?;
        if self.dry_run {
            Ok(ParsedCommand::DryRun(request))
        } else {
            Ok(ParsedCommand::Launch(request))
        }
    }
}

/// Parse a full argument list (including the program name).
///
/// Help and version requests become [`ParsedCommand::Info`]; every other clap
/// error is a `Usage` failure rather than clap's own exit path.
pub fn parse_command<I, T>(args: I) -> Result<ParsedCommand, LaunchError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match LauncherArgs::try_parse_from(args) {
        Ok(parsed) => parsed.into_command(),
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            Ok(ParsedCommand::Info(err.to_string()))
        }
        Err(err) => Err(LaunchError::Usage {
            message: summarize_clap_error(&err),
        }),
    }
}

fn summarize_clap_error(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "unrecognized arguments".to_string())
}
