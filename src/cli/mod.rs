//! CLI entrypoint module structure.
use std::ffi::OsString;

use anyhow::Result;

use crate::{
    launcher::{
        DryRunPlan, LaunchExit, LaunchOutcome, LaunchPolicy, LaunchRequest, Launcher,
        PrivilegeBackend,
    },
    lib::errors::LaunchError,
};

pub mod args;

pub use args::{parse_command, LauncherArgs, ParsedCommand};

/// What a finished invocation leaves for `main` to do.
#[derive(Debug)]
pub enum CliOutput {
    /// Text for stdout; the process exits 0.
    Stdout(String),
    /// The child ran; the process exits with its mapped code.
    Child(LaunchOutcome),
}

impl CliOutput {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliOutput::Stdout(_) => 0,
            CliOutput::Child(outcome) => outcome.exit_code,
        }
    }
}

/// Parse `args` and carry out the command.
///
/// `prepare` loads configuration and builds the launcher. It runs only after
/// the arguments validate, so a rejected level never reads the config file or
/// touches the privilege backend.
pub async fn run<I, T, B, F>(args: I, prepare: F) -> Result<CliOutput, LaunchExit>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    B: PrivilegeBackend,
    F: FnOnce() -> Result<Launcher<B>, LaunchError>,
{
    match parse_command(args)? {
        ParsedCommand::Info(text) => Ok(CliOutput::Stdout(text)),
        ParsedCommand::DryRun(request) => {
            let launcher = prepare()?;
            let payload =
                render_dry_run(request, launcher.policy()).map_err(LaunchExit::from_error)?;
            Ok(CliOutput::Stdout(format!("{payload}\n")))
        }
        ParsedCommand::Launch(request) => {
            let launcher = prepare()?;
            Ok(CliOutput::Child(launcher.run(request).await?))
        }
    }
}

/// Render the `--dry-run` payload for a validated request.
pub fn render_dry_run(request: LaunchRequest, policy: &LaunchPolicy) -> Result<String> {
    let plan = DryRunPlan::new(request, policy);
    tracing::debug!(
        target: "level_launcher::cli",
        argv = ?plan.argv,
        "Dry run; not elevating"
    );
    Ok(serde_json::to_string_pretty(&plan)?)
}
