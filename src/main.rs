//! Entry point for Level Launcher.
use std::process::ExitCode;

use level_launcher::{
    cli::{self, CliOutput},
    config::LauncherConfig,
    launcher::{LaunchExit, LaunchPolicy, Launcher, SystemPrivileges},
    lib::telemetry,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(code) => ExitCode::from(code),
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<u8, LaunchExit> {
    telemetry::init_tracing().map_err(LaunchExit::from_error)?;

    let output = cli::run(std::env::args_os(), || {
        let config = LauncherConfig::load_system()?;
        Ok(Launcher::new(LaunchPolicy::system(&config), SystemPrivileges))
    })
    .await?;

    if let CliOutput::Stdout(text) = &output {
        print!("{text}");
    }
    Ok(output.exit_code())
}
