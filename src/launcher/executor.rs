use std::{
    io,
    os::unix::process::ExitStatusExt,
    process::ExitStatus,
};

use tracing::{info, warn};

use crate::lib::{
    command::{build_child_command, ChildCommandConfig},
    errors::{LaunchError, LaunchFailure, UntrustedFile},
    fs as trust,
};

use super::{CommandSpec, Elevated};

/// Start the target and block until it exits.
///
/// Requires an [`Elevated`] token, so nothing reaches this point without a
/// successful privilege transition.
pub async fn execute(spec: &CommandSpec, elevated: &Elevated) -> Result<ExitStatus, LaunchError> {
    preflight(spec)?;

    let mut command = build_child_command(ChildCommandConfig {
        program: spec.program(),
        args: spec.args(),
        env: spec.env(),
    });

    info!(
        target: "level_launcher::launch",
        argv = ?spec.argv(),
        uid = elevated.identity().uid,
        gid = elevated.identity().gid,
        "Executing target script"
    );

    let mut child = command.spawn().map_err(|err| spawn_failure(spec, err))?;
    let status = child.wait().await.map_err(|err| spawn_failure(spec, err))?;

    if !status.success() {
        warn!(
            target: "level_launcher::launch",
            exit_code = status.code(),
            signal = status.signal(),
            "Target script exited unsuccessfully"
        );
    }
    Ok(status)
}

/// Map the child's status onto the launcher's own exit code.
///
/// Normal exits are mirrored; death by signal N becomes `128 + N`.
pub fn exit_code_for(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return (code & 0xff) as u8;
    }
    match status.signal() {
        Some(signal) => 128u8.saturating_add((signal & 0x7f) as u8),
        None => 1,
    }
}

fn preflight(spec: &CommandSpec) -> Result<(), LaunchError> {
    let path = spec.program();
    let fail = |reason| LaunchError::LaunchFailed {
        path: path.clone(),
        reason,
    };

    match trust::ensure_executable(path) {
        Ok(()) => {}
        Err(UntrustedFile::Metadata(err)) if err.kind() == io::ErrorKind::NotFound => {
            return Err(fail(LaunchFailure::NotFound));
        }
        Err(err) => return Err(fail(LaunchFailure::NotExecutable(err))),
    }

    trust::ensure_trusted_file(path, &trust::trusted_owners())
        .map_err(|err| fail(LaunchFailure::Untrusted(err)))
}

fn spawn_failure(spec: &CommandSpec, err: io::Error) -> LaunchError {
    let reason = if err.kind() == io::ErrorKind::NotFound {
        LaunchFailure::NotFound
    } else {
        LaunchFailure::Spawn(err)
    };
    LaunchError::LaunchFailed {
        path: spec.program().clone(),
        reason,
    }
}
