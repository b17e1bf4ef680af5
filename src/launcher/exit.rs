use std::process::ExitCode;

use anyhow::Error;

use crate::lib::errors::{ErrorReport, LaunchError};

/// Exit code of an unexpected internal failure (sysexits `EX_SOFTWARE`).
const EXIT_INTERNAL: u8 = 70;

/// Bundles a launcher failure message with an exit code and optional structured report.
#[derive(Debug)]
pub struct LaunchExit {
    message: String,
    exit_code: u8,
    report: Option<ErrorReport>,
}

impl LaunchExit {
    pub fn from_launch_error(err: LaunchError) -> Self {
        Self {
            message: err.to_string(),
            exit_code: err.exit_code(),
            report: Some(err.report()),
        }
    }

    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:?}"),
            exit_code: EXIT_INTERNAL,
            report: None,
        }
    }

    /// Write the diagnostic to stderr and return the process exit code.
    pub fn report(self) -> ExitCode {
        if let Some(report) = self.report {
            if let Ok(serialized) = serde_json::to_string(&report) {
                eprintln!("{serialized}");
            } else {
                eprintln!("{}", self.message);
            }
        } else {
            eprintln!("{}", self.message);
        }
        ExitCode::from(self.exit_code)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn error_report(&self) -> Option<&ErrorReport> {
        self.report.as_ref()
    }
}

impl From<LaunchError> for LaunchExit {
    fn from(err: LaunchError) -> Self {
        Self::from_launch_error(err)
    }
}
