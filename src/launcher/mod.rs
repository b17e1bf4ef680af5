//! Validate a level, assume the target identity, and run the start script.
//!
//! The flow is linear: `parse_level` → `elevate_privileges` → `build_command`
//! → `execute`. Each step takes the previous step's output by type, so no
//! path reaches `execute` without a validated request and an [`Elevated`]
//! token.
mod command;
mod executor;
mod exit;
mod privilege;
mod request;

use std::process::ExitStatus;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::lib::{errors::LaunchError, telemetry::LaunchSpan};

pub use command::{build_command, CommandSpec, LaunchPolicy, TARGET_SCRIPT};
pub use executor::{execute, exit_code_for};
pub use exit::LaunchExit;
pub use privilege::{
    elevate_privileges, Credentials, Elevated, Identity, PrivilegeBackend, SystemPrivileges,
};
pub use request::{parse_level, LaunchRequest, Level, ALLOWED_LEVELS, DEFAULT_LEVEL};

/// Result of a completed child run.
#[derive(Debug)]
pub struct LaunchOutcome {
    pub launch_id: Uuid,
    pub status: ExitStatus,
    pub exit_code: u8,
}

/// Runs validated requests under a fixed policy.
pub struct Launcher<B> {
    policy: LaunchPolicy,
    backend: B,
}

impl<B: PrivilegeBackend> Launcher<B> {
    pub fn new(policy: LaunchPolicy, backend: B) -> Self {
        Self { policy, backend }
    }

    pub fn policy(&self) -> &LaunchPolicy {
        &self.policy
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Elevate, build the command, run it and wait for it.
    pub async fn run(&self, request: LaunchRequest) -> Result<LaunchOutcome, LaunchError> {
        let span = LaunchSpan::start(request.level().as_str());
        let result = {
            let _entered = span.span().enter();
            elevate_privileges(&self.backend, self.policy.identity(), &request)
                .map(|elevated| (elevated, build_command(request, &self.policy)))
        };
        let (elevated, spec) = match result {
            Ok(pair) => pair,
            Err(err) => {
                span.finish("failed", None);
                return Err(err);
            }
        };

        match execute(&spec, &elevated)
            .instrument(span.span().clone())
            .await
        {
            Ok(status) => {
                let exit_code = exit_code_for(status);
                let launch_id = span.launch_id();
                span.finish(
                    if status.success() {
                        "succeeded"
                    } else {
                        "child_failed"
                    },
                    Some(i32::from(exit_code)),
                );
                Ok(LaunchOutcome {
                    launch_id,
                    status,
                    exit_code,
                })
            }
            Err(err) => {
                span.finish("failed", None);
                Err(err)
            }
        }
    }
}

/// What `--dry-run` prints: the command that would run, without running it.
#[derive(Debug, Serialize)]
pub struct DryRunPlan {
    pub level: &'static str,
    pub level_defaulted: bool,
    pub identity: Identity,
    pub argv: Vec<String>,
    pub env: std::collections::BTreeMap<String, String>,
}

impl DryRunPlan {
    pub fn new(request: LaunchRequest, policy: &LaunchPolicy) -> Self {
        let level = request.level().as_str();
        let level_defaulted = request.is_defaulted();
        let spec = build_command(request, policy);
        Self {
            level,
            level_defaulted,
            identity: policy.identity(),
            argv: spec.argv(),
            env: spec.env().clone(),
        }
    }
}
