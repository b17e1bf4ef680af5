use std::{collections::BTreeMap, path::PathBuf};

use serde::Serialize;

use crate::{
    config::{ChildEnvironment, LauncherConfig},
    lib::{
        errors::{LaunchError, LaunchFailure},
        paths,
    },
};

use super::{Identity, LaunchRequest};

/// Absolute path of the start script. Not configurable.
pub const TARGET_SCRIPT: &str = "/usr/local/lib/level-launcher/start.sh";

/// Everything about a launch that the caller cannot influence.
#[derive(Debug, Clone)]
pub struct LaunchPolicy {
    target: PathBuf,
    identity: Identity,
    child_env: ChildEnvironment,
}

impl LaunchPolicy {
    /// Policy used by the installed binary.
    pub fn system(config: &LauncherConfig) -> Self {
        Self {
            target: PathBuf::from(TARGET_SCRIPT),
            identity: Identity::ROOT,
            child_env: config.child.clone(),
        }
    }

    /// Policy for an alternative target, e.g. a fixture script under test.
    pub fn new(
        target: PathBuf,
        identity: Identity,
        child_env: ChildEnvironment,
    ) -> Result<Self, LaunchError> {
        if !paths::is_nonempty_absolute(&target) {
            return Err(LaunchError::LaunchFailed {
                path: target,
                reason: LaunchFailure::RelativeTarget,
            });
        }
        Ok(Self {
            target,
            identity,
            child_env,
        })
    }

    pub fn target(&self) -> &PathBuf {
        &self.target
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn child_env(&self) -> &ChildEnvironment {
        &self.child_env
    }
}

/// Structured argument vector and environment for the child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// `[program, args...]` as the child will see it in `argv`.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Build `[target, level]`. Pure; consumes the request.
pub fn build_command(request: LaunchRequest, policy: &LaunchPolicy) -> CommandSpec {
    let level = request.into_level();
    CommandSpec {
        program: policy.target().clone(),
        args: vec![level.as_str().to_string()],
        env: policy.child_env().to_env_map(),
    }
}
