use std::{io, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors that can occur while loading or validating the system configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration file.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize TOML into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// File ownership or mode would let a non-root user influence the launcher.
    #[error("Configuration file {path} is not trusted: {reason}")]
    Untrusted { path: PathBuf, reason: UntrustedFile },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Reasons a file is refused by the trust checks in [`crate::lib::fs`].
#[derive(Debug, Error)]
pub enum UntrustedFile {
    #[error("metadata unavailable: {0}")]
    Metadata(#[source] io::Error),
    #[error("not a regular file")]
    NotRegularFile,
    #[error("owned by uid {owner}, expected one of {allowed:?}")]
    Owner { owner: u32, allowed: Vec<u32> },
    #[error("writable by group or others (mode {mode:o})")]
    Writable { mode: u32 },
    #[error("no execute permission (mode {mode:o})")]
    NotExecutable { mode: u32 },
    #[error("parent directory {} is owned by uid {owner}", .path.display())]
    DirectoryOwner { path: PathBuf, owner: u32 },
    #[error("parent directory {} is writable by group or others (mode {mode:o})", .path.display())]
    WritableDirectory { path: PathBuf, mode: u32 },
}

/// Which privilege primitive failed during elevation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationStep {
    DropGroups,
    SetGid,
    SetUid,
    Verify,
}

impl ElevationStep {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ElevationStep::DropGroups => "setgroups",
            ElevationStep::SetGid => "setgid",
            ElevationStep::SetUid => "setuid",
            ElevationStep::Verify => "verify",
        }
    }
}

/// Why the target script could not be started.
#[derive(Debug, Error)]
pub enum LaunchFailure {
    #[error("target does not exist")]
    NotFound,
    #[error("target path is not absolute")]
    RelativeTarget,
    #[error("target is not executable: {0}")]
    NotExecutable(#[source] UntrustedFile),
    #[error("target is not trusted: {0}")]
    Untrusted(#[source] UntrustedFile),
    #[error("spawn failed: {0}")]
    Spawn(#[source] io::Error),
}

/// Stage of the launch flow where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStage {
    Usage,
    Validate,
    Configure,
    Elevate,
    Execute,
}

impl LaunchStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LaunchStage::Usage => "usage",
            LaunchStage::Validate => "validate",
            LaunchStage::Configure => "configure",
            LaunchStage::Elevate => "elevate",
            LaunchStage::Execute => "execute",
        }
    }

    /// True when the stage runs before any privileged action.
    pub const fn before_privileged_action(&self) -> bool {
        matches!(
            self,
            LaunchStage::Usage | LaunchStage::Validate | LaunchStage::Configure
        )
    }
}

pub const EXIT_USAGE: u8 = 64;
pub const EXIT_INVALID_LEVEL: u8 = 65;
pub const EXIT_PRIVILEGE: u8 = 77;
pub const EXIT_CONFIG: u8 = 78;
pub const EXIT_NOT_EXECUTABLE: u8 = 126;
pub const EXIT_NOT_FOUND: u8 = 127;

/// Terminal failures of a single launcher invocation. None of them are retried.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invalid command line: {message}")]
    Usage { message: String },
    #[error("level {candidate:?} is not one of the allowed levels")]
    InvalidLevel { candidate: String },
    #[error(transparent)]
    ConfigRejected(#[from] ConfigError),
    #[error("privilege escalation failed at {}: {source}", .step.as_str())]
    PrivilegeEscalationFailed {
        step: ElevationStep,
        #[source]
        source: io::Error,
    },
    #[error("failed to launch {path}: {reason}")]
    LaunchFailed {
        path: PathBuf,
        #[source]
        reason: LaunchFailure,
    },
}

impl LaunchError {
    pub fn stage(&self) -> LaunchStage {
        match self {
            LaunchError::Usage { .. } => LaunchStage::Usage,
            LaunchError::InvalidLevel { .. } => LaunchStage::Validate,
            LaunchError::ConfigRejected(_) => LaunchStage::Configure,
            LaunchError::PrivilegeEscalationFailed { .. } => LaunchStage::Elevate,
            LaunchError::LaunchFailed { .. } => LaunchStage::Execute,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::Usage { .. } => EXIT_USAGE,
            LaunchError::InvalidLevel { .. } => EXIT_INVALID_LEVEL,
            LaunchError::ConfigRejected(_) => EXIT_CONFIG,
            LaunchError::PrivilegeEscalationFailed { .. } => EXIT_PRIVILEGE,
            LaunchError::LaunchFailed {
                reason: LaunchFailure::NotFound,
                ..
            } => EXIT_NOT_FOUND,
            LaunchError::LaunchFailed { .. } => EXIT_NOT_EXECUTABLE,
        }
    }

    pub fn descriptor(&self) -> &'static ErrorDescriptor {
        match self {
            LaunchError::Usage { .. } => &USAGE_ERROR,
            LaunchError::InvalidLevel { .. } => &INVALID_LEVEL_ERROR,
            LaunchError::ConfigRejected(_) => &CONFIG_REJECTED_ERROR,
            LaunchError::PrivilegeEscalationFailed { .. } => &PRIVILEGE_ESCALATION_ERROR,
            LaunchError::LaunchFailed { .. } => &LAUNCH_FAILED_ERROR,
        }
    }

    /// Build the structured report written to stderr.
    pub fn report(&self) -> ErrorReport {
        let mut builder = self
            .descriptor()
            .builder()
            .stage(self.stage())
            .with_exit_code_value(self.exit_code())
            .with_context_field("reason", Value::String(self.to_string()));
        match self {
            LaunchError::InvalidLevel { candidate } => {
                builder = builder.with_context_field("candidate", Value::String(candidate.clone()));
            }
            LaunchError::PrivilegeEscalationFailed { step, source } => {
                builder = builder
                    .with_context_field("step", Value::String(step.as_str().into()))
                    .with_context_field(
                        "errno",
                        source
                            .raw_os_error()
                            .map(|code| Value::Number(Number::from(code)))
                            .unwrap_or(Value::Null),
                    );
            }
            LaunchError::LaunchFailed { path, .. } => {
                builder = builder
                    .with_context_field("path", Value::String(path.to_string_lossy().into()));
            }
            LaunchError::Usage { .. } | LaunchError::ConfigRejected(_) => {}
        }
        builder.build()
    }
}

/// Static code, message and remediation for each failure kind.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDescriptor {
    pub code: &'static str,
    pub message: &'static str,
    pub remediation: &'static str,
}

impl ErrorDescriptor {
    pub const fn new(code: &'static str, message: &'static str, remediation: &'static str) -> Self {
        Self {
            code,
            message,
            remediation,
        }
    }

    pub fn builder(&self) -> ErrorReportBuilder<'_> {
        ErrorReportBuilder::new(self)
    }
}

/// One-line JSON diagnostic describing which stage failed.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub stage: LaunchStage,
    pub message: &'static str,
    pub remediation: &'static str,
    pub retryable: bool,
    pub exit_code: u8,
    pub before_privileged_action: bool,
    pub details: Map<String, Value>,
}

pub struct ErrorReportBuilder<'a> {
    descriptor: &'a ErrorDescriptor,
    stage: LaunchStage,
    exit_code: u8,
    details: Map<String, Value>,
}

impl<'a> ErrorReportBuilder<'a> {
    pub fn new(descriptor: &'a ErrorDescriptor) -> Self {
        Self {
            descriptor,
            stage: LaunchStage::Usage,
            exit_code: 1,
            details: Map::new(),
        }
    }

    pub fn stage(mut self, stage: LaunchStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_context_field(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }

    pub fn with_exit_code_value(mut self, exit_code: u8) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn build(self) -> ErrorReport {
        ErrorReport {
            code: self.descriptor.code,
            stage: self.stage,
            message: self.descriptor.message,
            remediation: self.descriptor.remediation,
            retryable: false,
            exit_code: self.exit_code,
            before_privileged_action: self.stage.before_privileged_action(),
            details: self.details,
        }
    }
}

pub const USAGE_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "usage",
    "The command line could not be parsed",
    "Invoke as `level-launcher [--dry-run] [LEVEL]` with at most one level.",
);

pub const INVALID_LEVEL_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "invalid_level",
    "The requested level is not in the allow-list",
    "Pass one of the allowed levels (0-5) or omit the argument to use the default.",
);

pub const CONFIG_REJECTED_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "config_rejected",
    "The system configuration file could not be used",
    "Make /etc/level-launcher/config.toml root-owned, not group/world-writable, and valid.",
);

pub const PRIVILEGE_ESCALATION_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "privilege_escalation_failed",
    "Could not assume the root identity",
    "Install the launcher setuid root (chown root && chmod 4755) or run it as root.",
);

pub const LAUNCH_FAILED_ERROR: ErrorDescriptor = ErrorDescriptor::new(
    "launch_failed",
    "The target script could not be started",
    "Check that the start script exists, is executable, and is writable only by its owner.",
);
