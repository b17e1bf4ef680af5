//! Load and validate the launcher's system configuration.
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::error;

use crate::lib::{errors::ConfigError, fs as trust};

pub mod child;
pub mod telemetry;

pub use child::{
    parse_child_section, ChildEnvironment, RawChildSection, DEFAULT_CHILD_HOME,
    DEFAULT_CHILD_LOCALE, DEFAULT_CHILD_PATH,
};

/// Fixed location; callers of a setuid binary control both the environment and the flags.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/level-launcher/config.toml";

/// Top-level configuration container.
///
/// Only the child environment is configurable. The target path, target
/// identity and level allow-list are compiled in.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub child: ChildEnvironment,
    pub source_path: PathBuf,
    pub from_file: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLauncherConfig {
    child: Option<RawChildSection>,
}

impl LauncherConfig {
    /// Built-in defaults, used when no configuration file is installed.
    pub fn defaults(source_path: PathBuf) -> Self {
        Self {
            child: ChildEnvironment::default(),
            source_path,
            from_file: false,
        }
    }

    /// Load from [`SYSTEM_CONFIG_PATH`].
    pub fn load_system() -> Result<Self, ConfigError> {
        Self::load_from_path(PathBuf::from(SYSTEM_CONFIG_PATH))
    }

    /// Load configuration from a specific path; a missing file yields defaults.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            telemetry::log_defaults(&path);
            return Ok(Self::defaults(path));
        }

        trust::ensure_trusted_file(&path, &trust::trusted_owners()).map_err(|reason| {
            let error = ConfigError::Untrusted {
                path: path.clone(),
                reason,
            };
            log_failure(&path, &error, "Refusing untrusted configuration file");
            error
        })?;

        let builder = config::Config::builder().add_source(config::File::from(path.clone()));
        let document = builder.build().map_err(|err| {
            let error = ConfigError::from_read_error(path.clone(), err);
            log_failure(&path, &error, "Failed to read configuration file");
            error
        })?;

        let raw: RawLauncherConfig = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            log_failure(&path, &error, "Failed to parse configuration file");
            error
        })?;

        let config = Self::from_raw(raw, path.clone()).map_err(|err| {
            log_failure(&path, &err, "Failed to validate configuration file");
            err
        })?;

        telemetry::log_loaded(&config);
        Ok(config)
    }

    fn from_raw(raw: RawLauncherConfig, path: PathBuf) -> Result<Self, ConfigError> {
        let child = parse_child_section(raw.child, &path)?;
        Ok(Self {
            child,
            source_path: path,
            from_file: true,
        })
    }
}

fn log_failure(path: &Path, error: &ConfigError, message: &'static str) {
    error!(
        target: "level_launcher::config",
        path = %path.display(),
        reason = %error,
        "{message}"
    );
}
