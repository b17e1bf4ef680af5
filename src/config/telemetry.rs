use tracing::{debug, info};

use super::{LauncherConfig, SYSTEM_CONFIG_PATH};

pub fn log_defaults(path: &std::path::Path) {
    debug!(
        target: "level_launcher::config",
        path = %path.display(),
        default = SYSTEM_CONFIG_PATH,
        "No configuration file present; using built-in defaults"
    );
}

pub fn log_loaded(config: &LauncherConfig) {
    info!(
        target: "level_launcher::config",
        path = %config.source_path.display(),
        from_file = config.from_file,
        child_path = %config.child.path,
        child_locale = %config.child.locale,
        child_home = %config.child.home.display(),
        "Configuration loaded"
    );
}
