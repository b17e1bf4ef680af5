use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::lib::{errors::ConfigError, paths};

pub const DEFAULT_CHILD_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";
pub const DEFAULT_CHILD_LOCALE: &str = "C";
pub const DEFAULT_CHILD_HOME: &str = "/root";
const MAX_LOCALE_LEN: usize = 32;

/// Environment handed to the target script. Nothing else crosses `env_clear`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEnvironment {
    pub path: String,
    pub locale: String,
    pub home: PathBuf,
}

impl Default for ChildEnvironment {
    fn default() -> Self {
        Self {
            path: DEFAULT_CHILD_PATH.to_string(),
            locale: DEFAULT_CHILD_LOCALE.to_string(),
            home: PathBuf::from(DEFAULT_CHILD_HOME),
        }
    }
}

impl ChildEnvironment {
    /// Render as the explicit variable map passed to the child.
    pub fn to_env_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("HOME".to_string(), self.home.to_string_lossy().into_owned()),
            ("LC_ALL".to_string(), self.locale.clone()),
            ("PATH".to_string(), self.path.clone()),
        ])
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawChildSection {
    pub path: Option<String>,
    pub locale: Option<String>,
    pub home: Option<PathBuf>,
}

pub fn parse_child_section(
    raw: Option<RawChildSection>,
    path: &Path,
) -> Result<ChildEnvironment, ConfigError> {
    let raw = raw.unwrap_or_default();
    let defaults = ChildEnvironment::default();

    let search_path = raw.path.unwrap_or(defaults.path);
    if !paths::is_absolute_search_path(&search_path) {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "child.path",
            message: "Every PATH entry must be a non-empty absolute directory".into(),
        });
    }

    let locale = raw.locale.unwrap_or(defaults.locale);
    validate_locale(&locale, path)?;

    let home = raw.home.unwrap_or(defaults.home);
    if !paths::is_nonempty_absolute(&home) {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "child.home",
            message: "Use an absolute directory".into(),
        });
    }

    Ok(ChildEnvironment {
        path: search_path,
        locale,
        home,
    })
}

fn validate_locale(locale: &str, path: &Path) -> Result<(), ConfigError> {
    let well_formed = !locale.is_empty()
        && locale.len() <= MAX_LOCALE_LEN
        && locale
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'));
    if well_formed {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "child.locale",
        message: format!("Use up to {MAX_LOCALE_LEN} characters from [A-Za-z0-9._@-]"),
    })
}
