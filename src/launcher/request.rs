use std::{ffi::OsStr, fmt};

use crate::lib::errors::LaunchError;

/// Closed set of levels the start script accepts. Changing it requires a rebuild.
pub const ALLOWED_LEVELS: &[&str] = &["0", "1", "2", "3", "4", "5"];
/// Level used when the caller passes no argument.
pub const DEFAULT_LEVEL: &str = "3";
const MAX_REPORTED_CANDIDATE_CHARS: usize = 32;

/// A level that is known to be in [`ALLOWED_LEVELS`].
///
/// The wrapped string is the allow-list entry itself, so no caller-supplied
/// bytes survive validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level(&'static str);

impl Level {
    /// Exact, byte-for-byte lookup in the allow-list.
    pub fn lookup(candidate: &str) -> Option<Self> {
        ALLOWED_LEVELS
            .iter()
            .copied()
            .find(|allowed| *allowed == candidate)
            .map(Level)
    }

    pub fn default_level() -> Self {
        Level(DEFAULT_LEVEL)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Validated input for one launcher invocation. Consumed by `build_command`.
#[derive(Debug, PartialEq, Eq)]
pub struct LaunchRequest {
    level: Level,
    defaulted: bool,
}

impl LaunchRequest {
    pub fn level(&self) -> Level {
        self.level
    }

    /// True when the caller omitted the level.
    pub fn is_defaulted(&self) -> bool {
        self.defaulted
    }

    pub(crate) fn into_level(self) -> Level {
        self.level
    }
}

/// Turn the optional positional argument into a [`LaunchRequest`].
///
/// Anything that is not exactly an allow-list entry is `InvalidLevel`,
/// including non-UTF-8 input, surrounding whitespace, signs and leading zeros.
pub fn parse_level(candidate: Option<&OsStr>) -> Result<LaunchRequest, LaunchError> {
    let Some(raw) = candidate else {
        return Ok(LaunchRequest {
            level: Level::default_level(),
            defaulted: true,
        });
    };

    raw.to_str()
        .and_then(Level::lookup)
        .map(|level| LaunchRequest {
            level,
            defaulted: false,
        })
        .ok_or_else(|| LaunchError::InvalidLevel {
            candidate: render_candidate(raw),
        })
}

fn render_candidate(raw: &OsStr) -> String {
    let lossy = raw.to_string_lossy();
    let mut rendered: String = lossy.chars().take(MAX_REPORTED_CANDIDATE_CHARS).collect();
    if lossy.chars().count() > MAX_REPORTED_CANDIDATE_CHARS {
        rendered.push_str("...");
    }
    rendered
}
