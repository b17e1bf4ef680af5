//! Shared helpers reused across modules (e.g., path validation).

use std::path::Path;

/// Returns true if the path is non-empty and absolute.
pub fn is_nonempty_absolute(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_absolute()
}

/// Returns true if every `:`-separated entry of a `PATH` value is a non-empty absolute path.
pub fn is_absolute_search_path(value: &str) -> bool {
    !value.is_empty()
        && value
            .split(':')
            .all(|entry| is_nonempty_absolute(Path::new(entry)))
}
