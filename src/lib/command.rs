//! Shared helpers for building the child process command.

use std::{collections::BTreeMap, path::Path, process::Stdio};

use tokio::process::Command;

pub struct ChildCommandConfig<'a> {
    pub program: &'a Path,
    pub args: &'a [String],
    pub env: &'a BTreeMap<String, String>,
}

/// Build a process command from a structured argument vector.
///
/// Each argument is passed to `execve` as its own element, so no shell ever
/// sees the values. The ambient environment is cleared and replaced by
/// `config.env`; stdio and the working directory are inherited.
pub fn build_child_command(config: ChildCommandConfig<'_>) -> Command {
    let mut command = Command::new(config.program);
    command.env_clear();
    for (key, value) in config.env {
        command.env(key, value);
    }
    command.args(config.args);
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    command
}
