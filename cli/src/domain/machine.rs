//! Machine domain types, constants, and remote command builders.
//!
//! This module is intentionally free of I/O, async, and external layer imports.

use serde::Serialize;
use testnode_common::LoginCredentials;

/// Account used when the provider supplies no credentials for a node.
pub const DEFAULT_USER: &str = "ubuntu";

/// Process name of the test runtime that `reset` terminates.
pub const DEFAULT_RUNTIME_PROCESS: &str = "java";

/// Prefix of every machine working directory on a node.
pub const WORKING_DIR_PREFIX: &str = "./machine_home_";

/// Removes every machine artifact in the login directory, working directories
/// of earlier machines on the same node included.
pub const REMOVE_ARTIFACTS_COMMAND: &str = "rm -rf machine*";

/// Lifecycle state of a `Machine`.
///
/// `Created` and the transient reset step are never observable from outside:
/// construction either yields a `Ready` machine or fails, and `reset` returns
/// to `Ready` on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    Ready,
    Closed,
}

/// Login user for a node: the credential user, or [`DEFAULT_USER`].
#[must_use]
pub fn resolve_user(credentials: Option<&LoginCredentials>) -> &str {
    credentials.map_or(DEFAULT_USER, |c| c.user.as_str())
}

#[must_use]
pub fn create_dir_command(dir: &str) -> String {
    format!("mkdir -p {dir}")
}

#[must_use]
pub fn kill_runtime_command(process: &str) -> String {
    format!("killall {process}")
}

/// Run `command` from inside `dir`.
#[must_use]
pub fn in_dir_command(dir: &str, command: &str) -> String {
    format!("cd {dir} && {command}")
}

/// Quote `arg` for a POSIX shell; plain words are passed through.
#[must_use]
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Join command-line words into one shell command.
#[must_use]
pub fn shell_join<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| shell_quote(w.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
