//! Result of a command executed over a remote shell session.

use serde::Serialize;

/// Captured output of one remote command.
///
/// `status` is `None` when the remote side reported no exit code (the
/// command was killed by a signal).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    /// `true` when the command exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Short human-readable reason for a failed command, preferring stderr.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        match self.status {
            Some(code) if detail.is_empty() => format!("exit status {code}"),
            Some(code) => format!("exit status {code}: {detail}"),
            None if detail.is_empty() => "terminated by signal".to_string(),
            None => format!("terminated by signal: {detail}"),
        }
    }
}
