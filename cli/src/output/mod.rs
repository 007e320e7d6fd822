//! Terminal rendering for testnode commands.

pub mod json;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;
use testnode_common::NodeMetadata;

use crate::domain::RemoteOutput;
pub use styles::Styles;

/// Where and how command results are printed.
///
/// Status lines go to stdout and are dropped in quiet mode.
pub struct OutputContext {
    pub styles: Styles,
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a terminal, and never when `--no-color` or
    /// `NO_COLOR` is set.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let colored =
            !no_color && std::env::var_os("NO_COLOR").is_none() && Term::stdout().is_term();
        Self {
            styles: if colored {
                Styles::colored()
            } else {
                Styles::default()
            },
            quiet,
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.ok));
        }
    }

    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warn));
        }
    }

    /// `label  value`, label dimmed.
    pub fn kv(&self, label: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", label.style(self.styles.label));
        }
    }

    /// Headline for a node: id, login and working directory.
    pub fn node(&self, node: &NodeMetadata, login: &str, dir: &str) {
        if self.quiet {
            return;
        }
        println!("  {} ({})", node.id.style(self.styles.node), node.status);
        self.kv("login", login);
        self.kv("dir  ", dir);
    }

    /// Allocated ports on one line; nothing when none were allocated.
    pub fn ports(&self, ports: &[u16]) {
        if self.quiet || ports.is_empty() {
            return;
        }
        let list: Vec<String> = ports
            .iter()
            .map(|p| p.style(self.styles.port).to_string())
            .collect();
        self.kv("ports", &list.join(", "));
    }

    /// Replay a remote command's streams onto the local ones. Never
    /// suppressed.
    pub fn remote_streams(&self, output: &RemoteOutput) {
        print!("{}", output.stdout);
        eprint!("{}", output.stderr);
        if let Some(code) = output.status.filter(|code| *code != 0) {
            self.warn(&format!("exit status {code}"));
        }
    }
}
