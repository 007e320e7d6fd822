//! Application context: state shared by every command handler.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::TestnodeConfig;
use crate::infra::config::YamlConfigStore;
use crate::output::OutputContext;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Explicit configuration file (`--config`).
    pub config: Option<PathBuf>,
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
///
/// Constructed once in `Cli::run()`. The configuration is loaded and
/// validated here so that no command runs against an invalid file.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Effective, validated configuration.
    pub config: TestnodeConfig,
    /// File the configuration was resolved from (it may not exist).
    pub config_path: PathBuf,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read, parsed, or
    /// validated.
    pub fn new(flags: AppFlags) -> Result<Self> {
        let store = match flags.config {
            Some(path) => YamlConfigStore::with_path(path),
            None => YamlConfigStore::default(),
        };
        Self::with_store(&store, flags.no_color, flags.quiet, flags.json)
    }

    /// Construct an `AppContext` from any `ConfigStore`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to load the configuration.
    pub fn with_store(
        store: &impl ConfigStore,
        no_color: bool,
        quiet: bool,
        json: bool,
    ) -> Result<Self> {
        let mode = if json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Ok(Self {
            output: OutputContext::new(no_color, quiet || json),
            mode,
            config: store.load()?,
            config_path: store.path()?,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }
}
