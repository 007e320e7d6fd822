//! Stylesheet for terminal output.

use owo_colors::Style;

/// Colors used when stdout is a terminal; every style is plain otherwise.
#[derive(Default, Clone)]
pub struct Styles {
    pub ok: Style,
    pub warn: Style,
    /// Labels in key/value lines.
    pub label: Style,
    /// Node ids and host addresses.
    pub node: Style,
    pub port: Style,
}

impl Styles {
    /// Stylesheet with colors turned on.
    #[must_use]
    pub fn colored() -> Self {
        Self {
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            label: Style::new().dimmed(),
            node: Style::new().bold().cyan(),
            port: Style::new().magenta(),
        }
    }
}
