//! Stylesheet for terminal output, built on owo-colors.

use owo_colors::Style;

/// Colors for each kind of line Latent prints. Every style is plain until
/// [`Styles::colorize`] is called.
#[derive(Default, Clone, Copy)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub info: Style,
    /// Keys in key/value blocks.
    pub dim: Style,
    pub header: Style,
    /// Values worth copying: project IDs, ports, domains, remote names.
    pub accent: Style,
    /// Lines relayed from a remote command.
    pub remote: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        *self = Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            info: Style::new().blue(),
            dim: Style::new().dimmed(),
            header: Style::new().bold().cyan(),
            accent: Style::new().bold(),
            remote: Style::new().bright_black(),
        };
    }
}
