//! Terminal presentation: styled status lines, the provisioning summary and
//! the reporter that relays service progress.

pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;
pub use reporter::TerminalReporter;
pub use styles::Styles;

use crate::domain::ProjectRecord;
use crate::domain::project::DEPLOY_REMOTE;

/// Width of the key column in key/value blocks.
const KEY_WIDTH: usize = 8;

/// Styling and terminal state for one invocation.
pub struct OutputContext {
    pub styles: Styles,
    /// Whether stdout is a terminal.
    pub is_tty: bool,
    /// `--quiet`: only errors and requested data (status text, logs, domain)
    /// are printed.
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a terminal, and never with `--no-color` or
    /// `NO_COLOR` set.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let mut styles = Styles::default();
        if is_tty && !no_color && std::env::var_os("NO_COLOR").is_none() {
            styles.colorize();
        }
        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Spinners would corrupt piped output.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    fn line(&self, text: std::fmt::Arguments<'_>) {
        if !self.quiet {
            println!("  {text}");
        }
    }

    pub fn success(&self, msg: &str) {
        self.line(format_args!("{} {msg}", "✓".style(self.styles.success)));
    }

    pub fn warn(&self, msg: &str) {
        self.line(format_args!("{} {msg}", "⚠".style(self.styles.warning)));
    }

    pub fn info(&self, msg: &str) {
        self.line(format_args!("{} {msg}", "ℹ".style(self.styles.info)));
    }

    pub fn header(&self, msg: &str) {
        self.line(format_args!("{}", msg.style(self.styles.header)));
    }

    /// One row of an aligned key/value block.
    pub fn kv(&self, key: &str, value: &str) {
        self.line(format_args!(
            "{}  {}",
            format!("{key:<KEY_WIDTH$}").style(self.styles.dim),
            value.style(self.styles.accent)
        ));
    }

    /// What `init` prints once a project is live: where it runs and how to
    /// deploy to it.
    pub fn project_summary(&self, record: &ProjectRecord, port: u16) {
        self.success(&format!("Project {} is ready.", record.id));
        self.kv("id", &record.id);
        self.kv("port", &port.to_string());
        match &record.domain {
            Some(domain) => self.kv("url", &format!("https://{domain}")),
            None => self.kv("url", &format!("http://{}.<root domain>", record.id)),
        }
        self.kv("remote", DEPLOY_REMOTE);
        self.info(&format!("Deploy with: git push {DEPLOY_REMOTE} <branch>"));
    }

    /// DNS records the operator must create for `host` to serve projects.
    pub fn dns_guidance(&self, host: &str) {
        self.header("DNS");
        self.info("Projects without a domain are served at <id>.<root domain>:");
        self.kv("record", &format!("*.<root domain>  A  {host}"));
        self.info("Projects with a domain need an A record for that domain:");
        self.kv("record", &format!("<domain>  A  {host}"));
    }
}
