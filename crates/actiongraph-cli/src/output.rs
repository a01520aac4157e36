//! Terminal output and logging setup

use console::{style, Term};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

use crate::settings::{CliSettings, Verbosity};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the verbosity picks the level. Logs
/// go to stderr so command output on stdout stays machine-readable.
pub fn init_logging(settings: &CliSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.verbosity.log_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(settings.color.should_color())
        .with_target(settings.verbosity == Verbosity::Debug)
        .try_init();
}

/// Status line printer
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Reporter {
    /// Reporter for the given settings
    #[must_use]
    pub fn new(settings: &CliSettings) -> Self {
        Self {
            term: Term::stdout(),
            use_color: settings.color.should_color(),
            quiet: settings.verbosity.is_quiet(),
        }
    }

    /// Print a success line
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure line (shown even in quiet mode)
    pub fn failure(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning line
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("!").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a dimmed detail line
    pub fn detail(&self, message: &str) {
        if self.quiet {
            return;
        }
        let line = if self.use_color {
            style(message).dim().to_string()
        } else {
            message.to_string()
        };
        let _ = self.term.write_line(&format!("  {line}"));
    }

    /// Print raw output (documents, JSON); never suppressed.
    ///
    /// Unlike status lines, a failed write is an error: the output is the
    /// command's result.
    pub fn raw(&self, text: &str) -> io::Result<()> {
        write_raw(&mut &self.term, text)
    }
}

fn write_raw<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}
