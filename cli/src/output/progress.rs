//! Spinner shown while Latent waits on the remote host.

#![allow(clippy::expect_used)] // Template is a compile-time constant

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "  {spinner:.cyan} {msg} {elapsed:.dim}";

/// Start a spinner for a remote call that prints nothing until it returns.
/// The caller clears it with [`ProgressBar::finish_and_clear`].
#[must_use]
pub fn waiting_on_host(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template(TEMPLATE)
            .expect("valid spinner template")
            .tick_chars("◐◓◑◒ "),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
