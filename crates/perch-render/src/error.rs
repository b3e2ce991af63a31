use std::fmt::Display;

use thiserror::Error;

/// Recoverable errors surfaced by the render crate. Anything not listed here
/// (device creation, buffer allocation, shader compilation) has no safe
/// degraded mode for a compositing overlay and goes through [`fatal`] instead.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown sprite {0:?}")]
    UnknownSprite(String),
}

/// Unrecoverable setup failure: log it, tell the user which subsystem died,
/// then abort. No graceful exit code is produced on this path.
pub fn fatal(subsystem: &str, err: impl Display) -> ! {
    log::error!("fatal {subsystem} failure: {err}");
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Fatal Error")
        .set_description(format!("{subsystem}: {err}"))
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
    std::process::abort();
}
