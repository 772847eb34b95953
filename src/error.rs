use thiserror::Error;
use tracing::{error, warn};

use crate::shortcuts::ShortcutParseError;

/// Domain errors for the shortcut monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("failed to create global hotkey manager: {0}")]
    HotkeyInit(#[source] global_hotkey::Error),

    #[error("failed to register hotkey '{shortcut}': {source}")]
    HotkeyRegistration {
        shortcut: String,
        #[source]
        source: global_hotkey::Error,
    },

    #[error(transparent)]
    Parse(#[from] ShortcutParseError),

    #[error("invalid shortcut '{shortcut}' for action '{identifier}': {source}")]
    InvalidShortcut {
        identifier: String,
        shortcut: String,
        #[source]
        source: ShortcutParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Extension trait for ergonomic error logging at boundaries where the
/// caller cannot meaningfully recover (event loops, delegate callbacks).
pub trait LogResultExt<T> {
    fn log_err(self) -> Option<T>;
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> LogResultExt<T> for std::result::Result<T, E> {
    fn log_err(self) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                error!(error = ?e, "Operation failed");
                None
            }
        }
    }

    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = ?e, "Operation warning");
                None
            }
        }
    }
}
