//! Error types for session setup and polling

use thiserror::Error;

/// Failure reported by a windowing backend while talking to the server
#[derive(Debug, Error)]
pub enum BackendError {
    /// The connection broke or a request could not be sent
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered a request with an error
    #[error("request failed: {0}")]
    Request(String),

    /// Waiting on the connection socket failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session initialization errors
///
/// All of these are terminal for the session: nothing is retried, and no
/// session value exists to poll from afterwards.
#[derive(Debug, Error)]
pub enum InitError {
    /// The display connection could not be opened
    #[error("cannot open display{}: {reason}", display_suffix(.display))]
    NoDisplay {
        display: Option<String>,
        reason: String,
    },

    /// The server does not advertise the touch input extension
    #[error("{name} extension not available")]
    ExtensionMissing { name: &'static str },

    /// The server's XInput version is too old for touch events
    #[error("no XI2 touch support ({major}.{minor} only)")]
    UnsupportedVersion { major: u16, minor: u16 },

    /// No enumerated device matched the selection policy
    #[error("no input device matched the {policy} selection policy")]
    NoTouchDeviceFound { policy: String },

    /// Any other protocol failure during setup
    #[error(transparent)]
    Backend(#[from] BackendError),
}

fn display_suffix(display: &Option<String>) -> String {
    match display {
        Some(name) => format!(" {name}"),
        None => String::new(),
    }
}

/// Errors from a single `poll()` call
#[derive(Debug, Error)]
pub enum PumpError {
    /// `poll()` ran before any handler was registered; nothing was consumed
    #[error("no touch handler registered")]
    NoCallbackRegistered,

    /// The backend failed while draining events
    #[error(transparent)]
    Backend(#[from] BackendError),
}
