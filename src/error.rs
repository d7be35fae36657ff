//! Error types surfaced by the lifecycle engine.
//!
//! Two families exist:
//!
//! - [`HandlerError`] is raised by filters, listeners and action handlers. The
//!   engine never swallows it: it is forwarded to the failure hook supplied by
//!   the caller and the chain that raised it stops advancing.
//! - [`LookupError`] is a configuration error. It is reported synchronously
//!   before any lifecycle phase is entered.

use std::fmt;

use http::Method;

/// Failure raised inside a filter, listener or action handler.
///
/// An execution context that has seen a `HandlerError` must not be reused;
/// its lifecycle flags are left wherever the failure interrupted them.
#[derive(Debug)]
pub enum HandlerError {
    /// Free-form failure reported by user code
    Message(String),
    /// A JSON body could not be serialized
    Serialization(serde_json::Error),
    /// The response sink failed to render a view
    Render {
        /// View that was being rendered
        view: String,
        /// Reason reported by the sink
        reason: String,
    },
    /// The response sink has no view engine attached
    NoViewEngine {
        /// View that was requested
        view: String,
    },
    /// The response sink failed while emitting
    Io(std::io::Error),
    /// A suspending handler could not be scheduled on a coroutine
    Spawn(String),
    /// A handler panicked while running
    Panicked(String),
    /// Any other error produced by application code
    Other(anyhow::Error),
}

impl HandlerError {
    /// Build a free-form handler failure.
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Message(message) => write!(f, "{message}"),
            HandlerError::Serialization(err) => write!(f, "failed to serialize body: {err}"),
            HandlerError::Render { view, reason } => {
                write!(f, "failed to render view '{view}': {reason}")
            }
            HandlerError::NoViewEngine { view } => {
                write!(f, "cannot render view '{view}': no view engine attached")
            }
            HandlerError::Io(err) => write!(f, "response emission failed: {err}"),
            HandlerError::Spawn(reason) => {
                write!(f, "failed to spawn suspending handler coroutine: {reason}")
            }
            HandlerError::Panicked(message) => write!(f, "handler panicked: {message}"),
            HandlerError::Other(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Serialization(err) => Some(err),
            HandlerError::Io(err) => Some(err),
            HandlerError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Serialization(err)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        HandlerError::Io(err)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::Other(err)
    }
}

/// Configuration error: the selected action cannot serve the request.
///
/// Reported before any phase runs. Dispatchers treat it like a fallthrough
/// and route elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The controller has no action with this name
    UnknownAction {
        /// Requested action name
        action: String,
    },
    /// The action exists but declares no handler for this verb
    UnsupportedVerb {
        /// Requested action name
        action: String,
        /// HTTP verb of the request
        verb: Method,
    },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::UnknownAction { action } => {
                write!(f, "no handler: action '{action}' is not registered")
            }
            LookupError::UnsupportedVerb { action, verb } => {
                write!(f, "no handler: action '{action}' does not handle {verb}")
            }
        }
    }
}

impl std::error::Error for LookupError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_lookup_error_messages() {
        let err = LookupError::UnsupportedVerb {
            action: "index".to_string(),
            verb: Method::POST,
        };
        assert_eq!(
            err.to_string(),
            "no handler: action 'index' does not handle POST"
        );
    }

    #[test]
    fn test_handler_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone");
        let err = HandlerError::from(io);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("peer gone"));
        assert!(HandlerError::msg("boom").source().is_none());
    }
}
