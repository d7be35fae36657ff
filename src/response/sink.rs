use std::sync::Mutex;

use serde_json::Value;

use super::Emission;
use crate::error::HandlerError;

/// Concrete I/O layer behind a [`Response`](super::Response).
///
/// `emit` is the one real "write and close" primitive every finishing
/// operation ends in. It is called at most once per request.
pub trait ResponseSink: Send + Sync {
    /// Write the complete response and close it.
    fn emit(&self, emission: Emission) -> Result<(), HandlerError>;

    /// Render `view` with `locals` into a body.
    ///
    /// Sinks without a view engine keep the default, which fails.
    fn render(&self, view: &str, _locals: &Value) -> Result<String, HandlerError> {
        Err(HandlerError::NoViewEngine {
            view: view.to_string(),
        })
    }
}

/// In-memory sink that records every emission.
///
/// Views render as `"<view> <locals-json>"`, which keeps assertions simple.
#[derive(Debug, Default)]
pub struct RecordingSink {
    emissions: Mutex<Vec<Emission>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All emissions so far, oldest first.
    #[must_use]
    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The most recent emission, if any.
    #[must_use]
    pub fn last(&self) -> Option<Emission> {
        self.emissions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl ResponseSink for RecordingSink {
    fn emit(&self, emission: Emission) -> Result<(), HandlerError> {
        self.emissions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(emission);
        Ok(())
    }

    fn render(&self, view: &str, locals: &Value) -> Result<String, HandlerError> {
        Ok(format!("{view} {locals}"))
    }
}
