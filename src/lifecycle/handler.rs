use std::fmt;
use std::sync::{Arc, OnceLock};

use super::adapter;
use super::chain::Next;
use super::context::Exchange;
use crate::error::HandlerError;

pub(crate) type ContinuationFn = dyn Fn(&Exchange, Next) -> Result<(), HandlerError> + Send + Sync;
pub(crate) type SuspendingFn = dyn Fn(&Exchange) -> Result<(), HandlerError> + Send + Sync;

/// Continuation-style callable: `(exchange, next)`.
///
/// The only shape the chain runner knows how to invoke. Suspending handlers
/// are turned into one of these by the suspension adapter.
#[derive(Clone)]
pub struct Callback(pub(crate) Arc<ContinuationFn>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Exchange, Next) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Callback(Arc::new(f))
    }

    /// Invoke with the request's exchange and the continuation to the next participant.
    pub fn invoke(&self, cx: &Exchange, next: Next) -> Result<(), HandlerError> {
        (self.0)(cx, next)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

pub(crate) enum HandlerStyle {
    Continuation(Callback),
    Suspending(Arc<SuspendingFn>),
}

pub(crate) struct HandlerInner {
    pub(crate) style: HandlerStyle,
    pub(crate) adapted: OnceLock<Callback>,
}

/// A filter, listener or action handler as registered on a blueprint.
///
/// The authoring style is declared at registration:
///
/// - [`Handler::continuation`] receives `(exchange, next)` and advances by
///   calling [`Next::proceed`], or ends processing by invoking a finishing
///   operation on `exchange.response()` instead.
/// - [`Handler::suspending`] receives only the exchange and runs on its own
///   `may` coroutine, so it may block on coroutine-aware primitives. Returning
///   `Ok(())` is equivalent to calling the continuation, unless the handler
///   invoked a finishing operation.
///
/// Cloning is cheap and shares the cached adaptation.
#[derive(Clone)]
pub struct Handler {
    pub(crate) inner: Arc<HandlerInner>,
}

impl Handler {
    /// Register a continuation-style handler.
    pub fn continuation<F>(f: F) -> Self
    where
        F: Fn(&Exchange, Next) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self::from_style(HandlerStyle::Continuation(Callback::new(f)))
    }

    /// Register a suspending-style handler.
    pub fn suspending<F>(f: F) -> Self
    where
        F: Fn(&Exchange) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self::from_style(HandlerStyle::Suspending(Arc::new(f)))
    }

    fn from_style(style: HandlerStyle) -> Self {
        Handler {
            inner: Arc::new(HandlerInner {
                style,
                adapted: OnceLock::new(),
            }),
        }
    }

    #[must_use]
    pub fn is_suspending(&self) -> bool {
        matches!(self.inner.style, HandlerStyle::Suspending(_))
    }

    /// The continuation-style form of this handler, adapted at most once.
    #[must_use]
    pub fn callback(&self) -> Callback {
        adapter::adapt(self)
    }

    /// True when both values share one registration.
    #[must_use]
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = if self.is_suspending() {
            "suspending"
        } else {
            "continuation"
        };
        f.debug_struct("Handler").field("style", &style).finish()
    }
}
