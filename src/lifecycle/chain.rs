//! Chain runner.
//!
//! Executes an ordered list of handlers strictly one at a time. Each handler
//! receives a [`Next`] continuation; calling [`Next::proceed`] runs the next
//! handler, and proceeding past the last one runs the chain's completion.
//! A handler that neither proceeds nor finishes the response halts the chain
//! for good: nothing times it out.
//!
//! Continuations are owned values. They can be moved to another coroutine or
//! thread and invoked later, which is how handlers wait on timers or I/O.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::context::Exchange;
use super::handler::Handler;

type Completion = Box<dyn FnOnce(&Exchange) + Send>;

/// Continuation handed to every filter, listener and action handler.
#[must_use = "dropping a continuation without proceeding halts the lifecycle"]
pub struct Next {
    chain: Arc<[Handler]>,
    index: usize,
    label: &'static str,
    cx: Exchange,
    on_done: Completion,
}

impl Next {
    /// Continuation that runs `on_done` directly, with no handlers in between.
    pub(crate) fn terminal<F>(cx: &Exchange, label: &'static str, on_done: F) -> Self
    where
        F: FnOnce(&Exchange) + Send + 'static,
    {
        Next {
            chain: Arc::from(Vec::new()),
            index: 0,
            label,
            cx: cx.clone(),
            on_done: Box::new(on_done),
        }
    }

    /// Advance to the next participant, or to the chain's completion when none is left.
    ///
    /// Does nothing once the request has failed, or once the response was
    /// finished before the action was reached.
    pub fn proceed(self) {
        let Next {
            chain,
            index,
            label,
            cx,
            on_done,
        } = self;

        if cx.is_failed() {
            debug!(
                request_id = %cx.request_id(),
                chain = label,
                position = index,
                "Chain halted after handler failure"
            );
            return;
        }

        if cx.finished() {
            debug!(
                request_id = %cx.request_id(),
                chain = label,
                position = index,
                "Chain halted - response finished before the action"
            );
            return;
        }

        let Some(handler) = chain.get(index).cloned() else {
            trace!(
                request_id = %cx.request_id(),
                chain = label,
                "Chain exhausted"
            );
            on_done(&cx);
            return;
        };

        trace!(
            request_id = %cx.request_id(),
            chain = label,
            position = index,
            suspending = handler.is_suspending(),
            "Invoking chain participant"
        );

        let callback = handler.callback();
        let next = Next {
            chain,
            index: index + 1,
            label,
            cx: cx.clone(),
            on_done,
        };
        if let Err(err) = callback.invoke(&cx, next) {
            cx.fail(err);
        }
    }

    /// Exchange of the request this continuation belongs to.
    #[must_use]
    pub fn exchange(&self) -> &Exchange {
        &self.cx
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("chain", &self.label)
            .field("position", &self.index)
            .field("len", &self.chain.len())
            .finish()
    }
}

/// An ordered, immutable sequence of handlers run as one unit.
#[derive(Clone)]
pub struct Chain {
    handlers: Arc<[Handler]>,
    label: &'static str,
}

impl Chain {
    pub fn new(label: &'static str, handlers: impl IntoIterator<Item = Handler>) -> Self {
        Chain {
            handlers: handlers.into_iter().collect(),
            label,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Start the chain. `on_done` runs once every handler has proceeded.
    pub fn run<F>(self, cx: &Exchange, on_done: F)
    where
        F: FnOnce(&Exchange) + Send + 'static,
    {
        Next {
            chain: self.handlers,
            index: 0,
            label: self.label,
            cx: cx.clone(),
            on_done: Box::new(on_done),
        }
        .proceed();
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("label", &self.label)
            .field("len", &self.handlers.len())
            .finish()
    }
}
