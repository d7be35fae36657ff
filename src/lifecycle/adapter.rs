//! Suspension adapter.
//!
//! Turns a suspending-style handler into the continuation-style [`Callback`]
//! the chain runner invokes. The suspending body runs on a fresh `may`
//! coroutine; when it returns the adapter resumes the chain on that
//! coroutine:
//!
//! - `Ok(())` without a finishing call: the continuation is invoked
//! - `Ok(())` after the body itself made a finishing call: the chain stays
//!   halted (the finishing operation already owns the rest of the lifecycle)
//! - `Err(..)` or a panic: a handler failure for the current phase
//!
//! Adaptation happens lazily on first use and is cached on the handler.

use std::any::Any;
use std::sync::Arc;

use may::coroutine;
use tracing::{debug, error};

use super::chain::Next;
use super::context::Exchange;
use super::handler::{Callback, Handler, HandlerStyle, SuspendingFn};
use crate::error::HandlerError;
use crate::runtime_config::DEFAULT_STACK_SIZE;

/// Continuation-style form of `handler`.
///
/// Continuation handlers pass through unchanged; suspending handlers are
/// wrapped once and the wrapper is reused by every later call.
pub fn adapt(handler: &Handler) -> Callback {
    handler
        .inner
        .adapted
        .get_or_init(|| match &handler.inner.style {
            HandlerStyle::Continuation(callback) => callback.clone(),
            HandlerStyle::Suspending(body) => {
                let body = Arc::clone(body);
                Callback::new(move |cx, next| resume_on_coroutine(Arc::clone(&body), cx, next))
            }
        })
        .clone()
}

fn resume_on_coroutine(
    body: Arc<SuspendingFn>,
    cx: &Exchange,
    next: Next,
) -> Result<(), HandlerError> {
    let cx = cx.clone();
    let request_id = cx.request_id();
    let stack_size = may::config().get_stack_size().max(DEFAULT_STACK_SIZE);
    let finishes_before = cx.finish_requests();

    // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
    // The closure owns everything it touches (Arc'd body, cloned exchange, continuation)
    // and reports failures through the exchange instead of unwinding across the scheduler.
    let spawned = unsafe {
        coroutine::Builder::new()
            .stack_size(stack_size)
            .spawn(move || {
                let outcome =
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| body(&cx)));
                match outcome {
                    Ok(Ok(())) if cx.finish_requests() != finishes_before => {
                        debug!(
                            request_id = %cx.request_id(),
                            phase = %cx.phase(),
                            "Suspending handler finished the response - not advancing"
                        );
                        drop(next);
                    }
                    Ok(Ok(())) => next.proceed(),
                    Ok(Err(err)) => cx.fail(err),
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!(
                            request_id = %cx.request_id(),
                            phase = %cx.phase(),
                            panic_message = %message,
                            "Suspending handler panicked"
                        );
                        cx.fail(HandlerError::Panicked(message));
                    }
                }
            })
    };

    match spawned {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(
                request_id = %request_id,
                error = %e,
                stack_size = stack_size,
                "Failed to spawn suspending handler coroutine"
            );
            Err(HandlerError::Spawn(e.to_string()))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_passes_through() {
        let handler = Handler::continuation(|_cx, next| {
            next.proceed();
            Ok(())
        });
        assert!(!handler.is_suspending());
        let first = adapt(&handler);
        let again = adapt(&handler);
        assert!(Arc::ptr_eq(&first.0, &again.0));
    }

    #[test]
    fn test_suspending_adapted_once() {
        let handler = Handler::suspending(|_cx| Ok(()));
        assert!(handler.is_suspending());
        let first = handler.callback();
        let again = handler.clone().callback();
        assert!(Arc::ptr_eq(&first.0, &again.0));
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&"bang".to_string()), "bang");
        assert_eq!(panic_message(&42u8), "non-string panic payload");
    }
}
