//! Result interceptor.
//!
//! Every finishing operation on [`Response`](crate::response::Response) is
//! routed through [`intercept`]. The first finishing call after the action
//! has been reached runs the post-action phases around the real operation:
//!
//! ```text
//! actionExecuted listeners ─► resultExecuting listeners ─► real op ─► resultExecuted listeners ─► complete
//! ```
//!
//! When the action handed control on instead of finishing, the
//! `actionExecuted` listeners have already run; the first finishing call
//! made after that (typically by one of those listeners) runs only the
//! `resultExecuting` and `resultExecuted` phases around the real operation.
//!
//! Nested finishing calls (`json` delegating to `send`, `send` to `end`) and
//! finishing calls made while the result phases are already running pass
//! straight through. A finishing call made before the action was reached signals
//! completion immediately and then runs the real operation, skipping the
//! post-action phases entirely.

use tracing::{debug, trace};

use super::chain::Chain;
use super::context::{Exchange, Phase};
use super::event::LifecycleEvent;
use crate::error::HandlerError;
use crate::response::FinishingOp;

pub(crate) fn intercept<F>(cx: &Exchange, op: FinishingOp, real: F) -> Result<(), HandlerError>
where
    F: FnOnce(&Exchange) -> Result<(), HandlerError> + Send + 'static,
{
    cx.mark_finish_requested();

    if !cx.reached_action() {
        if !cx.mark_finished() {
            debug!(
                request_id = %cx.request_id(),
                op = %op,
                phase = %cx.phase(),
                "Finishing operation before action - skipping post-action phases"
            );
            cx.complete(None);
        }
        return real(cx);
    }

    if cx.mark_reached_events() {
        trace!(
            request_id = %cx.request_id(),
            op = %op,
            "Nested finishing operation - passing through"
        );
        return real(cx);
    }

    let result_phases = move |cx: &Exchange| {
        cx.set_phase(Phase::ResultExecuting);
        listeners(cx, LifecycleEvent::ResultExecuting).run(cx, move |cx| {
            cx.set_phase(Phase::Result);
            if let Err(err) = real(cx) {
                cx.fail(err);
                return;
            }
            cx.set_phase(Phase::ResultExecuted);
            listeners(cx, LifecycleEvent::ResultExecuted).run(cx, |cx| cx.complete(None));
        });
    };

    if cx.mark_action_executed() {
        debug!(
            request_id = %cx.request_id(),
            op = %op,
            "First finishing operation after fallthrough - running result phases"
        );
        result_phases(cx);
        return Ok(());
    }

    debug!(
        request_id = %cx.request_id(),
        op = %op,
        "First finishing operation - running post-action phases"
    );
    cx.set_phase(Phase::ActionExecuted);
    listeners(cx, LifecycleEvent::ActionExecuted).run(cx, result_phases);
    Ok(())
}

pub(crate) fn listeners(cx: &Exchange, event: LifecycleEvent) -> Chain {
    Chain::new(
        event.as_str(),
        cx.controller().events().listeners(event).iter().cloned(),
    )
}
