//! Lifecycle engine.
//!
//! Drives one request through the seven lifecycle phases:
//!
//! ```text
//! ACTION_EXECUTING ─► ACTION ─► ACTION_EXECUTED ─► RESULT_EXECUTING ─► RESULT ─► RESULT_EXECUTED ─► DONE
//! ```
//!
//! The first phase is a single chain of `actionExecuting` listeners,
//! blueprint filters and action filters. Once it completes the verb handler
//! runs with a continuation. From there, two paths reach `DONE`:
//!
//! - the handler (or a later participant) calls a finishing operation, and the
//!   result interceptor runs the post-action phases around it;
//! - the handler calls its continuation instead, the `actionExecuted`
//!   listeners run, and the caller is told to fall through to the next route.
//!   If one of those listeners finishes the response, the `resultExecuting`
//!   and `resultExecuted` phases run around it and no fallthrough is reported.
//!
//! The engine never times anything out. [`PendingRun`] lets a caller wait with
//! its own deadline, and abandoning it is always safe.

use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::TryRecvError;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use http::Method;
use may::sync::mpsc;
use tracing::{debug, info};

use super::chain::{Chain, Next};
use super::context::{ExecutionContext, Exchange, Phase};
use super::controller::ControllerInstance;
use super::event::LifecycleEvent;
use super::handler::Handler;
use super::interceptor::listeners;
use crate::error::{HandlerError, LookupError};
use crate::ids::RequestId;
use crate::request::Request;
use crate::response::ResponseSink;

pub(crate) type CompletionFn = Box<dyn FnOnce(Option<Fallthrough>) + Send>;
pub(crate) type FailureFn = Arc<dyn Fn(HandlerError) + Send + Sync>;
type FailureHook = Arc<dyn Fn(&HandlerError) + Send + Sync>;

/// Poll interval of [`PendingRun::wait_timeout`].
const WAIT_POLL: Duration = Duration::from_millis(1);

/// Dispatcher-facing signal: this run produced no response, try the next route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fallthrough;

/// Everything the engine needs for one run.
pub struct ExecutionRequest {
    controller: Arc<ControllerInstance>,
    action: String,
    verb: Method,
    request: Request,
    sink: Arc<dyn ResponseSink>,
    view_path: Option<PathBuf>,
    on_complete: CompletionFn,
    on_failure: FailureHook,
    failures: Option<Mutex<mpsc::Sender<RunOutcome>>>,
}

impl ExecutionRequest {
    /// The verb defaults to the request's method.
    pub fn new(
        controller: Arc<ControllerInstance>,
        action: impl Into<String>,
        request: Request,
        sink: Arc<dyn ResponseSink>,
    ) -> Self {
        Self {
            controller,
            action: action.into(),
            verb: request.method.clone(),
            request,
            sink,
            view_path: None,
            on_complete: Box::new(|_| {}),
            on_failure: Arc::new(|_| {}),
            failures: None,
        }
    }

    #[must_use]
    pub fn verb(mut self, verb: Method) -> Self {
        self.verb = verb;
        self
    }

    /// Conventional view used by [`Response::view`](crate::response::Response::view).
    #[must_use]
    pub fn with_view_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.view_path = Some(path.into());
        self
    }

    /// Called exactly once when the run reaches `DONE`.
    #[must_use]
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Option<Fallthrough>) + Send + 'static,
    {
        self.on_complete = Box::new(f);
        self
    }

    /// Called with every handler failure. Chains stop advancing after the first.
    #[must_use]
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerError) + Send + Sync + 'static,
    {
        self.on_failure = Arc::new(f);
        self
    }
}

impl fmt::Debug for ExecutionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("controller", &self.controller.name())
            .field("action", &self.action)
            .field("verb", &self.verb)
            .field("request_id", &self.request.request_id)
            .field("view_path", &self.view_path)
            .finish()
    }
}

/// Why [`PendingRun`] stopped waiting without a completion.
#[derive(Debug)]
pub enum WaitError {
    /// The deadline passed while a continuation was still outstanding
    TimedOut,
    /// Every continuation was dropped without finishing; the run can never complete
    Stalled,
    /// A handler failed
    Failed(HandlerError),
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::TimedOut => write!(f, "lifecycle did not complete before the deadline"),
            WaitError::Stalled => write!(f, "lifecycle stalled: no continuation is outstanding"),
            WaitError::Failed(err) => write!(f, "handler failed: {err}"),
        }
    }
}

impl std::error::Error for WaitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WaitError::Failed(err) => Some(err),
            _ => None,
        }
    }
}

enum RunOutcome {
    Completed(Option<Fallthrough>),
    Failed(HandlerError),
}

/// Receiving end of an engine run started with [`Engine::execute`].
///
/// Dropping it abandons the run; the engine keeps going and its completion
/// is discarded.
pub struct PendingRun {
    request_id: RequestId,
    rx: mpsc::Receiver<RunOutcome>,
}

impl PendingRun {
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Block the current coroutine or thread until the run completes.
    pub fn wait(self) -> Result<Option<Fallthrough>, WaitError> {
        match self.rx.recv() {
            Ok(outcome) => outcome.into_result(),
            Err(_) => Err(WaitError::Stalled),
        }
    }

    /// Like [`PendingRun::wait`], giving up after `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Option<Fallthrough>, WaitError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.rx.try_recv() {
                Ok(outcome) => return outcome.into_result(),
                Err(TryRecvError::Disconnected) => return Err(WaitError::Stalled),
                Err(TryRecvError::Empty) => {
                    if Instant::now() >= deadline {
                        debug!(
                            request_id = %self.request_id,
                            timeout_ms = timeout.as_millis() as u64,
                            "Gave up waiting for lifecycle completion"
                        );
                        return Err(WaitError::TimedOut);
                    }
                    may::coroutine::sleep(WAIT_POLL);
                }
            }
        }
    }
}

impl RunOutcome {
    fn into_result(self) -> Result<Option<Fallthrough>, WaitError> {
        match self {
            RunOutcome::Completed(fallthrough) => Ok(fallthrough),
            RunOutcome::Failed(err) => Err(WaitError::Failed(err)),
        }
    }
}

impl fmt::Debug for PendingRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRun")
            .field("request_id", &self.request_id)
            .finish()
    }
}

/// Sequences the lifecycle phases for one request at a time.
///
/// Stateless: every run gets its own [`ExecutionContext`], so one engine can
/// serve any number of concurrent requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Engine
    }

    /// Start a run and return its exchange.
    ///
    /// Lookup failures are returned before any phase runs. Everything else
    /// is reported through the request's completion and failure hooks.
    pub fn run(&self, request: ExecutionRequest) -> Result<Exchange, LookupError> {
        let ExecutionRequest {
            controller,
            action,
            verb,
            request,
            sink,
            view_path,
            on_complete,
            on_failure,
            failures,
        } = request;

        let (spec, handler) = match controller.lookup(&action, &verb) {
            Ok(found) => found,
            Err(err) => {
                info!(
                    request_id = %request.request_id,
                    controller = %controller.name(),
                    action = %action,
                    verb = %verb,
                    error = %err,
                    "No handler for request"
                );
                return Err(err);
            }
        };

        let participants: Vec<Handler> = controller
            .events()
            .listeners(LifecycleEvent::ActionExecuting)
            .iter()
            .chain(controller.filters())
            .chain(spec.filters())
            .cloned()
            .collect();
        let handler = handler.clone();

        let request_id = request.request_id;
        let failure: FailureFn = Arc::new(move |err: HandlerError| {
            on_failure(&err);
            let Some(failures) = &failures else {
                return;
            };
            let sent = failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .send(RunOutcome::Failed(err));
            if sent.is_err() {
                debug!(request_id = %request_id, "Failure ignored - run was abandoned");
            }
        });

        let cx = Exchange::new(ExecutionContext::new(
            request,
            Arc::clone(&controller),
            Arc::from(action),
            verb,
            view_path,
            sink,
            on_complete,
            failure,
        ));

        info!(
            request_id = %cx.request_id(),
            controller = %controller.name(),
            action = %cx.action(),
            verb = %cx.verb(),
            participants = participants.len(),
            "Lifecycle started"
        );
        cx.set_phase(Phase::ActionExecuting);

        Chain::new("actionExecuting", participants).run(&cx, move |cx| {
            cx.mark_reached_action();
            cx.set_phase(Phase::Action);
            let next = Next::terminal(cx, "action", action_continued);
            if let Err(err) = handler.callback().invoke(cx, next) {
                cx.fail(err);
            }
        });

        Ok(cx)
    }

    /// Start a run and hand back a [`PendingRun`] to wait on.
    ///
    /// Hooks already set on `request` still fire; the pending run observes the
    /// same outcome.
    pub fn execute(&self, mut request: ExecutionRequest) -> Result<PendingRun, LookupError> {
        let (tx, rx) = mpsc::channel();
        let request_id = request.request.request_id;

        let user_complete = std::mem::replace(&mut request.on_complete, Box::new(|_| {}));
        let done_tx = tx.clone();
        request.on_complete = Box::new(move |fallthrough| {
            user_complete(fallthrough);
            if done_tx.send(RunOutcome::Completed(fallthrough)).is_err() {
                debug!(request_id = %request_id, "Completion ignored - run was abandoned");
            }
        });

        request.failures = Some(Mutex::new(tx));

        // Only continuations keep the context (and both senders) alive.
        drop(self.run(request)?);
        Ok(PendingRun { request_id, rx })
    }
}

/// Continuation handed to the verb handler.
fn action_continued(cx: &Exchange) {
    if cx.reached_events() || cx.mark_action_executed() {
        debug!(
            request_id = %cx.request_id(),
            "Action continued after finishing - post-action phases already running"
        );
        return;
    }
    cx.set_phase(Phase::ActionExecuted);
    listeners(cx, LifecycleEvent::ActionExecuted).run(cx, |cx| {
        if cx.reached_events() {
            // a listener finished the response; the interceptor completes the run
            return;
        }
        cx.complete(Some(Fallthrough));
    });
}
