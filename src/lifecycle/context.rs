//! Per-request execution context.
//!
//! One [`ExecutionContext`] exists per in-flight request and is exclusively
//! owned by that request's engine run. Handlers see it through the
//! cheap-to-clone [`Exchange`] handle, which is also the receiver every
//! filter, listener and action is invoked with: state written through one
//! participant is visible to every later phase of the same request and to no
//! other request.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use super::controller::ControllerInstance;
use super::engine::{CompletionFn, Fallthrough, FailureFn};
use crate::error::HandlerError;
use crate::host::Host;
use crate::ids::RequestId;
use crate::request::Request;
use crate::response::{Body, Emission, Response, ResponseParts, ResponseSink};

/// Lifecycle phase a request is currently in.
///
/// Exposed for diagnostics: a request whose phase stops changing is waiting
/// on a continuation that has not been called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    ActionExecuting,
    Action,
    ActionExecuted,
    ResultExecuting,
    Result,
    ResultExecuted,
    Done,
}

impl Phase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::ActionExecuting => "ACTION_EXECUTING",
            Phase::Action => "ACTION",
            Phase::ActionExecuted => "ACTION_EXECUTED",
            Phase::ResultExecuting => "RESULT_EXECUTING",
            Phase::Result => "RESULT",
            Phase::ResultExecuted => "RESULT_EXECUTED",
            Phase::Done => "DONE",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::ActionExecuting,
            1 => Phase::Action,
            2 => Phase::ActionExecuted,
            3 => Phase::ResultExecuting,
            4 => Phase::Result,
            5 => Phase::ResultExecuted,
            _ => Phase::Done,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared per-request state bag.
///
/// Values are JSON so filters can hand structured data to actions without
/// agreeing on Rust types.
#[derive(Debug, Default, Clone)]
pub struct StateBag {
    values: Map<String, Value>,
}

impl StateBag {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Default)]
struct LifecycleFlags {
    reached_action: AtomicBool,
    reached_events: AtomicBool,
    finished: AtomicBool,
    action_executed: AtomicBool,
    finish_requests: AtomicUsize,
    emitted: AtomicBool,
    failed: AtomicBool,
}

/// Everything one request's lifecycle needs, owned by a single engine run.
pub struct ExecutionContext {
    request: Request,
    controller: Arc<ControllerInstance>,
    action: Arc<str>,
    verb: Method,
    view_path: Option<PathBuf>,
    sink: Arc<dyn ResponseSink>,
    parts: Mutex<ResponseParts>,
    state: Mutex<StateBag>,
    view_bag: Mutex<Map<String, Value>>,
    flags: LifecycleFlags,
    phase: AtomicU8,
    completion: Mutex<Option<CompletionFn>>,
    failure: FailureFn,
}

impl ExecutionContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        request: Request,
        controller: Arc<ControllerInstance>,
        action: Arc<str>,
        verb: Method,
        view_path: Option<PathBuf>,
        sink: Arc<dyn ResponseSink>,
        completion: CompletionFn,
        failure: FailureFn,
    ) -> Self {
        Self {
            request,
            controller,
            action,
            verb,
            view_path,
            sink,
            parts: Mutex::new(ResponseParts::default()),
            state: Mutex::new(StateBag::default()),
            view_bag: Mutex::new(Map::new()),
            flags: LifecycleFlags::default(),
            phase: AtomicU8::new(Phase::ActionExecuting as u8),
            completion: Mutex::new(Some(completion)),
            failure,
        }
    }
}

/// Handle to the in-flight request, passed to every lifecycle participant.
#[derive(Clone)]
pub struct Exchange {
    inner: Arc<ExecutionContext>,
}

impl Exchange {
    pub(crate) fn new(context: ExecutionContext) -> Self {
        Exchange {
            inner: Arc::new(context),
        }
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.inner.request.request_id
    }

    /// The intercepted response handle.
    #[must_use]
    pub fn response(&self) -> Response<'_> {
        Response::new(self)
    }

    #[must_use]
    pub fn controller(&self) -> &Arc<ControllerInstance> {
        &self.inner.controller
    }

    /// The application that owns the controller instance.
    #[must_use]
    pub fn host(&self) -> &Arc<Host> {
        self.inner.controller.host()
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.inner.action
    }

    #[must_use]
    pub fn verb(&self) -> &Method {
        &self.inner.verb
    }

    /// Conventional view for this action, when the dispatcher computed one.
    #[must_use]
    pub fn view_path(&self) -> Option<&Path> {
        self.inner.view_path.as_deref()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.inner.phase.load(Ordering::Acquire))
    }

    /// Lock the state bag.
    ///
    /// The lock is not re-entrant: drop the guard before calling `set`,
    /// `get` or `remove`. The view bag lives behind its own lock, so
    /// finishing operations may run while the guard is held.
    pub fn state(&self) -> MutexGuard<'_, StateBag> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` under `key` in the state bag.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.state().insert(key, value);
    }

    /// Read a value from the state bag.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.state().remove(key)
    }

    /// Snapshot of the view bag merged into render locals.
    #[must_use]
    pub fn view_bag(&self) -> Map<String, Value> {
        self.view_bag_guard().clone()
    }

    /// Expose `value` to views under `viewBag.<key>`.
    pub fn set_view_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.view_bag_guard().insert(key.into(), value.into());
    }

    /// Read a value from the state bag as `T`; `None` if absent or of another shape.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    #[must_use]
    pub fn reached_action(&self) -> bool {
        self.inner.flags.reached_action.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn reached_events(&self) -> bool {
        self.inner.flags.reached_events.load(Ordering::Acquire)
    }

    /// True once a finishing operation ran before the action was reached.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.inner.flags.finished.load(Ordering::Acquire)
    }

    /// True once a handler failure was reported for this request.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.inner.flags.failed.load(Ordering::Acquire)
    }

    /// True once any finishing operation was invoked.
    #[must_use]
    pub fn finish_requested(&self) -> bool {
        self.finish_requests() > 0
    }

    /// True once the sink has been asked to emit.
    #[must_use]
    pub fn headers_sent(&self) -> bool {
        self.inner.flags.emitted.load(Ordering::Acquire)
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.inner.phase.store(phase as u8, Ordering::Release);
        debug!(
            request_id = %self.request_id(),
            controller = %self.inner.controller.name(),
            action = %self.inner.action,
            verb = %self.inner.verb,
            phase = %phase,
            "Lifecycle phase entered"
        );
    }

    pub(crate) fn mark_reached_action(&self) {
        self.inner.flags.reached_action.store(true, Ordering::Release);
    }

    /// Set `reachedEvents`; returns its previous value.
    pub(crate) fn mark_reached_events(&self) -> bool {
        self.inner.flags.reached_events.swap(true, Ordering::AcqRel)
    }

    /// Set `finished`; returns its previous value.
    pub(crate) fn mark_finished(&self) -> bool {
        self.inner.flags.finished.swap(true, Ordering::AcqRel)
    }

    /// Set once the `actionExecuted` listeners have been started; returns its previous value.
    pub(crate) fn mark_action_executed(&self) -> bool {
        self.inner
            .flags
            .action_executed
            .swap(true, Ordering::AcqRel)
    }

    pub(crate) fn mark_finish_requested(&self) {
        self.inner
            .flags
            .finish_requests
            .fetch_add(1, Ordering::AcqRel);
    }

    /// Number of finishing calls seen so far, nested ones included.
    pub(crate) fn finish_requests(&self) -> usize {
        self.inner.flags.finish_requests.load(Ordering::Acquire)
    }

    fn view_bag_guard(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.inner
            .view_bag
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn sink(&self) -> &Arc<dyn ResponseSink> {
        &self.inner.sink
    }

    pub(crate) fn parts(&self) -> MutexGuard<'_, ResponseParts> {
        self.inner
            .parts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Locals for `render`: the caller's locals plus the view bag under `viewBag`.
    pub(crate) fn render_locals(&self, locals: Value) -> Value {
        let view_bag = Value::Object(self.view_bag());
        match locals {
            Value::Object(mut map) => {
                map.entry("viewBag").or_insert(view_bag);
                Value::Object(map)
            }
            Value::Null => {
                let mut map = Map::new();
                map.insert("viewBag".to_string(), view_bag);
                Value::Object(map)
            }
            other => other,
        }
    }

    /// The one real emission. A second emission is ignored, never an error.
    pub(crate) fn emit(&self, body: Body) -> Result<(), HandlerError> {
        if self.inner.flags.emitted.swap(true, Ordering::AcqRel) {
            debug!(
                request_id = %self.request_id(),
                phase = %self.phase(),
                "Response already emitted - ignoring repeated finishing operation"
            );
            return Ok(());
        }
        let parts = self.parts().clone();
        let emission = Emission {
            status: parts.status,
            headers: parts.headers,
            body,
        };
        self.inner.sink.emit(emission)
    }

    /// Report the engine run's outcome. Only the first call has any effect.
    pub(crate) fn complete(&self, fallthrough: Option<Fallthrough>) {
        let completion = self
            .inner
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(completion) = completion else {
            debug!(
                request_id = %self.request_id(),
                "Completion already signalled"
            );
            return;
        };
        info!(
            request_id = %self.request_id(),
            controller = %self.inner.controller.name(),
            action = %self.inner.action,
            verb = %self.inner.verb,
            phase = %self.phase(),
            fallthrough = fallthrough.is_some(),
            "Lifecycle complete"
        );
        self.inner
            .phase
            .store(Phase::Done as u8, Ordering::Release);
        completion(fallthrough);
    }

    /// Forward a handler failure to the caller's failure hook and halt further chains.
    pub(crate) fn fail(&self, err: HandlerError) {
        self.inner.flags.failed.store(true, Ordering::Release);
        error!(
            request_id = %self.request_id(),
            controller = %self.inner.controller.name(),
            action = %self.inner.action,
            verb = %self.inner.verb,
            phase = %self.phase(),
            error = %err,
            "Handler failure"
        );
        (self.inner.failure)(err);
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("request_id", &self.request_id())
            .field("controller", &self.inner.controller.name())
            .field("action", &self.inner.action)
            .field("verb", &self.inner.verb)
            .field("phase", &self.phase())
            .finish()
    }
}
