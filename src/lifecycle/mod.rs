//! # Lifecycle Module
//!
//! Per-request orchestration of a controller action.
//!
//! ## Overview
//!
//! A request routed to a controller action passes through a fixed sequence
//! of extension points:
//!
//! 1. `actionExecuting` listeners, blueprint filters and action filters (one chain)
//! 2. the verb handler of the action
//! 3. `actionExecuted` listeners
//! 4. `resultExecuting` listeners
//! 5. the real finishing operation on the response
//! 6. `resultExecuted` listeners
//! 7. completion, with or without a [`Fallthrough`] signal
//!
//! Every participant receives the request's [`Exchange`] and a [`Next`]
//! continuation. Calling [`Next::proceed`] advances; calling a finishing
//! operation on [`Exchange::response`] ends processing instead. Phases 3 to 6
//! run exactly once however many finishing operations are called.
//!
//! ## Components
//!
//! - [`blueprint`] composes filters, listeners and actions, with inheritance
//! - [`adapter`] turns suspending handlers into continuation-style callbacks
//! - [`chain`] runs an ordered list of callbacks one at a time
//! - `interceptor` guards the finishing operations
//! - [`engine`] drives the phases and reports completion
//!
//! ## Example
//!
//! ```rust,ignore
//! use brrtcontroller::lifecycle::{ActionSpec, Blueprint, ControllerInstance, Engine, ExecutionRequest, Handler};
//! use brrtcontroller::{Host, RecordingSink, Request};
//! use std::sync::Arc;
//!
//! let blueprint = Blueprint::builder("Users")
//!     .filter(Handler::continuation(|cx, next| {
//!         cx.set("user", "alice");
//!         next.proceed();
//!         Ok(())
//!     }))
//!     .action("show", ActionSpec::new().get(Handler::continuation(|cx, _next| {
//!         cx.response().json(&cx.get("user"))
//!     })))
//!     .build();
//!
//! let instance = Arc::new(ControllerInstance::new(blueprint, Host::new("app")));
//! let sink = Arc::new(RecordingSink::new());
//! let run = Engine::new().execute(ExecutionRequest::new(
//!     instance,
//!     "show",
//!     Request::new(http::Method::GET, "/users/show"),
//!     sink.clone(),
//! ))?;
//! assert_eq!(run.wait()?, None);
//! ```

pub mod adapter;
pub mod blueprint;
pub mod chain;
pub mod context;
pub mod controller;
pub mod engine;
pub mod event;
pub mod handler;
pub(crate) mod interceptor;

pub use blueprint::{ActionSpec, Blueprint, BlueprintBuilder, RECOGNIZED_VERBS};
pub use chain::{Chain, Next};
pub use context::{Exchange, ExecutionContext, Phase, StateBag};
pub use controller::ControllerInstance;
pub use engine::{Engine, ExecutionRequest, Fallthrough, PendingRun, WaitError};
pub use event::{EventTable, LifecycleEvent, UnknownEvent};
pub use handler::{Callback, Handler};
