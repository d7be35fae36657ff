//! # BRRTController
//!
//! **BRRTController** is a coroutine-powered lifecycle engine for controller-based
//! request handling, built on the `may` runtime.
//!
//! ## Overview
//!
//! Given a resolved controller, an action and an HTTP verb, the engine runs a
//! fixed sequence of extension points as one deterministic execution:
//! `actionExecuting` listeners, filters, the action handler, `actionExecuted`
//! and `resultExecuting` listeners, the real response emission, and finally
//! `resultExecuted` listeners. However many finishing operations a handler
//! calls on the response, the post-action phases run exactly once.
//!
//! ## Architecture
//!
//! - **[`lifecycle`]** - blueprints, the suspension adapter, the chain runner,
//!   the result interceptor and the engine itself
//! - **[`response`]** - the intercepted response handle and the sink it emits to
//! - **[`dispatcher`]** - resolves requests to controller actions and caches
//!   controller instances per host
//! - **[`config`]** - controller settings (views, default action, JSONP)
//! - **[`runtime_config`]** - `may` scheduler configuration from the environment
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ## Request Flow
//!
//! ```text
//! Dispatcher::dispatch
//!   └─ Engine::execute
//!        ├─ actionExecuting listeners ─► blueprint filters ─► action filters
//!        ├─ verb handler
//!        │    ├─ finishing op ─► actionExecuted ─► resultExecuting ─► emit ─► resultExecuted ─► DONE
//!        │    └─ next.proceed() ─► actionExecuted ─► DONE (fallthrough)
//!        └─ PendingRun::wait / wait_timeout
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use brrtcontroller::{ActionSpec, Blueprint, Dispatcher, Handler, Host, RecordingSink, Request, RouteTarget};
//!
//! let base = Blueprint::builder("AppController")
//!     .filter(Handler::continuation(|cx, next| {
//!         cx.set("user", "alice");
//!         next.proceed();
//!         Ok(())
//!     }))
//!     .build();
//! let users = Blueprint::derive(&base, "usersController")
//!     .action("index", ActionSpec::new().get(Handler::continuation(|cx, _next| {
//!         cx.response().json(&cx.get("user"))
//!     })))
//!     .build();
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(users);
//!
//! let host = Host::new("app");
//! let request = Request::new(http::Method::GET, "/users").with_path_param("controller", "users");
//! let run = dispatcher.dispatch(&host, request, &RouteTarget::new(), Arc::new(RecordingSink::new()))?;
//! assert_eq!(run.wait()?, None);
//! ```
//!
//! ## Configuration
//!
//! | Variable | Purpose | Default |
//! |----------|---------|---------|
//! | `BRRTC_STACK_SIZE` | Coroutine stack size (decimal or `0x` hex) | `0x8000` |
//! | `BRRTC_WORKERS` | `may` worker threads | runtime default |
//! | `BRRTC_LOG_LEVEL` | Log level | `info` |
//! | `BRRTC_LOG_FORMAT` | `json` or `pretty` | `json` |
//! | `BRRTC_LOG_LOCATION` | Include file:line in logs | `false` |

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod ids;
pub mod lifecycle;
pub mod logging;
pub mod request;
pub mod response;
pub mod runtime_config;

pub use config::Settings;
pub use dispatcher::{DispatchError, Dispatcher, RouteTarget};
pub use error::{HandlerError, LookupError};
pub use host::Host;
pub use ids::{HostId, RequestId};
pub use lifecycle::{
    ActionSpec, Blueprint, ControllerInstance, Engine, Exchange, ExecutionRequest, Fallthrough,
    Handler, LifecycleEvent, Next, PendingRun, Phase, WaitError,
};
pub use request::Request;
pub use response::{Body, Emission, FinishingOp, RecordingSink, Response, ResponseSink};
