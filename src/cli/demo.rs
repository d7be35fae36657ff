//! Built-in controllers for `brrtc demo`.
//!
//! `AppController` is the base blueprint: it listens on every lifecycle event
//! and carries an auth filter that redirects the `admin` action before it
//! runs. `usersController` derives from it and adds a suspending filter plus
//! a handful of actions that exercise each way a lifecycle can end.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use http::{Method, StatusCode};
use serde_json::json;

use crate::config::Settings;
use crate::dispatcher::{Dispatcher, RouteTarget};
use crate::host::Host;
use crate::lifecycle::{ActionSpec, Blueprint, Handler, LifecycleEvent};
use crate::request::Request;
use crate::response::{Emission, RecordingSink, ResponseSink};

type Trace = Arc<Mutex<Vec<String>>>;

fn record(trace: &Trace, label: &str) {
    trace
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(label.to_string());
}

/// Listener that records `label` and proceeds.
fn tracer(trace: &Trace, label: &'static str) -> Handler {
    let trace = Arc::clone(trace);
    Handler::continuation(move |_cx, next| {
        record(&trace, label);
        next.proceed();
        Ok(())
    })
}

/// Dispatcher with the demo blueprints registered; participants append to `trace`.
#[must_use]
pub fn demo_dispatcher(trace: Trace) -> Dispatcher {
    let auth = {
        let trace = Arc::clone(&trace);
        Handler::continuation(move |cx, next| {
            record(&trace, "app.filter.auth");
            if cx.action() == "admin" {
                return cx.response().redirect("/login");
            }
            cx.set("user", "demo-user");
            next.proceed();
            Ok(())
        })
    };

    let app = Blueprint::builder("AppController")
        .on(
            LifecycleEvent::ActionExecuting,
            tracer(&trace, "app.actionExecuting"),
        )
        .on(
            LifecycleEvent::ActionExecuted,
            tracer(&trace, "app.actionExecuted"),
        )
        .on(
            LifecycleEvent::ResultExecuting,
            tracer(&trace, "app.resultExecuting"),
        )
        .on(
            LifecycleEvent::ResultExecuted,
            tracer(&trace, "app.resultExecuted"),
        )
        .filter(auth)
        .action(
            "health",
            ActionSpec::new().get(Handler::continuation(|cx, _next| {
                cx.response().send("ok")
            })),
        )
        .build();

    let load_users = {
        let trace = Arc::clone(&trace);
        Handler::suspending(move |cx| {
            may::coroutine::sleep(Duration::from_millis(5));
            record(&trace, "users.filter.load");
            cx.set("users", json!(["ada", "grace", "linus"]));
            Ok(())
        })
    };

    let index = {
        let trace = Arc::clone(&trace);
        Handler::continuation(move |cx, _next| {
            record(&trace, "users.index.GET");
            cx.response().json(&json!({
                "user": cx.get("user"),
                "users": cx.get("users"),
            }))
        })
    };

    let show = {
        let trace = Arc::clone(&trace);
        Handler::continuation(move |cx, _next| {
            record(&trace, "users.show.GET");
            let id = cx.request().query_param("id").unwrap_or("0").to_string();
            cx.set_view_data("title", format!("User {id}"));
            cx.response().view(json!({ "id": id }))
        })
    };

    let legacy = {
        let trace = Arc::clone(&trace);
        Handler::continuation(move |_cx, next| {
            record(&trace, "users.legacy.GET");
            next.proceed();
            Ok(())
        })
    };

    let create = {
        let trace = Arc::clone(&trace);
        Handler::suspending(move |cx| {
            record(&trace, "users.create.POST");
            cx.response().status(StatusCode::CREATED);
            cx.response().json(&json!({ "created": true }))
        })
    };

    let users = Blueprint::derive(&app, "usersController")
        .filter(load_users)
        .on(
            LifecycleEvent::ResultExecuted,
            tracer(&trace, "users.resultExecuted"),
        )
        .action(
            "index",
            ActionSpec::new()
                .filter(tracer(&trace, "users.index.filter"))
                .get(index),
        )
        .action("show", ActionSpec::new().get(show))
        .action("legacy", ActionSpec::new().get(legacy))
        .action(
            "admin",
            ActionSpec::new().get(tracer(&trace, "users.admin.GET")),
        )
        .action("create", ActionSpec::new().post(create))
        .build();

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(app);
    dispatcher.register(users);
    dispatcher
}

/// How a demo request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoResult {
    /// A response was emitted
    Responded,
    /// The action handed control on; a router would try its next route
    FellThrough,
    /// Nothing matched the controller, action or verb
    NoHandler(String),
}

/// Participant trace and response of one demo request.
#[derive(Debug, Clone)]
pub struct DemoOutcome {
    pub trace: Vec<String>,
    pub result: DemoResult,
    pub emission: Option<Emission>,
}

impl fmt::Display for DemoOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "lifecycle:")?;
        for (position, label) in self.trace.iter().enumerate() {
            writeln!(f, "  {:>2}. {label}", position + 1)?;
        }
        match &self.result {
            DemoResult::Responded => writeln!(f, "result: responded")?,
            DemoResult::FellThrough => writeln!(f, "result: fallthrough")?,
            DemoResult::NoHandler(reason) => writeln!(f, "result: {reason}")?,
        }
        if let Some(emission) = &self.emission {
            writeln!(f, "response: {}", emission.status)?;
            for (name, value) in &emission.headers {
                writeln!(f, "  {name}: {value}")?;
            }
            match emission.body.as_text() {
                Some(text) => writeln!(f, "  {text}")?,
                None => writeln!(f, "  {:?}", emission.body)?,
            }
        }
        Ok(())
    }
}

/// Dispatch one request to the demo controllers and wait for it.
///
/// # Errors
///
/// Returns an error if the run fails, stalls or outlives `timeout`.
pub fn run_demo(
    settings: Settings,
    controller: &str,
    action: Option<&str>,
    method: Method,
    query: &[(String, String)],
    timeout: Duration,
) -> anyhow::Result<DemoOutcome> {
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = demo_dispatcher(Arc::clone(&trace));
    let host = Host::with_settings("demo", settings);

    let path = format!("/{controller}/{}", action.unwrap_or_default());
    let mut request = Request::new(method, path).with_path_param("controller", controller);
    if let Some(action) = action {
        request = request.with_path_param("action", action);
    }
    for (name, value) in query {
        request = request.with_query_param(name, value.clone());
    }

    let sink = Arc::new(RecordingSink::new());
    let emit_to: Arc<dyn ResponseSink> = Arc::<RecordingSink>::clone(&sink);
    let result = match dispatcher.dispatch(&host, request, &RouteTarget::new(), emit_to) {
        Err(err) => DemoResult::NoHandler(err.to_string()),
        Ok(pending) => match pending.wait_timeout(timeout)? {
            None => DemoResult::Responded,
            Some(_) => DemoResult::FellThrough,
        },
    };

    let trace = trace
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    Ok(DemoOutcome {
        trace,
        result,
        emission: sink.last(),
    })
}
