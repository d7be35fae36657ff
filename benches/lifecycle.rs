use std::sync::Arc;
use std::time::Duration;

use brrtcontroller::lifecycle::{ActionSpec, Blueprint, ControllerInstance, LifecycleEvent};
use brrtcontroller::{
    Dispatcher, Engine, ExecutionRequest, Handler, Host, RecordingSink, Request, ResponseSink,
    RouteTarget,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::json;

fn proceed() -> Handler {
    Handler::continuation(|_cx, next| {
        next.proceed();
        Ok(())
    })
}

fn controller() -> Arc<ControllerInstance> {
    let base = Blueprint::builder("Base")
        .on(LifecycleEvent::ActionExecuting, proceed())
        .on(LifecycleEvent::ActionExecuted, proceed())
        .on(LifecycleEvent::ResultExecuting, proceed())
        .on(LifecycleEvent::ResultExecuted, proceed())
        .filter(proceed())
        .build();
    let derived = Blueprint::derive(&base, "Derived")
        .filter(Handler::continuation(|cx, next| {
            cx.set("user", "bench");
            next.proceed();
            Ok(())
        }))
        .action(
            "index",
            ActionSpec::new()
                .filter(proceed())
                .get(Handler::continuation(|cx, _next| {
                    cx.response().json(&json!({ "user": cx.get("user") }))
                })),
        )
        .action("legacy", ActionSpec::new().get(proceed()))
        .build();
    Arc::new(ControllerInstance::new(derived, Host::new("bench")))
}

fn bench_engine(c: &mut Criterion) {
    let controller = controller();
    let engine = Engine::new();

    c.bench_function("lifecycle_finish", |b| {
        b.iter(|| {
            let sink: Arc<dyn ResponseSink> = Arc::new(RecordingSink::new());
            let request = Request::new(Method::GET, "/derived/index");
            let run = engine
                .execute(ExecutionRequest::new(
                    Arc::clone(&controller),
                    "index",
                    request,
                    sink,
                ))
                .unwrap();
            black_box(run.wait().unwrap());
        })
    });

    c.bench_function("lifecycle_fallthrough", |b| {
        b.iter(|| {
            let sink: Arc<dyn ResponseSink> = Arc::new(RecordingSink::new());
            let request = Request::new(Method::GET, "/derived/legacy");
            let run = engine
                .execute(ExecutionRequest::new(
                    Arc::clone(&controller),
                    "legacy",
                    request,
                    sink,
                ))
                .unwrap();
            black_box(run.wait().unwrap());
        })
    });
}

fn bench_suspending(c: &mut Criterion) {
    may::config().set_stack_size(0x8000);
    let blueprint = Blueprint::builder("Suspending")
        .filter(Handler::suspending(|cx| {
            cx.set("step", 1);
            Ok(())
        }))
        .action(
            "index",
            ActionSpec::new().get(Handler::continuation(|cx, _next| cx.response().end())),
        )
        .build();
    let controller = Arc::new(ControllerInstance::new(blueprint, Host::new("bench")));
    let engine = Engine::new();

    c.bench_function("lifecycle_suspending_filter", |b| {
        b.iter(|| {
            let sink: Arc<dyn ResponseSink> = Arc::new(RecordingSink::new());
            let run = engine
                .execute(ExecutionRequest::new(
                    Arc::clone(&controller),
                    "index",
                    Request::new(Method::GET, "/"),
                    sink,
                ))
                .unwrap();
            black_box(run.wait_timeout(Duration::from_secs(5)).unwrap());
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let users = Blueprint::builder("usersController")
        .action(
            "index",
            ActionSpec::new().get(Handler::continuation(|cx, _next| cx.response().send("ok"))),
        )
        .build();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(users);
    let host = Host::new("bench");

    c.bench_function("dispatch_cached_instance", |b| {
        b.iter(|| {
            let sink: Arc<dyn ResponseSink> = Arc::new(RecordingSink::new());
            let request =
                Request::new(Method::GET, "/users").with_path_param("controller", "users");
            let run = dispatcher
                .dispatch(&host, request, &RouteTarget::new(), sink)
                .unwrap();
            black_box(run.wait().unwrap());
        })
    });
}

criterion_group!(benches, bench_engine, bench_suspending, bench_dispatch);
criterion_main!(benches);
