mod common;

use std::sync::Arc;

use brrtcontroller::lifecycle::{ActionSpec, Blueprint, ControllerInstance, LifecycleEvent};
use brrtcontroller::{Engine, Host, RecordingSink};
use common::fixtures::{execution, instance, WAIT};
use common::runtime::setup_may_runtime;
use common::trace::Trace;
use http::Method;

#[test]
fn test_three_level_ordering_law() {
    setup_may_runtime();
    let trace = Trace::new();
    let root = Blueprint::builder("Root")
        .on(LifecycleEvent::ActionExecuting, trace.tracer("root.executing"))
        .on(LifecycleEvent::ResultExecuted, trace.tracer("root.executed"))
        .filter(trace.tracer("root.filter1"))
        .filter(trace.tracer("root.filter2"))
        .build();
    let middle = Blueprint::derive(&root, "Middle")
        .on(LifecycleEvent::ActionExecuting, trace.tracer("middle.executing"))
        .on(LifecycleEvent::ResultExecuted, trace.tracer("middle.executed"))
        .filter(trace.tracer("middle.filter"))
        .build();
    let leaf = Blueprint::derive(&middle, "Leaf")
        .on(LifecycleEvent::ActionExecuting, trace.tracer("leaf.executing"))
        .on(LifecycleEvent::ResultExecuted, trace.tracer("leaf.executed"))
        .filter(trace.tracer("leaf.filter"))
        .action(
            "index",
            ActionSpec::new()
                .filter(trace.tracer("action.filter1"))
                .filter(trace.tracer("action.filter2"))
                .get(brrtcontroller::Handler::continuation(|cx, _next| {
                    cx.response().end()
                })),
        )
        .build();

    let controller = instance(leaf);
    let run = Engine::new()
        .execute(execution(
            &controller,
            "index",
            Method::GET,
            Arc::new(RecordingSink::new()),
        ))
        .unwrap();
    assert_eq!(run.wait_timeout(WAIT).unwrap(), None);

    assert_eq!(
        trace.snapshot(),
        [
            "root.executing",
            "middle.executing",
            "leaf.executing",
            "root.filter1",
            "root.filter2",
            "middle.filter",
            "leaf.filter",
            "action.filter1",
            "action.filter2",
            "root.executed",
            "middle.executed",
            "leaf.executed",
        ]
    );
}

#[test]
fn test_base_blueprint_is_not_affected_by_derivation() {
    let trace = Trace::new();
    let base = Blueprint::builder("Base")
        .filter(trace.tracer("base.filter"))
        .on(LifecycleEvent::ActionExecuted, trace.tracer("base.listener"))
        .build();
    let _derived = Blueprint::derive(&base, "Derived")
        .filter(trace.tracer("derived.filter"))
        .on(LifecycleEvent::ActionExecuted, trace.tracer("derived.listener"))
        .build();

    let base_instance = ControllerInstance::new(Arc::clone(&base), Host::new("app"));
    assert_eq!(base_instance.filters().len(), 1);
    assert_eq!(
        base_instance
            .events()
            .listeners(LifecycleEvent::ActionExecuted)
            .len(),
        1
    );
}

#[test]
fn test_instance_binds_merged_actions() {
    let trace = Trace::new();
    let base = Blueprint::builder("Base")
        .action("index", ActionSpec::new().get(trace.tracer("base.index")))
        .action(
            "update",
            ActionSpec::new()
                .put(trace.tracer("base.update"))
                .verb(Method::PATCH, trace.tracer("base.patch")),
        )
        .build();
    let derived_index = trace.tracer("derived.index");
    let derived = Blueprint::derive(&base, "Derived")
        .action("index", ActionSpec::new().post(derived_index.clone()))
        .action("empty", ActionSpec::new().filter(trace.tracer("orphan")))
        .build();

    let controller = ControllerInstance::new(derived, Host::new("app"));
    assert_eq!(controller.action_names(), vec!["index", "update"]);

    // the derived spec replaces the base one wholesale, verbs included
    let (_, handler) = controller.lookup("index", &Method::POST).unwrap();
    assert!(handler.ptr_eq(&derived_index));
    assert!(controller.lookup("index", &Method::GET).is_err());

    assert!(controller.lookup("update", &Method::PATCH).is_ok());
    assert!(controller.lookup("empty", &Method::GET).is_err());
}

#[test]
fn test_instances_share_blueprint_handlers() {
    let trace = Trace::new();
    let filter = trace.tracer("shared");
    let blueprint = Blueprint::builder("Shared").filter(filter.clone()).build();

    let first = ControllerInstance::new(Arc::clone(&blueprint), Host::new("one"));
    let second = ControllerInstance::new(blueprint, Host::new("two"));
    assert!(first.filters()[0].ptr_eq(&filter));
    assert!(second.filters()[0].ptr_eq(&filter));
    assert_ne!(first.host().id(), second.host().id());
}
