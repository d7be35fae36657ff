mod common;

use std::sync::Arc;

use brrtcontroller::lifecycle::{ActionSpec, Blueprint, LifecycleEvent};
use brrtcontroller::{
    Body, Emission, Engine, Exchange, ExecutionRequest, Handler, HandlerError, RecordingSink,
    Request, WaitError,
};
use common::fixtures::{instance, WAIT};
use common::runtime::setup_may_runtime;
use http::{Method, StatusCode};
use serde_json::json;

/// Run a GET action whose body is `op` and return every emission.
fn respond_to<F>(request: Request, op: F) -> Result<Vec<Emission>, WaitError>
where
    F: Fn(&Exchange) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    setup_may_runtime();
    let blueprint = Blueprint::builder("Responses")
        .action(
            "index",
            ActionSpec::new().get(Handler::continuation(move |cx, _next| op(cx))),
        )
        .build();
    let controller = instance(blueprint);
    let sink = Arc::new(RecordingSink::new());
    let run = Engine::new()
        .execute(
            ExecutionRequest::new(controller, "index", request, sink.clone())
                .with_view_path("views/responses/index.html"),
        )
        .unwrap();
    run.wait_timeout(WAIT)?;
    Ok(sink.emissions())
}

fn respond<F>(op: F) -> Emission
where
    F: Fn(&Exchange) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    let mut emissions = respond_to(Request::new(Method::GET, "/responses"), op).unwrap();
    assert_eq!(emissions.len(), 1);
    emissions.remove(0)
}

#[test]
fn test_json_sets_content_type() {
    let emission = respond(|cx| cx.response().json(&json!({ "a": 1 })));
    assert_eq!(emission.status, StatusCode::OK);
    assert_eq!(emission.header("Content-Type"), Some("application/json"));
    assert_eq!(emission.body.as_text(), Some(r#"{"a":1}"#));
}

#[test]
fn test_explicit_content_type_is_kept() {
    let emission = respond(|cx| {
        cx.response()
            .set_header("content-type", "application/vnd.api+json");
        cx.response().json(&json!([]))
    });
    assert_eq!(
        emission.header("Content-Type"),
        Some("application/vnd.api+json")
    );
}

#[test]
fn test_jsonp_wraps_callback() {
    let request = Request::new(Method::GET, "/responses").with_query_param("callback", "handle");
    let emissions = respond_to(request, |cx| cx.response().jsonp(&json!({ "ok": true }))).unwrap();
    let emission = &emissions[0];
    assert_eq!(
        emission.header("content-type"),
        Some("text/javascript; charset=utf-8")
    );
    assert_eq!(
        emission.body.as_text(),
        Some(r#"/**/ typeof handle === 'function' && handle({"ok":true});"#)
    );
}

#[test]
fn test_jsonp_without_callback_is_json() {
    let emission = respond(|cx| cx.response().jsonp(&json!({ "ok": true })));
    assert_eq!(emission.header("content-type"), Some("application/json"));
    assert_eq!(emission.body.as_text(), Some(r#"{"ok":true}"#));
}

#[test]
fn test_send_defaults() {
    let text = respond(|cx| cx.response().send("<p>hi</p>"));
    assert_eq!(text.header("content-type"), Some("text/html; charset=utf-8"));

    let bytes = respond(|cx| cx.response().send(vec![0u8, 1, 2]));
    assert_eq!(
        bytes.header("content-type"),
        Some("application/octet-stream")
    );
    assert_eq!(bytes.body, Body::Bytes(vec![0, 1, 2]));
}

#[test]
fn test_status_and_headers_carry_into_emission() {
    let emission = respond(|cx| {
        cx.response()
            .status(StatusCode::CREATED)
            .set_header("X-Request-Id", cx.request_id().to_string());
        assert_eq!(cx.response().status_code(), StatusCode::CREATED);
        assert!(!cx.response().headers_sent());
        cx.response().end()
    });
    assert_eq!(emission.status, StatusCode::CREATED);
    assert!(emission.header("x-request-id").is_some());
    assert_eq!(emission.body, Body::Empty);
}

#[test]
fn test_redirect() {
    let found = respond(|cx| cx.response().redirect("/login"));
    assert_eq!(found.status, StatusCode::FOUND);
    assert_eq!(found.header("location"), Some("/login"));
    assert_eq!(found.body.as_text(), Some("Redirecting to /login"));

    let moved = respond(|cx| {
        cx.response()
            .redirect_with(StatusCode::MOVED_PERMANENTLY, "/new")
    });
    assert_eq!(moved.status, StatusCode::MOVED_PERMANENTLY);
}

#[test]
fn test_send_file_and_download() {
    let file = respond(|cx| cx.response().send_file("assets/report.pdf"));
    assert_eq!(file.header("content-type"), Some("application/pdf"));
    assert_eq!(file.body, Body::File("assets/report.pdf".into()));

    let download = respond(|cx| cx.response().download("assets/report.pdf", None));
    assert_eq!(
        download.header("content-disposition"),
        Some(r#"attachment; filename="report.pdf""#)
    );
    assert_eq!(download.header("content-type"), Some("application/pdf"));

    let renamed = respond(|cx| {
        cx.response()
            .download("assets/report.pdf", Some("q3.pdf"))
    });
    assert_eq!(
        renamed.header("content-disposition"),
        Some(r#"attachment; filename="q3.pdf""#)
    );
}

#[test]
fn test_render_merges_view_bag() {
    let emission = respond(|cx| {
        cx.set_view_data("title", "Dashboard");
        cx.response().render("home", json!({ "count": 2 }))
    });
    assert_eq!(emission.header("content-type"), Some("text/html; charset=utf-8"));
    let text = emission.body.as_text().unwrap();
    assert!(text.starts_with("home "));
    let locals: serde_json::Value = serde_json::from_str(&text["home ".len()..]).unwrap();
    assert_eq!(locals["count"], 2);
    assert_eq!(locals["viewBag"]["title"], "Dashboard");
}

#[test]
fn test_render_while_state_guard_is_held() {
    let emission = respond(|cx| {
        cx.set_view_data("title", "Inbox");
        let mut state = cx.state();
        state.insert("unread", 3);
        let unread = state.get("unread").cloned().unwrap_or_default();
        cx.response().render("inbox", json!({ "unread": unread }))
    });
    let text = emission.body.as_text().unwrap();
    let locals: serde_json::Value = serde_json::from_str(&text["inbox ".len()..]).unwrap();
    assert_eq!(locals["unread"], 3);
    assert_eq!(locals["viewBag"]["title"], "Inbox");
}

#[test]
fn test_view_uses_conventional_path() {
    let emission = respond(|cx| cx.response().view(serde_json::Value::Null));
    let text = emission.body.as_text().unwrap();
    assert!(text.starts_with("views/responses/index.html "));
}

#[test]
fn test_double_emission_is_ignored() {
    let emissions = respond_to(Request::new(Method::GET, "/responses"), |cx| {
        cx.response().send("first")?;
        assert!(cx.response().headers_sent());
        cx.response().send("second")?;
        cx.response().end()
    })
    .unwrap();
    assert_eq!(emissions.len(), 1);
    assert_eq!(emissions[0].body.as_text(), Some("first"));
}

#[test]
fn test_serialization_error_is_returned_before_interception() {
    setup_may_runtime();
    let blueprint = Blueprint::builder("Broken")
        .on(
            LifecycleEvent::ResultExecuting,
            Handler::continuation(|_cx, _next| Err(HandlerError::msg("must not run"))),
        )
        .action(
            "index",
            ActionSpec::new().get(Handler::continuation(|cx, _next| {
                let mut bad = std::collections::HashMap::new();
                bad.insert(vec![1u8], "non-string key");
                cx.response().json(&bad)
            })),
        )
        .build();
    let controller = instance(blueprint);
    let sink = Arc::new(RecordingSink::new());
    let cx = Engine::new()
        .run(ExecutionRequest::new(
            controller,
            "index",
            Request::new(Method::GET, "/"),
            sink.clone(),
        ))
        .unwrap();

    assert!(cx.is_failed());
    assert!(!cx.reached_events());
    assert!(sink.emissions().is_empty());
}
