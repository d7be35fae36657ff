//! Unit tests for CLI commands

use std::time::Duration;

use clap::Parser;
use http::Method;

use crate::cli::{run_demo, Cli, Commands, DemoResult};
use crate::config::Settings;

#[test]
fn test_demo_command_defaults() {
    let cli = Cli::try_parse_from(["brrtc", "demo"]).unwrap();

    match cli.command {
        Commands::Demo {
            controller,
            action,
            method,
            query,
            timeout_ms,
            ..
        } => {
            assert_eq!(controller, "users");
            assert_eq!(action, None);
            assert_eq!(method, "GET");
            assert!(query.is_empty());
            assert_eq!(timeout_ms, 2000);
        }
        _ => panic!("Expected Demo command"),
    }
}

#[test]
fn test_demo_command_with_flags() {
    let cli = Cli::try_parse_from([
        "brrtc",
        "demo",
        "--action",
        "show",
        "--method",
        "post",
        "--query",
        "id=7",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(cli.log_level, "debug");
    match cli.command {
        Commands::Demo {
            action,
            method,
            query,
            ..
        } => {
            assert_eq!(action.as_deref(), Some("show"));
            assert_eq!(method, "post");
            assert_eq!(query, vec!["id=7".to_string()]);
        }
        _ => panic!("Expected Demo command"),
    }
}

#[test]
fn test_events_command_exists() {
    let cli = Cli::try_parse_from(["brrtc", "events"]).unwrap();
    assert!(matches!(cli.command, Commands::Events));
}

#[test]
fn test_demo_index_runs_full_lifecycle() {
    let outcome = run_demo(
        Settings::default(),
        "users",
        None,
        Method::GET,
        &[],
        Duration::from_secs(5),
    )
    .unwrap();

    assert_eq!(outcome.result, DemoResult::Responded);
    assert_eq!(
        outcome.trace,
        vec![
            "app.actionExecuting",
            "app.filter.auth",
            "users.filter.load",
            "users.index.filter",
            "users.index.GET",
            "app.actionExecuted",
            "app.resultExecuting",
            "app.resultExecuted",
            "users.resultExecuted",
        ]
    );
    let emission = outcome.emission.unwrap();
    assert_eq!(emission.header("content-type"), Some("application/json"));
    assert!(emission.body.as_text().unwrap().contains("demo-user"));
}

#[test]
fn test_demo_admin_redirects_before_action() {
    let outcome = run_demo(
        Settings::default(),
        "users",
        Some("admin"),
        Method::GET,
        &[],
        Duration::from_secs(5),
    )
    .unwrap();

    assert_eq!(outcome.result, DemoResult::Responded);
    assert_eq!(outcome.trace, vec!["app.actionExecuting", "app.filter.auth"]);
    let emission = outcome.emission.unwrap();
    assert_eq!(emission.status.as_u16(), 302);
    assert_eq!(emission.header("location"), Some("/login"));
}

#[test]
fn test_demo_legacy_falls_through() {
    let outcome = run_demo(
        Settings::default(),
        "users",
        Some("legacy"),
        Method::GET,
        &[],
        Duration::from_secs(5),
    )
    .unwrap();

    assert_eq!(outcome.result, DemoResult::FellThrough);
    assert!(outcome.emission.is_none());
    assert_eq!(outcome.trace.last().map(String::as_str), Some("app.actionExecuted"));
}

#[test]
fn test_demo_unknown_action() {
    let outcome = run_demo(
        Settings::default(),
        "users",
        Some("missing"),
        Method::GET,
        &[],
        Duration::from_secs(5),
    )
    .unwrap();

    assert!(matches!(outcome.result, DemoResult::NoHandler(_)));
    assert!(outcome.trace.is_empty());
}
