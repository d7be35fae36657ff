//! # Dispatcher Module
//!
//! Glue between a router and the lifecycle engine. The dispatcher does not
//! match URLs: it receives a [`Request`](crate::request::Request) whose path
//! params were already extracted, plus a [`RouteTarget`] carrying the route's
//! defaults, and works out which controller action to run.
//!
//! ## Resolution
//!
//! - controller: path param `controller`, else the route default
//! - action: path param `action`, else the route default, else
//!   [`Settings::default_action`](crate::config::Settings::default_action)
//! - verb: the request method
//!
//! Controller instances are cached per host, so every host gets its own
//! binding of a blueprint and that binding lives as long as the dispatcher.
//!
//! ## Outcomes
//!
//! An unknown controller, action or verb is reported synchronously as a
//! [`DispatchError`]. Otherwise the caller gets a
//! [`PendingRun`](crate::lifecycle::PendingRun): `Ok(None)` means the
//! response was produced, `Ok(Some(Fallthrough))` means the action handed
//! control on and the caller should try its next route.

mod core;

pub use core::{DispatchError, Dispatcher, RouteTarget};
