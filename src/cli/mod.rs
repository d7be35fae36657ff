//! # CLI Module
//!
//! Command-line entry points of the `brrtc` binary.
//!
//! ## Commands
//!
//! ### `demo`
//!
//! Runs a built-in base/derived controller pair through the dispatcher and
//! prints every lifecycle participant in the order it ran, followed by the
//! emitted response:
//!
//! ```bash
//! brrtc demo --controller users --action show --method GET
//! brrtc demo --action legacy          # falls through to the next route
//! brrtc demo --action admin           # a filter redirects before the action
//! ```
//!
//! ### `settings`
//!
//! Prints the effective controller settings (defaults merged with the
//! optional `--config` file) as YAML.
//!
//! ### `events`
//!
//! Lists the lifecycle events listeners can subscribe to, in order.

mod commands;
mod demo;

pub use commands::{run_cli, Cli, Commands};
pub use demo::{demo_dispatcher, run_demo, DemoOutcome, DemoResult};

#[cfg(test)]
mod tests;
