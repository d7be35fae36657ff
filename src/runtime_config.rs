//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the coroutine runtime that
//! drives suspending-style handlers.
//!
//! ## Environment Variables
//!
//! ### `BRRTC_STACK_SIZE`
//!
//! Stack size of the coroutines spawned for suspending handlers. Accepts
//! decimal (`32768`) or hexadecimal (`0x8000`) values. Default: `0x8000`.
//!
//! ### `BRRTC_WORKERS`
//!
//! Number of `may` worker threads. Unset leaves the runtime default.
//!
//! ## Usage
//!
//! ```rust
//! use brrtcontroller::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! config.apply();
//! ```

use std::env;

/// Default coroutine stack size (32 KB)
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    /// Worker thread count for the `may` scheduler
    pub workers: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            workers: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("BRRTC_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        let workers = env::var("BRRTC_WORKERS")
            .ok()
            .and_then(|val| val.trim().parse().ok())
            .filter(|n: &usize| *n > 0);
        RuntimeConfig {
            stack_size,
            workers,
        }
    }

    /// Push this configuration into the global `may` scheduler.
    ///
    /// Worker count only takes effect before the first coroutine is spawned.
    pub fn apply(&self) {
        let config = may::config();
        config.set_stack_size(self.stack_size);
        if let Some(workers) = self.workers {
            config.set_workers(workers);
        }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}
