use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use http::Method;

use super::demo::run_demo;
use crate::config::Settings;
use crate::lifecycle::LifecycleEvent;
use crate::logging::{self, LogConfig, LogFormat};
use crate::runtime_config::RuntimeConfig;

/// Command-line interface for the controller lifecycle engine
#[derive(Parser)]
#[command(name = "brrtc")]
#[command(about = "BRRTController CLI", long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "BRRTC_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format (json or pretty)
    #[arg(long, global = true, env = "BRRTC_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a request through the built-in demo controllers
    Demo {
        /// Controller name (a `Controller` suffix is optional)
        #[arg(short, long, default_value = "users")]
        controller: String,

        /// Action name; the configured default action when omitted
        #[arg(short, long)]
        action: Option<String>,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Query parameters as `name=value`
        #[arg(short, long = "query")]
        query: Vec<String>,

        /// Settings file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Give up waiting for completion after this many milliseconds
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },
    /// Print the effective settings as YAML
    Settings {
        /// Settings file (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the lifecycle events in order
    Events,
}

/// Execute the CLI command provided by the user
///
/// # Errors
///
/// Returns an error if:
/// - The settings file cannot be read or parsed
/// - The method or a query parameter is malformed
/// - The demo run fails, stalls or times out
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        log_level: cli.log_level.clone(),
        format: LogFormat::parse(&cli.log_format),
        ..LogConfig::from_env()
    };
    logging::init_logging_with_config(&log_config)?;
    RuntimeConfig::from_env().apply();

    match &cli.command {
        Commands::Demo {
            controller,
            action,
            method,
            query,
            config,
            timeout_ms,
        } => {
            let settings = load_settings(config.as_ref())?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|e| anyhow::anyhow!("invalid method '{method}': {e}"))?;
            let query = query
                .iter()
                .map(|pair| {
                    pair.split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .ok_or_else(|| anyhow::anyhow!("query parameter '{pair}' is not name=value"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            let outcome = run_demo(
                settings,
                controller,
                action.as_deref(),
                method,
                &query,
                Duration::from_millis(*timeout_ms),
            )?;
            print!("{outcome}");
            Ok(())
        }
        Commands::Settings { config } => {
            let settings = load_settings(config.as_ref())?;
            print!("{}", serde_yaml::to_string(&settings)?);
            Ok(())
        }
        Commands::Events => {
            for (position, event) in LifecycleEvent::ALL.iter().enumerate() {
                println!("{}. {event}", position + 1);
            }
            Ok(())
        }
    }
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load(path),
        None => Ok(Settings::default()),
    }
}
