//! hookweave demo CLI — a teaching surface over the plugin framework, not
//! a production service. Wires configuration and logging the way
//! `suzuki-filehub`'s `src/main.rs` does, then drives the framework
//! through a handful of subcommands.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use hookweave_core::{ClosureHandler, FnPlugin, Framework, FrameworkConfig, HookError, HookOutcome};

#[derive(Parser)]
#[command(name = "hookweave", version, about = "Event-driven plugin framework demo")]
struct Cli {
    /// Path to a TOML configuration file (optional).
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a demo logging plugin, dispatch a sample hook through
    /// it, and print what happened.
    Demo,
    /// Print a capability-introspection snapshot.
    Introspect,
    /// Drive the state tracker through a sample transition and print the
    /// resulting history.
    State,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(cli.command, config).await {
        tracing::error!("hookweave error: {e}");
        std::process::exit(1);
    }
}

fn load_configuration(path: Option<&str>) -> Result<FrameworkConfig, HookError> {
    tracing::info!(path = ?path, "loading configuration");
    FrameworkConfig::load(path)
}

fn init_logging(config: &FrameworkConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    if config.logging.json {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt().pretty().with_env_filter(filter).with_target(true).init();
    }
}

async fn run(command: Command, config: FrameworkConfig) -> Result<(), HookError> {
    match command {
        Command::Demo => run_demo(config).await,
        Command::Introspect => run_introspect(config).await,
        Command::State => run_state(config).await,
    }
}

async fn run_demo(mut config: FrameworkConfig) -> Result<(), HookError> {
    config.features = Some(vec!["introspection".to_string()]);
    let framework = Framework::new(config).await?;

    framework
        .use_plugin(Box::new(FnPlugin::new("logger", |ctx| async move {
            ctx.on(
                "agent:run",
                0,
                Arc::new(ClosureHandler::new(|event| async move {
                    tracing::info!(?event, "agent:run dispatched");
                    Ok(HookOutcome::ok(json!({ "logged": true })))
                })),
            )
            .await?;
            Ok(())
        })))
        .await?;

    let result = framework
        .dispatch("agent:run", json!({ "task": "greet" }))
        .await?;
    println!("{}", serde_json::to_string_pretty(&result).unwrap());
    Ok(())
}

async fn run_introspect(mut config: FrameworkConfig) -> Result<(), HookError> {
    config.features = Some(vec!["introspection".to_string()]);
    let framework = Framework::new(config).await?;
    let snapshot = framework.dispatch("api:introspect", json!({})).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot).unwrap());
    Ok(())
}

async fn run_state(mut config: FrameworkConfig) -> Result<(), HookError> {
    config.features = Some(vec!["state".to_string()]);
    let framework = Framework::new(config).await?;

    framework
        .dispatch("api:setState", json!({ "state": "loading" }))
        .await?;
    framework
        .dispatch("api:setState", json!({ "state": "success", "data": { "n": 1 } }))
        .await?;

    let history = framework.dispatch("api:getStateHistory", json!({})).await?;
    println!("{}", serde_json::to_string_pretty(&history).unwrap());
    Ok(())
}
