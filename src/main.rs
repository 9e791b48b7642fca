//! botwire - WebSocket driver for JSON bot protocols
//!
//! Main entry point for the botwire CLI.

mod cli;
mod logging;
mod plugins;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use botwire_config::{Config, ConfigError, ConfigLoader, ConfigValidator};
use botwire_core::{CallerRegistry, PluginOrchestrator, ShutdownSignal};
use botwire_driver::{encode_unix_url, WsClient};
use botwire_protocols::{ApiCaller, EventHandler};

use cli::{Cli, Commands};
use plugins::LoginInfoPlugin;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::SocketUrl { path, ws_path }) => {
            println!("{}", encode_unix_url(&path, &ws_path));
            Ok(())
        }
        Some(Commands::Check) => check_config(&cli.config, cli.url),
        None | Some(Commands::Run) => {
            let config = load_config(&cli.config, cli.url)?;
            let _guard = logging::init_tracing(&config.logging)?;
            run_driver(config).await
        }
    }
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path, url: Option<String>) -> anyhow::Result<Config> {
    let mut config = match ConfigLoader::load(path) {
        Ok(config) => config,
        Err(ConfigError::NotFound(_)) => {
            eprintln!("Config file {} not found, using defaults", path.display());
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };
    if let Some(url) = url {
        config.driver.url = url;
    }
    Ok(config)
}

fn check_config(path: &Path, url: Option<String>) -> anyhow::Result<()> {
    let mut config = ConfigLoader::load(path)?;
    if let Some(url) = url {
        config.driver.url = url;
    }
    let result = ConfigValidator::validate(&config);
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for err in &result.errors {
        println!("error: {}: {}", err.path, err.message);
    }
    let warnings = result.into_result()?;
    println!(
        "{} is valid ({} warnings)",
        path.display(),
        warnings.len()
    );
    Ok(())
}

async fn run_driver(config: Config) -> anyhow::Result<()> {
    info!("Starting botwire v{}", env!("CARGO_PKG_VERSION"));

    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    let callers = Arc::new(CallerRegistry::new());
    let plugins = Arc::new(PluginOrchestrator::new());
    plugins.register(Arc::new(LoginInfoPlugin::new(
        config.driver.self_ids.clone(),
        callers.clone(),
    )));

    let mut client = WsClient::from_config(&config.driver, callers).with_plugins(plugins);
    register_log_hooks(&mut client);
    let client = Arc::new(client);

    let shutdown = ShutdownSignal::new();
    shutdown.listen_for_interrupt();

    if let Err(e) = client.run(event_logger(), shutdown).await {
        error!(error = %e, "Driver stopped");
        return Err(e.into());
    }
    info!("botwire stopped");
    Ok(())
}

fn register_log_hooks(client: &mut WsClient) {
    let hooks = client.hooks_mut();
    hooks.add_transport_hook(|| async {
        info!("Transport established");
        Ok(())
    });
    hooks.add_all_connected_hook(|ctxs| async move {
        let live = ctxs.iter().filter(|ctx| ctx.has_caller()).count();
        info!(live, configured = ctxs.len(), "All identities connected");
        Ok(())
    });
    hooks.add_disconnect_hook(|ctxs| async move {
        info!(identities = ctxs.len(), "Disconnected");
        Ok(())
    });
}

/// Event handler for the bare binary: events are only logged.
fn event_logger() -> Arc<dyn EventHandler> {
    Arc::new(|payload: &str, _caller: Arc<dyn ApiCaller>| {
        match serde_json::from_str::<Value>(payload) {
            Ok(event) => debug!(
                post_type = event["post_type"].as_str().unwrap_or_default(),
                "Event: {}",
                payload
            ),
            Err(e) => debug!(error = %e, "Undecodable event"),
        }
    })
}
