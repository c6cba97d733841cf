use std::env;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "openapi")]
use std::fs;

use anyhow::anyhow;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use voxrelay::{
    ServerConfig, core::cleanup::spawn_cleanup_task, errors::set_include_details, routes,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Handle CLI commands
    let mut config_path: Option<PathBuf> = None;
    let mut args = env::args();
    let _ = args.next();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                config_path = Some(PathBuf::from(path));
            }
            #[cfg(feature = "openapi")]
            "openapi" => {
                let mut format = "yaml".to_string();
                let mut output: Option<PathBuf> = None;

                while let Some(arg) = args.next() {
                    match arg.as_str() {
                        "-f" | "--format" => {
                            format = args
                                .next()
                                .ok_or_else(|| anyhow!("--format requires a value (yaml or json)"))?;
                            if format != "yaml" && format != "json" {
                                anyhow::bail!("Invalid format '{}'. Must be 'yaml' or 'json'", format);
                            }
                        }
                        "-o" | "--output" => {
                            let path = args
                                .next()
                                .ok_or_else(|| anyhow!("--output requires a file path"))?;
                            output = Some(PathBuf::from(path));
                        }
                        other => {
                            anyhow::bail!(
                                "Unknown option '{}'. Use --format (yaml|json) or --output <file>",
                                other
                            );
                        }
                    }
                }

                let spec_content = if format == "json" {
                    voxrelay::docs::openapi::spec_json()
                        .map_err(|e| anyhow!("Failed to generate OpenAPI JSON: {}", e))?
                } else {
                    voxrelay::docs::openapi::spec_yaml()
                        .map_err(|e| anyhow!("Failed to generate OpenAPI YAML: {}", e))?
                };

                if let Some(output_path) = output {
                    fs::write(&output_path, &spec_content).map_err(|e| {
                        anyhow!("Failed to write to {}: {}", output_path.display(), e)
                    })?;
                    println!("OpenAPI spec written to {}", output_path.display());
                } else {
                    println!("{spec_content}");
                }

                return Ok(());
            }
            other => {
                #[cfg(feature = "openapi")]
                {
                    anyhow::bail!(
                        "Unknown argument '{other}'. Usage: voxrelay [-c|--config FILE] | openapi [-f yaml|json] [-o FILE]"
                    );
                }
                #[cfg(not(feature = "openapi"))]
                {
                    anyhow::bail!("Unknown argument '{other}'. Usage: voxrelay [-c|--config FILE]");
                }
            }
        }
    }

    // Load configuration
    let config = match &config_path {
        Some(path) => ServerConfig::from_file(path),
        None => ServerConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;

    set_include_details(config.is_development());
    let address = config.address();
    let cleanup_schedule = config.cleanup_schedule();

    // Create application state
    let app_state = AppState::new(config)
        .await
        .map_err(|e| anyhow!("Failed to initialize application state: {e}"))?;

    if app_state.orchestrator().registry().is_empty() {
        warn!("No TTS provider configured; every conversion will fail with service_unavailable");
    }

    let shutdown = CancellationToken::new();
    let cleanup_task = spawn_cleanup_task(
        Arc::clone(app_state.orchestrator()),
        cleanup_schedule,
        shutdown.clone(),
    );

    let app = routes::create_app(app_state);

    // Create listener
    let listener = TcpListener::bind(&address).await?;
    info!("Server listening on {address}");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(task) = cleanup_task {
        let _ = task.await;
    }

    Ok(())
}
