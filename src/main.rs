//! MCP Hub server binary.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use mcp_hub::config::{Args, Config, Transport};
use mcp_hub::mcp::transport::StdioTransport;
use mcp_hub::{build_server, logging, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // Build configuration from args
    let config: Arc<Config> = Arc::new(args.into());

    logging::init(config.log_level, config.log_json).context("failed to initialize logging")?;

    info!("MCP Hub v{}", VERSION);
    info!("Transport: {:?}", config.transport);
    info!("Data directory: {}", config.data_dir.display());

    let server = Arc::new(build_server(&config));
    info!(
        "Registered {} tools, {} resource providers, {} prompt providers",
        server.tools().len(),
        server.resources().len(),
        server.prompts().len()
    );

    match config.transport {
        Transport::Stdio => {
            info!("Starting stdio transport...");
            tokio::select! {
                result = server.run(StdioTransport::stdio()) => {
                    result.context("stdio transport failed")?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                }
            }
        }
        Transport::Http => {
            info!("Starting HTTP transport on {}...", config.bind_addr());
            mcp_hub::http::start_server(&config, server)
                .await
                .context("HTTP server failed")?;
        }
    }

    Ok(())
}
