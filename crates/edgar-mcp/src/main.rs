//! edgar-mcp-server: MCP server for SEC EDGAR data
//!
//!   edgar-mcp-server                        # HTTP+SSE on HOST:PORT
//!   edgar-mcp-server --http 127.0.0.1:4100  # HTTP+SSE on a given address
//!   edgar-mcp-server --stdio                # stdio only
//!   edgar-mcp-server --stdio --http         # both
//!
//! SEC_API_MAIL and SEC_API_COMPANY must be set (a `.env` file is read).

use anyhow::Result;
use clap::Parser;
use edgar_core::EdgarClient;
use edgar_mcp::{
    tools::build_registry,
    transport::{HttpSseTransport, McpHandler, StdioTransport, Transport},
    Config, InteractionLog, McpServer,
};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "edgar-mcp-server")]
#[command(about = "MCP server for SEC EDGAR filings and XBRL data")]
struct Cli {
    /// Run stdio transport
    #[arg(long)]
    stdio: bool,

    /// Run HTTP+SSE transport (default HOST:PORT from the environment)
    #[arg(long, value_name = "ADDR", num_args = 0..=1, default_missing_value = "")]
    http: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Server name override
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // stderr: stdout belongs to the stdio transport
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    info!(version = edgar_mcp::SERVER_VERSION, api = %config.api_base, "Starting edgar-mcp-server");

    let client = EdgarClient::builder(&config.contact)
        .base_url(&config.api_base)
        .timeout(config.upstream_timeout)
        .build()?;
    let registry = Arc::new(build_registry(config.enable_financial_tools)?);

    let mut server = McpServer::new(registry, Arc::new(client), config.limits).with_name(cli.name);
    if let Some(dir) = &config.interaction_log_dir {
        info!(dir = %dir.display(), "Interaction log enabled");
        server = server.with_interaction_log(InteractionLog::new(dir));
    }

    let http_addr = match cli.http {
        Some(addr) if !addr.is_empty() => Some(addr),
        Some(_) => Some(config.bind_addr()),
        None if !cli.stdio => Some(config.bind_addr()),
        None => None,
    };

    run_transports(Arc::new(server), cli.stdio, http_addr, config.shared_secret).await
}

async fn run_transports<H>(
    server: Arc<H>,
    run_stdio: bool,
    http_addr: Option<String>,
    shared_secret: Option<String>,
) -> Result<()>
where
    H: McpHandler + 'static,
{
    let mut handles = Vec::new();

    if let Some(addr) = http_addr {
        let server = server.clone();
        handles.push(tokio::spawn(async move {
            HttpSseTransport::new(addr)
                .with_shared_secret(shared_secret)
                .serve(server)
                .await
        }));
    }

    // Run stdio in main task if enabled (blocks)
    if run_stdio {
        StdioTransport::new().serve(server).await?;
    } else {
        for handle in handles {
            handle.await??;
        }
    }

    Ok(())
}
