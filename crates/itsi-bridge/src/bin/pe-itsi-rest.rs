//! Comment and response handlers for Puppet Enterprise callbacks.
//!
//! `comment` and `response` read one request envelope from stdin and print
//! `{"status": .., "payload": ..}`; `serve` exposes both over HTTP.

// The handler response goes to stdout
#![allow(clippy::disallowed_macros)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tracing::info;

use itsi_bridge::handlers::{self, RequestHandler};
use itsi_bridge::server::{self, AppState};
use itsi_bridge::telemetry::{self, LogTarget};
use itsi_bridge::{CommentHandler, Config, ResponseHandler, SplunkConnector};

#[derive(Parser)]
#[command(name = "pe-itsi-rest")]
#[command(about = "Apply Puppet Enterprise comments and responses to ITSI notable events")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a comment to a notable event (envelope on stdin)
    Comment,

    /// Apply a response to a notable event (envelope on stdin)
    Response,

    /// Serve both handlers over HTTP
    Serve {
        /// Port to listen on (defaults to PE_ITSI_PORT or 8095)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to listen on (defaults to PE_ITSI_BIND or 127.0.0.1)
        #[arg(short, long)]
        bind: Option<IpAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::default();
    let _guard = telemetry::init(
        LogTarget::RestHandler,
        cli.verbose,
        config.log_dir.as_deref(),
        config.log_format,
    );

    let connector = SplunkConnector::new();
    let response_handler = ResponseHandler::new(config.response_config());

    match cli.command {
        Commands::Comment => handle_stdin(&CommentHandler, &connector).await,
        Commands::Response => handle_stdin(&response_handler, &connector).await,
        Commands::Serve { port, bind } => {
            let state = AppState::new(Arc::new(connector), &config.splunkd_uri, response_handler);
            let app = server::build_router(state);

            let port = port.unwrap_or(config.port);
            let bind = bind.unwrap_or(config.bind);
            let addr = SocketAddr::new(bind, port);
            let listener = TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;

            info!(
                address = %addr,
                splunkd_uri = %config.splunkd_uri,
                "ITSI handler service listening"
            );

            axum::serve(listener, app).await.context("Server error")?;
            Ok(())
        }
    }
}

async fn handle_stdin(handler: &dyn RequestHandler, connector: &SplunkConnector) -> Result<()> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read request from stdin")?;

    let response = handlers::handle(handler, connector, &input).await;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
