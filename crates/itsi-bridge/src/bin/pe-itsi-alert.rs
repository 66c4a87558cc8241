//! ITSI alert action that forwards notable-event groups to Puppet Enterprise.
//!
//! splunkd runs `pe-itsi-alert --execute` and writes the alert settings JSON
//! to stdin.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use itsi_bridge::telemetry::{self, LogTarget};
use itsi_bridge::{ActionOutcome, AlertAction, AlertSettings, Config, SplunkConnector};

#[derive(Parser)]
#[command(name = "pe-itsi-alert")]
#[command(about = "Send ITSI notable events to Puppet Enterprise")]
#[command(version)]
struct Cli {
    /// Run the alert action with settings read from stdin
    #[arg(long)]
    execute: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::default();
    let _guard = telemetry::init(
        LogTarget::AlertAction,
        cli.verbose,
        config.log_dir.as_deref(),
        config.log_format,
    );

    if !cli.execute {
        error!("FATAL Unsupported execution mode (expected --execute flag)");
        bail!("Unsupported execution mode (expected --execute flag)");
    }

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read alert settings from stdin")?;

    let settings = AlertSettings::from_json(&input)
        .inspect_err(|e| error!(error = %e, "Failed to parse alert settings"))?;

    let connector = SplunkConnector::new();
    let action = AlertAction::connect(settings, &connector)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to initialize alert action"))?;

    match action.execute().await {
        Ok(ActionOutcome::Sent {
            request_id,
            event_count,
        }) => {
            info!(request_id = %request_id, event_count, "Alert action completed");
            Ok(())
        }
        Ok(ActionOutcome::Abandoned { reason }) => {
            info!(reason = %reason, "Alert action abandoned");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Alert action failed");
            Err(e.into())
        }
    }
}
