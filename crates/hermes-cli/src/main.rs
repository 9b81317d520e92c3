use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use hermes_client::{ClientConfig, ReqwestTransport};
use hermes_core::client::JobClient;
use hermes_core::job::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use hermes_core::{PollConfig, ResultShape, ScrapePayload};

#[derive(Parser)]
#[command(name = "hermes", version, about = "Submit and collect scraping API jobs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job and wait for its results
    Scrape {
        /// Path to the JSON job payload
        #[arg(short, long)]
        payload: PathBuf,

        /// Delay between status checks, in milliseconds
        #[arg(
            long,
            env = "HERMES_POLL_INTERVAL_MS",
            default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64
        )]
        interval_ms: u64,

        /// Give up waiting after this many seconds
        #[arg(
            long,
            env = "HERMES_POLL_TIMEOUT_SECS",
            default_value_t = DEFAULT_POLL_TIMEOUT.as_secs()
        )]
        timeout_secs: u64,
    },

    /// Show the current status of a job
    Status {
        /// Job identifier returned on submission
        #[arg(short, long)]
        job_id: String,
    },

    /// Fetch the results of a finished job
    Results {
        /// Job identifier returned on submission
        #[arg(short, long)]
        job_id: String,

        /// Decode entries as parsed search results
        #[arg(long, default_value_t = false)]
        parse: bool,

        /// Decode entries as custom-parsed objects (requires --parse)
        #[arg(long, default_value_t = false)]
        custom: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hermes=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = connect()?;

    match cli.command {
        Commands::Scrape {
            payload,
            interval_ms,
            timeout_secs,
        } => {
            let config = PollConfig::default()
                .with_poll_interval(Duration::from_millis(interval_ms))
                .with_timeout(Duration::from_secs(timeout_secs));
            cmd_scrape(&client, &payload, config).await?;
        }
        Commands::Status { job_id } => {
            let job = client
                .job_status(&job_id)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Commands::Results {
            job_id,
            parse,
            custom,
        } => {
            let decoded = client
                .fetch_results(&job_id, ResultShape::from_flags(parse, custom))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
    }

    Ok(())
}

/// Build the API client from HERMES_* environment variables.
fn connect() -> Result<JobClient<ReqwestTransport>> {
    let config = ClientConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    config.build().context("Failed to create API client")
}

fn read_payload(path: &Path) -> Result<ScrapePayload> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file: {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("Invalid JSON in payload file")?;
    ScrapePayload::from_json(&value).map_err(|e| anyhow::anyhow!(e))
}

async fn cmd_scrape(
    client: &JobClient<ReqwestTransport>,
    payload_path: &Path,
    config: PollConfig,
) -> Result<()> {
    let payload = read_payload(payload_path)?;
    let cancel = CancellationToken::new();

    let handle = client
        .scrape_with_token(&payload, config, &cancel)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(job_id = %handle.job_id(), shape = %payload.shape(), "Job submitted");

    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling poll");
            ctrl_c_token.cancel();
        }
    });

    let decoded = handle.await.map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        entries = decoded.results.len(),
        status_code = decoded.status_code,
        "Results received"
    );

    println!("{}", serde_json::to_string_pretty(&decoded)?);

    Ok(())
}
