//! Health probe client for container supervisors.
//!
//! Queries `GET /health` and translates the JSON verdict into a process
//! exit code: 0 for `"up"`, 1 for `"down"`, 2 when the endpoint cannot be
//! reached or the body cannot be parsed. Wire this up as the container
//! HEALTHCHECK command; an unreachable daemon is never reported healthy.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "taskpulse-probe",
    about = "Query a taskpulse /health endpoint and exit 0 iff it reports up",
    version
)]
struct Cli {
    /// Health endpoint to query
    #[arg(default_value = "http://localhost:8080/health")]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "5")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match probe(&cli.url, Duration::from_secs(cli.timeout)).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("probe failed: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn probe(url: &str, timeout: Duration) -> Result<bool> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")?;

    let body: serde_json::Value = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?
        .json()
        .await
        .context("health response was not valid JSON")?;

    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .with_context(|| format!("malformed health response: {body}"))?;

    Ok(status == "up")
}
