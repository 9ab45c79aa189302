use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vulnreport_core::{build_rows, csv_output, with_vulnerabilities, Error, SecureClient};

#[derive(Parser)]
#[command(
    name = "vulnreport",
    version,
    about = "Export runtime workload vulnerability scan results to a CSV report",
    long_about = "Retrieves every runtime workload scan result from the Secure API, keeps the \
                  ones with vulnerabilities, and flattens each image's packages and \
                  vulnerabilities into one CSV row per (package, vulnerability) pair."
)]
struct Cli {
    /// Authority component (host) of the Secure API URL
    #[arg(long)]
    secure_url_authority: String,

    /// API token, sent as a bearer header on every request
    #[arg(long)]
    api_token: String,

    /// Output CSV file path; must not already exist
    #[arg(long)]
    csv_file_name: PathBuf,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e:#}");
        error!("Request to download runtime scan results failed.");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Fail before any network activity if the report would be unwritable.
    if cli.csv_file_name.exists() {
        return Err(Error::OutputExists(cli.csv_file_name.clone()).into());
    }

    let client = SecureClient::new(&cli.secure_url_authority, &cli.api_token)?;
    let started = Instant::now();

    info!("Retrieving the list of runtime workload scan results...");
    let results = client.fetch_runtime_results().await?;
    info!("Found {} total scan results.", results.len());

    if results.is_empty() {
        info!("No scan results found.");
    } else {
        let total = results.len();
        let kept = with_vulnerabilities(results);
        info!("Found {} scan results with vulnerabilities.", kept.len());
        info!(
            "Found {} scan results with no vulnerabilities.",
            total - kept.len()
        );

        info!("Retrieving the runtime workload full scan results...");
        let details = client.fetch_scan_details(&kept).await?;

        let rows = build_rows(&kept, &details)?;
        csv_output::write_report(&cli.csv_file_name, &rows)?;

        println!(
            "{} wrote {} rows to {}",
            "OK".green().bold(),
            rows.len(),
            cli.csv_file_name.display()
        );
    }

    info!(
        "Elapsed execution time: {:.4} seconds",
        started.elapsed().as_secs_f64()
    );
    info!("Request for runtime scan results complete.");
    Ok(())
}
