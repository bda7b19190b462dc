use std::path::PathBuf;

use clap::Parser;

/// Browse anomaly scores for a CSV of SAP journal lines.
///
/// Uploads the file to the scoring service, then pages through the scored
/// rows in an interactive table.
#[derive(Parser, Debug)]
#[command(name = "scorelens", about = "Interactive anomaly-score browser")]
pub struct CliArgs {
    /// CSV file to score
    pub file: PathBuf,

    /// Scoring service base URL (overrides SCORE_API_URL)
    #[arg(long)]
    pub server: Option<String>,

    /// Rows per page: 20, 50 or 100
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Initial anomaly percentile, 90.0 to 99.9
    #[arg(long)]
    pub percentile: Option<f64>,

    /// Config profile (overrides SCORELENS_PROFILE)
    #[arg(long)]
    pub profile: Option<String>,

    /// Skip the service health check at startup
    #[arg(long)]
    pub skip_health_check: bool,
}
