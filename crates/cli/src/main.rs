mod cli;
mod command;
mod terminal;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use scorelens_client::{HttpScoreClient, UploadGate};
use scorelens_core::config::{self, Config};
use scorelens_core::{PageSize, Percentile, UploadFile};
use scorelens_session::{SessionController, SessionEvent};
use scorelens_view::summary::DEFAULT_BINS;
use scorelens_view::{histogram, RowFilter, SchemaRules};

use crate::cli::CliArgs;
use crate::command::Command;
use crate::terminal::Terminal;

fn load_config(args: &CliArgs) -> Result<Config> {
    config::load_dotenv();
    let mut config = match &args.profile {
        Some(profile) => Config::for_profile(profile)?,
        None => Config::from_env()?,
    };

    if let Some(url) = &args.server {
        config::validate_url(url)?;
        config.service.base_url = url.clone();
    }
    if let Some(size) = args.page_size {
        config.session.default_page_size = PageSize::new(size)?;
    }
    if let Some(percentile) = args.percentile {
        config.session.default_percentile = Percentile::new(percentile)?;
    }
    Ok(config)
}

/// Run the session loop until nothing is pending, echoing progress.
async fn drive(session: &mut SessionController, terminal: &Terminal) -> Result<()> {
    while let Some(event) = session.next_event().await {
        match event {
            SessionEvent::Progress { percent } => terminal.print_progress(percent)?,
            SessionEvent::CommitDispatched { percentile } => {
                terminal.print_info(&format!("re-scoring at p{percentile}"))?;
            }
            SessionEvent::StaleDiscarded { seq } => debug!(seq, "stale response dropped"),
            SessionEvent::Applied { kind, page } => debug!(?kind, page, "page applied"),
            SessionEvent::Failed(record) => debug!(kind = %record.kind, "fetch failed"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args).context("failed to load configuration")?;
    config.log_summary();
    let terminal = Terminal::new();

    // Gate the file before anything touches the network
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let gate = UploadGate::from_config(&config.upload);
    let upload = match gate.check(UploadFile::new(name.clone(), bytes)) {
        Ok(upload) => upload,
        Err(e) => {
            let record = e.to_record();
            terminal.print_error_panel(&scorelens_view::present(&record), false)?;
            return Err(e).context("file rejected");
        }
    };

    let client = HttpScoreClient::from_config(&config.service)
        .context("failed to build HTTP client")?;
    if !args.skip_health_check {
        match client.health().await {
            Ok(()) => info!(url = %client.base_url(), "scoring service is healthy"),
            Err(e) => warn!(
                url = %client.base_url(),
                error = %e,
                "health check failed, continuing"
            ),
        }
    }

    terminal.print_banner(&name, &config.service.redacted_url())?;

    let rules = SchemaRules::new(
        config.service.score_field.clone(),
        config.service.prediction_field.clone(),
    );
    let mut session =
        SessionController::with_rules(Arc::new(client), config.session.clone(), rules);
    let mut filter = RowFilter::default();

    session.select_file(upload);
    drive(&mut session, &terminal).await?;
    terminal.render(session.state(), &filter)?;

    // REPL loop
    loop {
        let Some(input) = terminal.read_input()? else {
            break;
        };
        let command = match command::parse(&input) {
            Ok(command) => command,
            Err(e) => {
                terminal.print_error(&format!("{e:#}"))?;
                continue;
            }
        };

        let state = session.state();
        let (page, page_size) = (state.page, state.page_size);
        let outcome = match command {
            Command::Quit => break,
            Command::Help => {
                terminal.print_info(command::HELP)?;
                continue;
            }
            Command::Histogram => {
                let bins = histogram(&state.rows, &state.range, DEFAULT_BINS);
                terminal.print_histogram(&bins)?;
                continue;
            }
            Command::Show => Ok(()),
            Command::Next => {
                if state.has_next() {
                    session.navigate(page + 1, page_size)
                } else {
                    terminal.print_info("already on the last page")?;
                    continue;
                }
            }
            Command::Prev => {
                if state.has_prev() {
                    session.navigate(page - 1, page_size)
                } else {
                    terminal.print_info("already on the first page")?;
                    continue;
                }
            }
            Command::Goto(target) => session.navigate(target, page_size),
            Command::Size(size) => session.navigate(1, size),
            Command::Percentile(percentile) => {
                session.set_draft_percentile(percentile);
                Ok(())
            }
            Command::Retry => session.retry(),
            Command::Filter(next) => {
                filter = next;
                Ok(())
            }
            Command::ClearFilter => {
                filter = RowFilter::default();
                Ok(())
            }
        };

        if let Err(e) = outcome {
            terminal.print_error(&e.to_string())?;
            continue;
        }
        drive(&mut session, &terminal).await?;
        terminal.render(session.state(), &filter)?;
    }

    terminal.print_info("Goodbye.")?;
    Ok(())
}
