use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};

use scorelens_core::ScoredRow;
use scorelens_session::{Phase, SessionState};
use scorelens_view::{
    color_for, format_cell, summarize, ColumnSpec, ErrorPresentation, HistogramBin, RenderKind,
    RowFilter, ScoreColor, Severity,
};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const PROMPT: Color = Color::Green;
    const HEADER: Color = Color::Magenta;
    const ERROR: Color = Color::Red;
    const WARN: Color = Color::Yellow;
    const DIM: Color = Color::DarkGrey;
    const ANOMALY: Color = Color::Red;
    const NORMAL: Color = Color::Green;
}

/// Widest a table cell may get before it is truncated.
const MAX_CELL_WIDTH: usize = 24;
const HISTOGRAM_WIDTH: usize = 40;

/// Renders session snapshots to stdout.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    pub fn print_banner(&self, file_name: &str, service_url: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("scorelens"),
            ResetColor,
            Print(format!(" - {file_name}\n")),
            SetForegroundColor(Colors::DIM),
            Print(format!("Service: {service_url}\n")),
            Print("Type 'help' for commands, 'quit' to exit.\n"),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Read one command line. `None` on end of input.
    pub fn read_input(&self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::PROMPT),
            Print("scorelens> "),
            ResetColor,
        )?;
        stdout.flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    pub fn print_progress(&self, percent: u8) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("\rUploading... {percent:>3}%")),
            ResetColor,
        )?;
        if percent >= 100 {
            execute!(stdout, Print("\r                 \r"))?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Table, summary line and (if any) the error panel.
    pub fn render(&self, state: &SessionState, filter: &RowFilter) -> Result<()> {
        if let Some(columns) = &state.columns {
            let rows = filter.apply(&state.rows);
            self.print_table(columns, &rows, state)?;
            if filter.is_active() {
                self.print_info(&format!(
                    "filter: {} of {} rows on this page shown",
                    rows.len(),
                    state.rows.len()
                ))?;
            }
        }
        self.print_summary(state)?;
        if state.phase == Phase::Error {
            if let Some(error) = &state.last_error {
                let panel = scorelens_view::present(error);
                self.print_error_panel(&panel, error.retryable)?;
            }
        }
        Ok(())
    }

    fn print_table(
        &self,
        columns: &[ColumnSpec],
        rows: &[&ScoredRow],
        state: &SessionState,
    ) -> Result<()> {
        let mut stdout = io::stdout();
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| columns.iter().map(|c| truncate(&format_cell(c, row))).collect())
            .collect();
        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(c.display_name.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .min(MAX_CELL_WIDTH)
            })
            .collect();

        execute!(stdout, SetForegroundColor(Colors::HEADER))?;
        for (column, width) in columns.iter().zip(&widths) {
            let header = pad(&truncate(&column.display_name), *width, column.render_kind);
            execute!(stdout, Print(header), Print(" "))?;
        }
        let rule = "-".repeat(widths.iter().map(|w| w + 1).sum());
        execute!(
            stdout,
            ResetColor,
            Print("\n"),
            SetForegroundColor(Colors::DIM),
            Print(rule),
            ResetColor,
            Print("\n"),
        )?;

        for (row, line) in rows.iter().zip(&cells) {
            for ((column, width), text) in columns.iter().zip(&widths).zip(line) {
                let padded = pad(text, *width, column.render_kind);
                match column.render_kind {
                    RenderKind::ScoreBadge => {
                        let color = score_color(color_for(row.score, &state.range));
                        execute!(stdout, SetForegroundColor(color), Print(padded), ResetColor)?;
                    }
                    RenderKind::PredictionChip => {
                        let color = if row.is_anomaly { Colors::ANOMALY } else { Colors::NORMAL };
                        execute!(stdout, SetForegroundColor(color), Print(padded), ResetColor)?;
                    }
                    _ => execute!(stdout, Print(padded))?,
                }
                execute!(stdout, Print(" "))?;
            }
            execute!(stdout, Print("\n"))?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn print_summary(&self, state: &SessionState) -> Result<()> {
        let mut stdout = io::stdout();
        let summary = summarize(&state.rows, &state.range, state.threshold.committed);

        let first = state.rows.first().map(|r| r.row_id).unwrap_or(0);
        let last = state.rows.last().map(|r| r.row_id).unwrap_or(0);
        let mut line = format!(
            "page {}/{} | rows {}-{} of {} | anomalies {} ({:.1}%) | nominal {:.1}% | p{}",
            state.page,
            state.total_pages.max(1),
            first,
            last,
            state.total_rows,
            summary.anomalies,
            summary.flagged_ratio * 100.0,
            summary.nominal_rate * 100.0,
            state.threshold.committed,
        );
        if let Some(value) = state.threshold.value {
            line.push_str(&format!(" threshold {value:.4}"));
        }
        if state.threshold.is_dirty() {
            line.push_str(&format!(" (pending p{})", state.threshold.draft));
        }
        let mix = [
            (Severity::Low, summary.severity.low),
            (Severity::Medium, summary.severity.medium),
            (Severity::High, summary.severity.high),
        ]
        .iter()
        .map(|(severity, count)| format!("{} {count}", severity.label()))
        .collect::<Vec<_>>()
        .join(" / ");
        line.push_str(&format!(" | severity {mix}"));

        execute!(stdout, SetForegroundColor(Colors::DIM), Print(line), Print("\n"), ResetColor)?;
        if state.is_loading() {
            execute!(stdout, SetForegroundColor(Colors::WARN), Print("loading...\n"), ResetColor)?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_error_panel(&self, panel: &ErrorPresentation, retryable: bool) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("\n[{}]\n", panel.title)),
            ResetColor,
            Print(format!("  {}\n", panel.description)),
            SetForegroundColor(Colors::DIM),
            Print(format!("  {}\n", panel.hint)),
            ResetColor,
        )?;
        if retryable {
            execute!(
                stdout,
                SetForegroundColor(Colors::WARN),
                Print("  type 'retry' to try again\n"),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_histogram(&self, bins: &[HistogramBin]) -> Result<()> {
        if bins.is_empty() {
            return self.print_info("no scores yet");
        }
        let mut stdout = io::stdout();
        let peak = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        for bin in bins {
            let bar = "#".repeat(bin.count * HISTOGRAM_WIDTH / peak);
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!("{:>15} ", bin.label)),
                ResetColor,
                Print(format!("{bar} {}\n", bin.count)),
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

fn score_color(color: ScoreColor) -> Color {
    let (r, g, b) = color.token.to_rgb();
    Color::Rgb { r, g, b }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let kept: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    format!("{kept}...")
}

/// Numbers right-aligned, everything else left-aligned.
fn pad(text: &str, width: usize, kind: RenderKind) -> String {
    match kind {
        RenderKind::NumericFormatted | RenderKind::ScoreBadge => format!("{text:>width$}"),
        _ => format!("{text:<width$}"),
    }
}
