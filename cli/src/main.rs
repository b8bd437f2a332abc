//! rext CLI - runs annotate and review passes against a file in the terminal.
//!
//! # Architecture
//!
//! The CLI bridges [`rext_engine`] (passes and decoration lifecycle) and the
//! terminal: [`terminal::TerminalEditor`] plays the editor, and
//! [`panel::ReportPanels`] plays the panel host.
//!
//! ```text
//! main() -> Cli::parse() -> ReviewSession::new(TerminalEditor, model)
//!                               |
//!                               v
//!            annotate_visible_code() | show_code_review(ReportPanels)
//!                               |
//!                               v
//!                  render to stdout -> clear_annotations()
//! ```

mod panel;
mod terminal;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::{
    fs::{self, OpenOptions},
    io::{IsTerminal, Write, stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rext_config::RextConfig;
use rext_core::{DecorationOptions, Document, TextDocument, render_text};
use rext_engine::{ChatModel, CommandOutcome, ReplayScript, ReviewSession};
use rext_types::Viewport;

use panel::ReportPanels;
use terminal::TerminalEditor;

#[derive(Parser)]
#[command(name = "rext")]
#[command(about = "Inline code annotations and error reviews from a chat model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate lines that could be improved with short suggestions
    Annotate {
        #[command(flatten)]
        target: Target,
    },
    /// Collect errors into a report
    Review {
        #[command(flatten)]
        target: Target,
        /// Where to write the HTML report (default: <file>.review.html)
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Target {
    /// Source file to inspect
    file: PathBuf,
    /// First visible line (1-based)
    #[arg(long)]
    start: Option<usize>,
    /// Last visible line (1-based, inclusive)
    #[arg(long)]
    end: Option<usize>,
    /// Replay a saved model response instead of calling the API
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Characters per fragment when replaying
    #[arg(long, default_value_t = 16)]
    chunk_chars: usize,
    /// Milliseconds between replayed fragments
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_rext_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: prefer no logs over mixing them into the rendered output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_rext_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in rext_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn rext_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.rext/logs/rext.log
    if let Some(config_path) = RextConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("rext.log"));
    }

    // Fallback: ./.rext/logs/rext.log
    candidates.push(PathBuf::from(".rext").join("logs").join("rext.log"));

    candidates
}

/// 1-based inclusive line bounds to a zero-based half-open viewport.
fn viewport_for(line_count: usize, start: Option<usize>, end: Option<usize>) -> Result<Viewport> {
    if start.is_none() && end.is_none() {
        return Ok(Viewport::whole(line_count));
    }
    let first = start.unwrap_or(1);
    let last = end.unwrap_or(line_count);
    if first == 0 {
        bail!("--start is 1-based");
    }
    if first > line_count {
        bail!("--start ({first}) is past the end of the file ({line_count} lines)");
    }
    if last < first {
        bail!("--end ({last}) is before --start ({first})");
    }
    Ok(Viewport::new(
        (first - 1).min(line_count),
        last.min(line_count),
    ))
}

fn load_config() -> RextConfig {
    match RextConfig::load() {
        Ok(Some(config)) => config,
        Ok(None) => RextConfig::default(),
        Err(e) => {
            tracing::warn!(path = %e.path().display(), "{e}");
            eprintln!("Warning: {e}");
            RextConfig::default()
        }
    }
}

fn open_session(target: &Target, config: &RextConfig) -> Result<ReviewSession<TerminalEditor>> {
    let text = fs::read_to_string(&target.file)
        .with_context(|| format!("failed to read {}", target.file.display()))?;
    let document = TextDocument::from_text(&text);
    let viewport = viewport_for(document.line_count(), target.start, target.end)?;
    let editor = TerminalEditor::new(document, viewport);

    let Some(replay) = &target.replay else {
        return Ok(ReviewSession::from_config(editor, config));
    };

    let response = fs::read_to_string(replay)
        .with_context(|| format!("failed to read replay file {}", replay.display()))?;
    let script = ReplayScript::new(response)
        .with_chunk_chars(target.chunk_chars)
        .with_delay(Duration::from_millis(target.delay_ms));
    let annotations = config.annotations();
    let options = DecorationOptions {
        preview_chars: annotations.preview_chars,
        color: annotations.color,
    };
    Ok(ReviewSession::new(
        editor,
        Some(ChatModel::Replay(script)),
        options,
    ))
}

fn default_report_path(file: &Path) -> PathBuf {
    let mut name = file.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".review.html");
    file.with_file_name(name)
}

fn report_no_model() {
    let config_path = RextConfig::path().map_or_else(
        || "~/.rext/config.toml".to_string(),
        |p| p.display().to_string(),
    );
    eprintln!("No chat model available. Set OPENAI_API_KEY or [api_keys] openai in {config_path}.");
}

async fn run_annotate(target: Target, config: &RextConfig) -> Result<()> {
    let mut session = open_session(&target, config)?;
    let outcome = session.annotate_visible_code().await;

    let mut out = stdout().lock();
    let color = out.is_terminal();
    match &outcome {
        CommandOutcome::NoModel => report_no_model(),
        CommandOutcome::Completed {
            applied,
            skipped,
            failure,
        } => {
            session.editor().render(&mut out, color)?;
            writeln!(out)?;
            writeln!(out, "{applied} annotation(s) applied, {skipped} skipped")?;
            if let Some(failure) = failure {
                eprintln!("Model stream ended early: {failure}");
            }
        }
        CommandOutcome::Cancelled => eprintln!("Annotate pass cancelled"),
        CommandOutcome::Reviewed { .. } | CommandOutcome::Cleared { .. } => {}
    }
    out.flush()?;

    if let CommandOutcome::Cleared { disposed } = session.clear_annotations() {
        tracing::debug!(disposed, "Annotations cleared on exit");
    }
    Ok(())
}

async fn run_review(target: Target, report: Option<PathBuf>, config: &RextConfig) -> Result<()> {
    let report = report.unwrap_or_else(|| default_report_path(&target.file));
    let mut session = open_session(&target, config)?;
    let mut panels = ReportPanels::new(report);

    let outcome = session.show_code_review(&mut panels).await;

    let mut out = stdout().lock();
    match &outcome {
        CommandOutcome::NoModel => report_no_model(),
        CommandOutcome::Reviewed { errors, failure } => {
            write!(out, "{}", render_text(errors))?;
            for path in panels.written() {
                writeln!(out, "Report written to {}", path.display())?;
            }
            if let Some(failure) = failure {
                eprintln!("Model stream ended early: {failure}");
            }
        }
        CommandOutcome::Cancelled => eprintln!("Review pass cancelled"),
        CommandOutcome::Completed { .. } | CommandOutcome::Cleared { .. } => {}
    }
    out.flush()?;

    session.close();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config();

    let result = tokio::select! {
        result = async {
            match cli.command {
                Commands::Annotate { target } => run_annotate(target, &config).await,
                Commands::Review { target, report } => run_review(target, report, &config).await,
            }
        } => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            eprintln!("Interrupted");
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!("{e:?}");
    }
    result
}
