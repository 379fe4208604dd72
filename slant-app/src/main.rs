use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use slant_analysis::{AnalysisEvent, AnalysisView, Orchestrator};
use slant_common::observability::init_logging;
use slant_config::{SlantConfig, SlantConfigLoader};
use slant_extract::{ArticleData, ExtractorKind, NormalizedDocument, PageContent, normalize, registry};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::info;

mod wiring;

const DEFAULT_CONFIG: &str = "slant.yaml";

#[derive(Parser, Debug)]
#[command(name = "slant")]
#[command(about = "Article extraction and two-phase bias analysis")]
#[command(version)]
struct Cli {
    /// Configuration file; `slant.yaml` is used when present
    #[arg(short, long, env = "SLANT_CONFIG")]
    config: Option<PathBuf>,

    /// Keep analysis state in memory for this run only
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a saved page and print the merged result
    Analyze {
        #[arg(long)]
        url: String,
        /// Saved page markup
        #[arg(long)]
        html: PathBuf,
        /// Give up waiting after this many seconds
        #[arg(long, default_value = "60")]
        wait_secs: u64,
    },

    /// Normalize and extract a saved page without contacting the service
    Extract {
        #[arg(long)]
        url: String,
        #[arg(long)]
        html: PathBuf,
    },

    /// Print persisted phase states and cached records
    Status {
        #[arg(long)]
        url: String,
    },

    /// Drop everything stored for the page and analyze it from scratch
    Restart {
        #[arg(long)]
        url: String,
        #[arg(long)]
        html: PathBuf,
        #[arg(long, default_value = "60")]
        wait_secs: u64,
    },

    /// Remove every persisted key for the page
    Clear {
        #[arg(long)]
        url: String,
    },
}

#[derive(Serialize)]
struct Extraction {
    extractor: ExtractorKind,
    normalized: NormalizedDocument,
    article: ArticleData,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let cfg = load_config(cli.config.as_deref())?;

    let log_path = init_logging(wiring::log_config(&cfg.logging))?;
    info!(log = %log_path.display(), ephemeral = cli.ephemeral, "slant.start");

    match cli.command {
        Commands::Extract { url, html } => {
            let raw = read_page(&html)?;
            let extractor = registry::select(&url);
            print_json(&Extraction {
                extractor,
                normalized: normalize(&raw),
                article: extractor.parse(&url, &raw),
            })
        }
        Commands::Analyze {
            url,
            html,
            wait_secs,
        } => {
            let orchestrator = wiring::build_orchestrator(&cfg, cli.ephemeral).await?;
            let mut events = orchestrator.subscribe();
            let page = PageContent::new(url.clone(), read_page(&html)?);
            orchestrator.start_analysis(page).await?;
            let view = wait_until_settled(&orchestrator, &mut events, &url, wait_secs).await;
            print_json(&view)
        }
        Commands::Restart {
            url,
            html,
            wait_secs,
        } => {
            let orchestrator = wiring::build_orchestrator(&cfg, cli.ephemeral).await?;
            let mut events = orchestrator.subscribe();
            let page = PageContent::new(url.clone(), read_page(&html)?);
            orchestrator.restart_page(page).await?;
            let view = wait_until_settled(&orchestrator, &mut events, &url, wait_secs).await;
            print_json(&view)
        }
        Commands::Status { url } => {
            let orchestrator = wiring::build_orchestrator(&cfg, cli.ephemeral).await?;
            print_json(&orchestrator.persisted(&url).await?)
        }
        Commands::Clear { url } => {
            let orchestrator = wiring::build_orchestrator(&cfg, cli.ephemeral).await?;
            orchestrator.clear(&url).await?;
            info!(url = %url, "slant.cleared");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SlantConfig> {
    let loader = match path {
        Some(path) => SlantConfigLoader::new().with_file(path),
        None => SlantConfigLoader::new().with_optional_file(DEFAULT_CONFIG),
    };
    loader.load().context("failed to load configuration")
}

fn read_page(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wait for both phases to settle, the wait to elapse, or the event stream to close.
async fn wait_until_settled(
    orchestrator: &Orchestrator,
    events: &mut broadcast::Receiver<AnalysisEvent>,
    url: &str,
    wait_secs: u64,
) -> AnalysisView {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(wait_secs);
    loop {
        if orchestrator.snapshot(url).is_some_and(|v| v.is_settled()) {
            break;
        }
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(_)) | Ok(Err(RecvError::Lagged(_))) => continue,
            Ok(Err(RecvError::Closed)) => break,
            Err(_) => {
                info!(url, wait_secs, "slant.wait.elapsed");
                break;
            }
        }
    }
    orchestrator
        .snapshot(url)
        .unwrap_or_else(|| AnalysisView::new(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_globals() {
        let cli = Cli::try_parse_from([
            "slant",
            "--ephemeral",
            "--config",
            "x.yaml",
            "analyze",
            "--url",
            "https://e.com/a",
            "--html",
            "page.html",
        ])
        .unwrap();
        assert!(cli.ephemeral);
        assert_eq!(cli.config.as_deref(), Some(Path::new("x.yaml")));
        match cli.command {
            Commands::Analyze { url, wait_secs, .. } => {
                assert_eq!(url, "https://e.com/a");
                assert_eq!(wait_secs, 60);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        assert!(load_config(Some(Path::new("/definitely/not/here.yaml"))).is_err());
    }

    #[test]
    fn clear_requires_url() {
        assert!(Cli::try_parse_from(["slant", "clear"]).is_err());
    }
}
