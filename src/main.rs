mod bulletin;
mod config;
mod error;
mod fetch;
mod model;
mod output;
mod parser;
mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use config::Settings;
use fetch::{HttpTransport, SearchQuery, Transport};
use model::RunResult;
use parser::BoardParser;

#[derive(Parser)]
#[command(name = "vagas_scraper", about = "Job listing extraction for São Carlos sources")]
struct Cli {
    /// Settings file (TOML); `jobs.toml` is read when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output root, overrides `output_dir`
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Print the run as JSON instead of writing a file
    #[arg(long, global = true)]
    stdout: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the job board and enrich every listing from its detail page
    Board {
        /// Job function filter (default from settings)
        #[arg(short, long)]
        funcao: Option<String>,
        /// City filter (default from settings)
        #[arg(short = 'C', long)]
        cidade: Option<String>,
        /// Stop after this many result pages
        #[arg(short = 'n', long)]
        max_pages: Option<u32>,
    },
    /// Classify the PDF bulletin and keep tech-related vacancies
    Bulletin {
        /// Bulletin URL (default from settings)
        #[arg(long, conflicts_with_all = ["pdf", "text"])]
        url: Option<String>,
        /// Local PDF instead of downloading
        #[arg(long, conflicts_with = "text")]
        pdf: Option<PathBuf>,
        /// Already-extracted text
        #[arg(long)]
        text: Option<PathBuf>,
        /// Save the extracted text here before classifying
        #[arg(long)]
        dump_raw: Option<PathBuf>,
    },
    /// Resolve a single detail page and print the record
    Detail { url: String },
    /// Parse a saved search-result fragment and print the stubs
    Stubs { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.output.clone() {
        settings.output_dir = dir;
    }

    match cli.command {
        Commands::Board {
            funcao,
            cidade,
            max_pages,
        } => {
            let query = SearchQuery {
                funcao: funcao.unwrap_or_else(|| settings.board.funcao.clone()),
                cidade: cidade.unwrap_or_else(|| settings.board.cidade.clone()),
            };
            let transport: Arc<dyn Transport> =
                Arc::new(HttpTransport::new(&settings.http, &settings.board)?);
            let run = pipeline::run_board(&settings, transport, &query, max_pages).await?;
            emit(&settings, &run, cli.stdout)?;
        }
        Commands::Bulletin {
            url,
            pdf,
            text,
            dump_raw,
        } => {
            if let Some(url) = url {
                settings.bulletin.pdf_url = url;
            }
            let raw = match (text, pdf) {
                (Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, Some(path)) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    fetch::extract_pdf_text(bytes).await?
                }
                (None, None) => {
                    let bytes = fetch::download_bulletin(&settings.http, &settings.bulletin).await?;
                    fetch::extract_pdf_text(bytes).await?
                }
            };
            if let Some(path) = dump_raw {
                std::fs::write(&path, &raw)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), "raw bulletin text saved");
            }
            let run = pipeline::scan_bulletin(&settings.bulletin, &raw)?;
            emit(&settings, &run, cli.stdout)?;
        }
        Commands::Detail { url } => {
            let transport = HttpTransport::new(&settings.http, &settings.board)?;
            let html = transport.detail_page(&url).await?;
            let record = BoardParser::new(&settings.board)?.resolve_detail(&html);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Stubs { path } => {
            let html = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let stubs = BoardParser::new(&settings.board)?.parse_stubs(&html);
            println!("{}", serde_json::to_string_pretty(&stubs)?);
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {}", format_duration(elapsed));
    }
    Ok(())
}

fn emit(settings: &Settings, run: &RunResult, to_stdout: bool) -> Result<()> {
    if to_stdout {
        println!("{}", serde_json::to_string_pretty(run)?);
        return Ok(());
    }
    let path = output::write_run(&settings.output_dir, run)?;
    println!("[OK] {} vacancies saved to {}", run.total, path.display());
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
