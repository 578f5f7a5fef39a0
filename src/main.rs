//! privacy-grader: command-line entrypoint.
//!
//! - `batch`  grade the configured service list and write the CSV report
//! - `grade`  grade one document from a file or stdin
//! - `serve`  run the HTTP API (with /metrics)

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use privacy_grader::{
    api::{self, ApiState},
    batch::{BatchRunner, FixedDelay},
    config::{load_scorer, load_services, HarnessConfig},
    extract::PolicyDocument,
    fetch::HttpFetcher,
    metrics::Metrics,
    report,
};

#[derive(Parser, Debug)]
#[command(
    name = "privacy-grader",
    about = "Grade privacy policies A-E from weighted, negation-aware pattern evidence",
    version
)]
struct Cli {
    /// TOML catalog replacing the built-in rules
    #[arg(long, global = true, env = "PRIVACY_CATALOG_PATH")]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and grade every service in the list, then write a CSV report
    Batch(BatchArgs),
    /// Grade a single document
    Grade(GradeArgs),
    /// Start the HTTP API
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Services TOML file
    #[arg(long)]
    services: Option<PathBuf>,
    /// Output CSV path
    #[arg(long)]
    out: Option<PathBuf>,
    /// Pause between services, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Per-document scoring deadline, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct GradeArgs {
    /// File to read (stdin when omitted)
    path: Option<PathBuf>,
    /// Treat the input as HTML and extract text first
    #[arg(long)]
    html: bool,
    /// Print match events, including suppressed ones
    #[arg(long)]
    explain: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listen address, e.g. 127.0.0.1:8080
    #[arg(long)]
    bind: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("privacy_grader=info,batch=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = HarnessConfig::from_env()?;

    // A broken catalog stops startup here.
    let catalog_path = cli.catalog.clone().or_else(|| cfg.catalog_path.clone());
    let scorer = Arc::new(load_scorer(catalog_path.as_deref()).context("building pattern catalog")?);
    info!(
        rules = scorer.catalog().len(),
        custom = catalog_path.is_some(),
        "scorer ready"
    );

    match cli.command {
        Command::Batch(args) => run_batch(args, cfg, scorer).await,
        Command::Grade(args) => run_grade(args, scorer),
        Command::Serve(args) => run_serve(args, cfg, scorer).await,
    }
}

async fn run_batch(
    args: BatchArgs,
    cfg: HarnessConfig,
    scorer: Arc<privacy_grader::PolicyScorer>,
) -> Result<()> {
    let services_path = args.services.unwrap_or(cfg.services_path);
    let out_path = args.out.unwrap_or(cfg.report_path);
    let delay = args
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or(cfg.request_delay);
    let timeout = args
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(cfg.score_timeout);

    let services = load_services(&services_path)?;
    let fetcher = Arc::new(HttpFetcher::new(cfg.fetch_timeout)?);
    let runner = BatchRunner::new(scorer, fetcher)
        .with_throttle(Arc::new(FixedDelay(delay)))
        .with_retry(cfg.retry)
        .with_score_timeout(timeout);

    let report = runner.run(&services).await;

    let file = std::fs::File::create(&out_path)
        .with_context(|| format!("creating report {}", out_path.display()))?;
    report::write_csv(&report.rows, std::io::BufWriter::new(file))
        .with_context(|| format!("writing report {}", out_path.display()))?;

    println!("{}", report.summary);
    println!("Results saved to: {}", out_path.display());
    Ok(())
}

fn run_grade(args: GradeArgs, scorer: Arc<privacy_grader::PolicyScorer>) -> Result<()> {
    let mut input = String::new();
    match &args.path {
        Some(p) => {
            input = std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut input)
                .context("reading stdin")?;
        }
    }
    let doc = if args.html {
        PolicyDocument::from_html(&input)
    } else {
        PolicyDocument::from_text(&input)
    };

    let out = if args.explain {
        serde_json::to_string_pretty(&scorer.explain(&doc.normalized_text))?
    } else {
        serde_json::to_string_pretty(&scorer.score_document(&doc.normalized_text))?
    };
    println!("{out}");
    Ok(())
}

async fn run_serve(
    args: ServeArgs,
    cfg: HarnessConfig,
    scorer: Arc<privacy_grader::PolicyScorer>,
) -> Result<()> {
    let metrics = Metrics::init()?;
    let state = ApiState::new(scorer, cfg.score_timeout);
    let app = api::router(state).merge(metrics.router());

    let bind = args.bind.unwrap_or(cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(%bind, "serving privacy grader API");
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
