use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tollscraper::{
    config::Config,
    fetch,
    normalize::ErrorPolicy,
    pipeline,
    render::{self, Format},
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

/// Scrape natural-disaster death tolls into one clean table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Page to scrape (overrides the config file)
    #[arg(long, env = "TOLLSCRAPER_URL")]
    url: Option<String>,

    /// Read a saved HTML page instead of fetching (wins over --url)
    #[arg(long)]
    input: Option<PathBuf>,

    /// YAML config file
    #[arg(long, env = "TOLLSCRAPER_CONFIG")]
    config: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// What to do with cells that cannot be parsed
    #[arg(long, value_enum)]
    policy: Option<ErrorPolicy>,

    #[arg(long)]
    min_year: Option<i64>,

    #[arg(long)]
    max_year: Option<i64>,

    /// Fetch retries before giving up
    #[arg(long)]
    retries: Option<u32>,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, cfg: &mut Config) {
        if let Some(url) = &self.url {
            cfg.url = url.clone();
        }
        if let Some(policy) = self.policy {
            cfg.filter.policy = policy;
        }
        if let Some(y) = self.min_year {
            cfg.filter.min_year = y;
        }
        if let Some(y) = self.max_year {
            cfg.filter.max_year = y;
        }
        if let Some(r) = self.retries {
            cfg.fetch.retries = r;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_level = if args.verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) config ───────────────────────────────────────────────────
    let mut cfg = Config::load(args.config.as_deref()).context("loading config")?;
    args.apply(&mut cfg);
    cfg.validate().context("validating config")?;
    info!(url = %cfg.url, policy = ?cfg.filter.policy, "startup");

    // ─── 3) document ─────────────────────────────────────────────────
    let (document, source) = match &args.input {
        Some(path) => (fetch::read_document(path)?, path.display().to_string()),
        None => {
            let url = Url::parse(&cfg.url).with_context(|| format!("parsing URL {}", cfg.url))?;
            let client = fetch::build_client(&cfg.fetch)?;
            let body = fetch::fetch_document(&client, &url, &cfg.fetch)
                .await
                .with_context(|| format!("fetching {}", url))?;
            (body, url.to_string())
        }
    };

    // ─── 4) extract → reconcile → merge ──────────────────────────────
    let out = pipeline::run(&document, &cfg).context("processing tables")?;
    info!(
        tables = out.tables,
        rows_in = out.stats.rows_in,
        records = out.records.len(),
        "pipeline finished"
    );

    // ─── 5) render ───────────────────────────────────────────────────
    let renderer = render::renderer_for(args.format, &source);
    render::render_to(renderer.as_ref(), &out.records, args.output.as_deref())?;

    info!("all done");
    Ok(())
}
