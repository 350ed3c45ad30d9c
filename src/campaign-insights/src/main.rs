//! Campaign Insights — conversion comparison, purchase-driver attribution and
//! unit economics over a normalized campaign table.
//!
//! Results are written to stdout as pretty JSON; logs go to stderr.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use campaign_core::{AppConfig, Dataset, Table};
use campaign_reporting::AnalysisSession;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-insights")]
#[command(about = "Campaign performance analysis over a normalized user table")]
#[command(version)]
struct Cli {
    /// Normalized table as JSON (`{"columns": [...], "rows": [[...], ...]}`)
    #[arg(long, env = "CAMPAIGN_INSIGHTS_INPUT")]
    input: PathBuf,

    /// Budgets as a JSON map of campaign id to amount
    #[arg(long)]
    budgets: Option<PathBuf>,

    /// Optional config file (TOML, YAML or JSON)
    #[arg(long, env = "CAMPAIGN_INSIGHTS_CONFIG")]
    config: Option<String>,

    /// Posterior sampling seed (overrides config)
    #[arg(long, env = "CAMPAIGN_INSIGHTS__BAYES__SEED")]
    seed: Option<u64>,

    /// Posterior sample count (overrides config)
    #[arg(long, env = "CAMPAIGN_INSIGHTS__BAYES__SAMPLE_COUNT")]
    samples: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Campaign table with dataset totals
    Overview,
    /// Bayesian comparison of two campaigns' conversion rates
    Compare {
        #[arg(long)]
        a: i64,
        #[arg(long)]
        b: i64,
    },
    /// Journey, ranking and purchase drivers for one campaign
    Campaign {
        #[arg(long)]
        id: i64,
    },
    /// CAC, LTV, ROI per budgeted campaign plus the portfolio roll-up
    Economics,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_insights=info,campaign_core=info,campaign_reporting=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;

    if let Some(seed) = cli.seed {
        config.bayes.seed = Some(seed);
    }
    if let Some(samples) = cli.samples {
        config.bayes.sample_count = samples;
    }

    info!(
        sample_count = config.bayes.sample_count,
        seed = ?config.bayes.seed,
        n_estimators = config.attribution.n_estimators,
        min_rows = config.attribution.min_rows,
        "Configuration loaded"
    );

    let dataset = load_dataset(&cli.input)?;
    let mut session = AnalysisSession::new(config, dataset)?;

    if let Some(path) = &cli.budgets {
        let budgets = load_budgets(path)?;
        session.recompute_budgets(budgets)?;
    }

    match cli.command {
        Command::Overview => print_json(&session.overview()),
        Command::Compare { a, b } => print_json(&session.compare_campaigns(a, b)?),
        Command::Campaign { id } => print_json(&session.campaign_report(id)?),
        Command::Economics => print_json(&session.economics()),
    }
}

/// An explicit config file must load; without one, env-only loading falls
/// back to defaults.
fn load_config(path: Option<&str>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => {
            AppConfig::load(Some(path)).with_context(|| format!("loading config {path}"))
        }
        None => Ok(AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        })),
    }
}

fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading input table {}", path.display()))?;
    let table = Table::from_json(&raw)
        .with_context(|| format!("parsing input table {}", path.display()))?;
    Ok(Dataset::from_table(&table)?)
}

fn load_budgets(path: &Path) -> anyhow::Result<BTreeMap<i64, f64>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading budgets {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing budgets {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
