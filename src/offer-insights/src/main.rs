//! Offer Insights: batch analysis of a promotional-offer snapshot.
//!
//! Builds the per-customer table from the raw portfolio, profile and
//! transcript files, then ranks offers or reports stage statistics.

mod pipeline;

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use insights_analytics::Scope;
use insights_core::config::{AppConfig, UnknownOfferPolicy};
use insights_core::{Gender, OfferCode};
use insights_ranking::{DemographicFilter, OfferRanker};
use insights_reporting::{Aggregation, GroupBy, StageReport, Stat};
use tracing::{info, info_span};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "offer-insights")]
#[command(about = "Per-customer offer funnel analytics and offer ranking")]
#[command(version)]
struct Cli {
    /// Portfolio JSON-lines file (overrides config)
    #[arg(long, env = "OFFER_INSIGHTS__DATA__PORTFOLIO_PATH")]
    portfolio: Option<String>,

    /// Profile JSON-lines file (overrides config)
    #[arg(long, env = "OFFER_INSIGHTS__DATA__PROFILE_PATH")]
    profile: Option<String>,

    /// Transcript JSON-lines file (overrides config)
    #[arg(long, env = "OFFER_INSIGHTS__DATA__TRANSCRIPT_PATH")]
    transcript: Option<String>,

    /// What to do with offer ids outside the remap table: reject or null
    #[arg(long, env = "OFFER_INSIGHTS__MERGE__UNKNOWN_OFFER_POLICY")]
    unknown_offers: Option<UnknownOfferPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the customer table as JSON lines
    Aggregate {
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Rank offers by the net expense of the customers they reached
    Rank {
        #[arg(long, env = "OFFER_INSIGHTS__RANKING__N_TOP")]
        n_top: Option<usize>,

        #[arg(long, env = "OFFER_INSIGHTS__RANKING__QUANTILE")]
        quantile: Option<f64>,

        /// Candidate offers, e.g. B1,D2,I1 (all offers when omitted)
        #[arg(long, value_delimiter = ',')]
        offers: Option<Vec<OfferCode>>,

        #[arg(long)]
        income: Option<f64>,

        #[arg(long)]
        age: Option<u32>,

        #[arg(long)]
        gender: Option<Gender>,
    },
    /// Report a statistic per funnel stage of one scope
    Report {
        /// overall, an offer type (bogo, discount, informational) or an offer code
        #[arg(long)]
        scope: Scope,

        #[arg(long)]
        by: Option<GroupBy>,

        #[arg(long, default_value = "net_expense")]
        stat: Stat,

        /// Grouped aggregation: sum or mean
        #[arg(long, default_value = "sum")]
        aggregation: Aggregation,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let run_id = Uuid::new_v4();
    let span = info_span!("run", run_id = %run_id);
    let _guard = span.enter();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(path) = cli.portfolio {
        config.data.portfolio_path = path;
    }
    if let Some(path) = cli.profile {
        config.data.profile_path = path;
    }
    if let Some(path) = cli.transcript {
        config.data.transcript_path = path;
    }
    if let Some(policy) = cli.unknown_offers {
        config.merge.unknown_offer_policy = policy;
    }
    if let Command::Rank { n_top, quantile, .. } = &cli.command {
        if let Some(n_top) = n_top {
            config.ranking.n_top = *n_top;
        }
        if let Some(quantile) = quantile {
            config.ranking.quantile = *quantile;
        }
    }
    config.ranking.validate()?;

    info!(
        portfolio = %config.data.portfolio_path,
        profile = %config.data.profile_path,
        transcript = %config.data.transcript_path,
        unknown_offer_policy = ?config.merge.unknown_offer_policy,
        "Configuration loaded"
    );

    let customers = pipeline::build_customer_table(&config)?;

    match cli.command {
        Command::Aggregate { output } => {
            let lines = customers.to_json_lines()?;
            match output {
                Some(path) => {
                    fs::write(&path, lines)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), customers = customers.len(), "customer table written");
                }
                None => std::io::stdout().lock().write_all(lines.as_bytes())?,
            }
        }
        Command::Rank {
            offers,
            income,
            age,
            gender,
            ..
        } => {
            let ranker = OfferRanker::new(&config.ranking);
            let n_top = config.ranking.n_top;
            let q = config.ranking.quantile;

            let filter = (income.is_some() || age.is_some() || gender.is_some()).then_some(
                DemographicFilter {
                    income,
                    age,
                    gender,
                },
            );
            let ranking = match (filter, offers.as_deref()) {
                (Some(filter), None) => {
                    ranker.most_popular_offers_filtered(&customers, n_top, q, &filter)
                }
                (Some(filter), Some(offers)) => {
                    ranker.most_popular_offers(&filter.apply(&customers), n_top, q, Some(offers))
                }
                (None, offers) => ranker.most_popular_offers(&customers, n_top, q, offers),
            };
            println!("{}", serde_json::to_string_pretty(&ranking)?);
        }
        Command::Report {
            scope,
            by,
            stat,
            aggregation,
        } => {
            let json = match by {
                Some(by) => serde_json::to_string_pretty(&StageReport::grouped(
                    &customers,
                    stat,
                    scope,
                    by,
                    aggregation,
                ))?,
                None => serde_json::to_string_pretty(&StageReport::per_customer(
                    &customers, stat, scope,
                ))?,
            };
            println!("{json}");
        }
    }

    Ok(())
}
