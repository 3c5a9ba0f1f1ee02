//! Batch pipeline from the raw snapshot files to the customer table.

use anyhow::Context;
use insights_analytics::{aggregate_customers, CustomerTable};
use insights_core::config::AppConfig;
use insights_preprocessing::{
    load_json_lines, merge_datasets, prepare_portfolio, prepare_profile, prepare_transcript,
    RawEvent, RawOffer, RawProfile,
};
use tracing::info;

/// Load, clean and merge the three raw tables, then aggregate per customer.
pub fn build_customer_table(config: &AppConfig) -> anyhow::Result<CustomerTable> {
    let data = &config.data;

    let raw_offers: Vec<RawOffer> = load_json_lines(&data.portfolio_path)
        .with_context(|| format!("reading portfolio from {}", data.portfolio_path))?;
    let raw_profiles: Vec<RawProfile> = load_json_lines(&data.profile_path)
        .with_context(|| format!("reading profile from {}", data.profile_path))?;
    let raw_events: Vec<RawEvent> = load_json_lines(&data.transcript_path)
        .with_context(|| format!("reading transcript from {}", data.transcript_path))?;

    info!(
        offers = raw_offers.len(),
        profiles = raw_profiles.len(),
        events = raw_events.len(),
        "raw snapshot loaded"
    );

    let portfolio = prepare_portfolio(&raw_offers).context("cleaning portfolio")?;
    let profile = prepare_profile(&raw_profiles).context("cleaning profile")?;
    let transcript = prepare_transcript(&raw_events).context("cleaning transcript")?;

    let events = merge_datasets(
        &portfolio,
        &profile,
        &transcript,
        config.merge.unknown_offer_policy,
    )
    .context("merging datasets")?;

    Ok(aggregate_customers(&events, &profile))
}
