//! Net-expense statistic per offer and the ranked offer list built on it.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use insights_analytics::CustomerTable;
use insights_core::config::RankingConfig;
use insights_core::OfferCode;
use serde::Serialize;
use tracing::{debug, info};

use crate::filter::DemographicFilter;
use crate::quantile::quantile;

/// Ranked offers plus the statistic for every candidate. Undefined
/// statistics (empty cohorts) serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferRanking {
    pub top: Vec<OfferCode>,
    pub net_expense: BTreeMap<OfferCode, f64>,
}

impl OfferRanking {
    /// Statistic for one candidate; NaN when the cohort was empty.
    pub fn value(&self, offer: OfferCode) -> Option<f64> {
        self.net_expense.get(&offer).copied()
    }
}

pub struct OfferRanker {
    min_transactions: u32,
}

impl OfferRanker {
    pub fn new(config: &RankingConfig) -> Self {
        Self {
            min_transactions: config.min_transactions,
        }
    }

    /// The `q`-quantile of `net_expense` over customers who viewed `offer`,
    /// have positive net expense, at least the minimum number of
    /// transactions, and (for offers that can be completed) completed it.
    /// NaN when no customer qualifies.
    pub fn net_expense(&self, customers: &CustomerTable, offer: OfferCode, q: f64) -> f64 {
        let cohort: Vec<f64> = customers
            .iter()
            .filter(|c| {
                let funnel = c.funnel(offer);
                funnel.viewed > 0
                    && c.net_expense > 0.0
                    && c.total_transactions >= self.min_transactions
                    && (!offer.has_completion() || funnel.completed_or_zero() > 0)
            })
            .map(|c| c.net_expense)
            .collect();

        let value = quantile(&cohort, q);
        debug!(offer = %offer, cohort = cohort.len(), value, "net expense computed");
        value
    }

    /// Rank candidate offers by descending net expense.
    ///
    /// `offers: None` ranks every known offer; an explicit empty slice ranks
    /// nothing. The sort is stable: ties keep their input order and NaN
    /// values sink below every defined value, also in input order.
    pub fn most_popular_offers(
        &self,
        customers: &CustomerTable,
        n_top: usize,
        q: f64,
        offers: Option<&[OfferCode]>,
    ) -> OfferRanking {
        let candidates = offers.unwrap_or(&OfferCode::RANKING_ORDER);

        let mut scored: Vec<(OfferCode, f64)> = candidates
            .iter()
            .map(|offer| (*offer, self.net_expense(customers, *offer, q)))
            .collect();
        scored.sort_by(|a, b| descending_nan_last(a.1, b.1));

        let top: Vec<OfferCode> = scored.iter().take(n_top).map(|(o, _)| *o).collect();
        info!(
            customers = customers.len(),
            candidates = candidates.len(),
            top = ?top,
            "offers ranked"
        );

        OfferRanking {
            top,
            net_expense: scored.into_iter().collect(),
        }
    }

    /// Rank every known offer over the customers matching `filter`.
    pub fn most_popular_offers_filtered(
        &self,
        customers: &CustomerTable,
        n_top: usize,
        q: f64,
        filter: &DemographicFilter,
    ) -> OfferRanking {
        let cohort = filter.apply(customers);
        debug!(filter = ?filter, customers = cohort.len(), "demographic filter applied");
        self.most_popular_offers(&cohort, n_top, q, None)
    }
}

impl Default for OfferRanker {
    fn default() -> Self {
        Self::new(&RankingConfig::default())
    }
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
