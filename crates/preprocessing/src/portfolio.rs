//! Offer catalog cleaning.

use std::collections::HashMap;

use insights_core::{Channel, ChannelSet, InsightsError, InsightsResult, OfferCode, OfferType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One offer as it appears in the raw catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOffer {
    pub id: String,
    pub channels: Vec<String>,
    pub offer_type: String,
    pub difficulty: u32,
    pub reward: f64,
    pub duration: u32,
}

/// A cleaned catalog offer.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub offer_id: String,
    pub offer_type: OfferType,
    pub channels: ChannelSet,
    pub difficulty: u32,
    pub reward: f64,
    pub duration: u32,
}

impl Offer {
    pub fn has_channel(&self, channel: Channel) -> bool {
        self.channels.contains(channel)
    }

    /// Mnemonic code, if the offer is one of the ten known catalog entries.
    pub fn code(&self) -> Option<OfferCode> {
        OfferCode::from_long_id(&self.offer_id)
    }
}

/// Cleaned catalog plus the channels observed across all offers.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    offers: Vec<Offer>,
    channels: Vec<Channel>,
    index: HashMap<String, usize>,
}

impl Portfolio {
    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    /// Distinct channels seen in the catalog, in canonical order.
    pub fn observed_channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn get(&self, offer_id: &str) -> Option<&Offer> {
        self.index.get(offer_id).map(|&i| &self.offers[i])
    }

    /// Channel indicator for an offer. Channels the offer does not list are false.
    pub fn indicator(&self, offer_id: &str, channel: Channel) -> bool {
        self.get(offer_id).is_some_and(|o| o.has_channel(channel))
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

/// Clean the raw catalog: parse types and channel lists, rename `id` to `offer_id`.
pub fn prepare_portfolio(raw: &[RawOffer]) -> InsightsResult<Portfolio> {
    let mut offers = Vec::with_capacity(raw.len());
    let mut index = HashMap::with_capacity(raw.len());
    let mut seen = ChannelSet::empty();

    for entry in raw {
        let channels = entry
            .channels
            .iter()
            .map(|c| c.parse::<Channel>())
            .collect::<InsightsResult<ChannelSet>>()?;
        seen = seen.union(channels);

        if index.insert(entry.id.clone(), offers.len()).is_some() {
            return Err(InsightsError::Validation(format!(
                "duplicate offer id in portfolio: {}",
                entry.id
            )));
        }

        offers.push(Offer {
            offer_id: entry.id.clone(),
            offer_type: entry.offer_type.parse()?,
            channels,
            difficulty: entry.difficulty,
            reward: entry.reward,
            duration: entry.duration,
        });
    }

    let channels: Vec<Channel> = seen.iter().collect();
    debug!(channels = ?channels, "portfolio channel indicators");
    info!(offers = offers.len(), "portfolio cleaned");

    Ok(Portfolio {
        offers,
        channels,
        index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, channels: &[&str], offer_type: &str) -> RawOffer {
        RawOffer {
            id: id.to_string(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
            offer_type: offer_type.to_string(),
            difficulty: 10,
            reward: 10.0,
            duration: 7,
        }
    }

    #[test]
    fn test_channels_exploded_into_indicators() {
        let portfolio = prepare_portfolio(&[
            raw("a", &["email", "mobile"], "bogo"),
            raw("b", &["web"], "informational"),
        ])
        .unwrap();

        assert_eq!(
            portfolio.observed_channels(),
            &[Channel::Email, Channel::Mobile, Channel::Web]
        );
        assert!(portfolio.indicator("a", Channel::Email));
        assert!(!portfolio.indicator("a", Channel::Web));
        assert!(portfolio.indicator("b", Channel::Web));
        assert!(!portfolio.indicator("b", Channel::Social));
        assert!(!portfolio.indicator("missing", Channel::Email));
    }

    #[test]
    fn test_offer_id_and_type() {
        let portfolio =
            prepare_portfolio(&[raw("ae264e3637204a6fb9bb56bc8210ddfd", &["email"], "bogo")]).unwrap();
        let offer = portfolio.get("ae264e3637204a6fb9bb56bc8210ddfd").unwrap();
        assert_eq!(offer.offer_type, OfferType::Bogo);
        assert_eq!(offer.code(), Some(OfferCode::B1));
        assert_eq!(portfolio.len(), 1);
    }

    #[test]
    fn test_rejects_unknown_channel_and_duplicates() {
        assert!(prepare_portfolio(&[raw("a", &["fax"], "bogo")]).is_err());
        assert!(prepare_portfolio(&[raw("a", &["web"], "bogo"), raw("a", &["web"], "bogo")]).is_err());
        assert!(prepare_portfolio(&[raw("a", &["web"], "coupon")]).is_err());
    }
}
