use std::collections::HashMap;

use crate::core::config;
use crate::domain::Country;

/// Region to Stripe price id.
///
/// Every region falls back to the default price unless an override is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTable {
    default_price: String,
    overrides: HashMap<Country, String>,
}

impl PriceTable {
    /// Same price for every region.
    pub fn uniform(price_id: impl Into<String>) -> Self {
        Self {
            default_price: price_id.into(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, country: Country, price_id: impl Into<String>) -> Self {
        self.overrides.insert(country, price_id.into());
        self
    }

    /// Builds the table from STRIPE_PRICE_ID and STRIPE_PRICE_<CODE>.
    pub fn from_env() -> Self {
        let mut table = Self::uniform(config::stripe::DEFAULT_PRICE_ID.as_str());
        for country in Country::ALL {
            if let Some(price) = config::stripe::region_price_override(country.code()) {
                log::info!("Price override for {}: {}", country, price);
                table = table.with_override(country, price);
            }
        }
        table
    }

    pub fn price_for(&self, country: Country) -> &str {
        self.overrides
            .get(&country)
            .map(String::as_str)
            .unwrap_or(&self.default_price)
    }
}
