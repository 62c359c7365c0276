use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{AggregatedRate, Destination};

/// Store-defined price overrides applied to final rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateAdjustmentRules {
    /// District code to price multiplier.
    pub district_multipliers: BTreeMap<String, f64>,
    /// Flat amount added for destinations flagged as remote.
    pub remote_area_surcharge: u64,
}

impl Default for RateAdjustmentRules {
    fn default() -> Self {
        Self {
            district_multipliers: BTreeMap::from([("3173040".to_string(), 1.15)]),
            remote_area_surcharge: 7_000,
        }
    }
}

impl RateAdjustmentRules {
    pub fn apply(
        &self,
        rates: Vec<AggregatedRate>,
        destination: &Destination,
    ) -> Vec<AggregatedRate> {
        let multiplier = self
            .district_multipliers
            .get(&destination.district_code)
            .copied()
            .filter(|multiplier| multiplier.is_finite() && *multiplier >= 0.0);

        rates
            .into_iter()
            .map(|mut rate| {
                if let Some(multiplier) = multiplier {
                    let before = rate.price;
                    rate.price = (before as f64 * multiplier).round() as u64;
                    let label = format!("district_multiplier_{}", multiplier).replace('.', "_");
                    tracing::info!(
                        rate_id = %rate.rate_id,
                        district = %destination.district_code,
                        before,
                        after = rate.price,
                        "district price override applied"
                    );
                    rate.override_applied = Some(label);
                }

                if destination.is_remote_area && self.remote_area_surcharge > 0 {
                    rate.price = rate.price.saturating_add(self.remote_area_surcharge);
                    tracing::info!(
                        rate_id = %rate.rate_id,
                        surcharge = self.remote_area_surcharge,
                        "remote area surcharge applied"
                    );
                    rate.surcharge_applied =
                        Some(format!("remote_area_flat_{}", self.remote_area_surcharge));
                }

                rate
            })
            .collect()
    }
}
