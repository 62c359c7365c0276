use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::AggregatedRate;
use super::eta::max_eta_days;

pub const BADGE_BEST_VALUE: &str = "Best Value";
pub const BADGE_FASTEST: &str = "Fastest";
pub const BADGE_CHEAPEST: &str = "Cheapest";

/// ETA assumed by the recommender when a label has no digits.
const UNKNOWN_ETA_DAYS: u32 = 3;

/// Largest day count in the label, at least one day.
fn eta_days_for_scoring(label: &str) -> u32 {
    max_eta_days(label).map_or(UNKNOWN_ETA_DAYS, |days| days.max(1))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationWeights {
    pub price: f64,
    pub eta: f64,
    pub reliability: f64,
    pub margin_impact: f64,
}

impl Default for RecommendationWeights {
    fn default() -> Self {
        Self {
            price: 35.0,
            eta: 25.0,
            reliability: 20.0,
            margin_impact: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSettings {
    pub weights: RecommendationWeights,
    /// Courier code to reliability score (0-100).
    pub courier_reliability: BTreeMap<String, f64>,
    pub default_reliability: f64,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            weights: RecommendationWeights::default(),
            courier_reliability: BTreeMap::from([
                ("jne".to_string(), 85.0),
                ("jnt".to_string(), 78.0),
                ("anteraja".to_string(), 80.0),
                ("backup".to_string(), 60.0),
            ]),
            default_reliability: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateScore {
    pub rate_id: String,
    pub score: f64,
    pub price_score: f64,
    pub eta_score: f64,
    pub reliability_score: f64,
    pub margin_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateRecommendation {
    pub is_available: bool,
    pub recommended_rate_id: Option<String>,
    /// Highest score first.
    pub scores: Vec<RateScore>,
    pub badges: BTreeMap<String, Vec<String>>,
}

/// Rank final rates by price, speed, courier reliability and margin impact.
pub fn recommend_rates(
    rates: &[AggregatedRate],
    cart_total: u64,
    settings: &RecommendationSettings,
) -> RateRecommendation {
    let etas: Vec<u32> = rates
        .iter()
        .map(|rate| eta_days_for_scoring(&rate.eta_label))
        .collect();

    let mut badges: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let usable = !rates.is_empty() && cart_total > 0 && rates.iter().all(|rate| rate.price > 0);
    if !usable {
        add_speed_and_price_badges(rates, &etas, &mut badges);
        return RateRecommendation {
            is_available: false,
            recommended_rate_id: None,
            scores: Vec::new(),
            badges,
        };
    }

    let prices: Vec<f64> = rates.iter().map(|rate| rate.price as f64).collect();
    let eta_days: Vec<f64> = etas.iter().map(|eta| f64::from(*eta)).collect();
    let weights = &settings.weights;

    let mut scores: Vec<RateScore> = rates
        .iter()
        .enumerate()
        .map(|(position, rate)| {
            let price_score = inverse_normalize(prices[position], &prices);
            let eta_score = inverse_normalize(eta_days[position], &eta_days);
            let reliability_score = settings
                .courier_reliability
                .get(&rate.courier.to_ascii_lowercase())
                .copied()
                .unwrap_or(settings.default_reliability);
            let ratio = (rate.price as f64 / cart_total as f64).clamp(0.0, 1.0);
            let margin_score = ((1.0 - ratio) * 100.0).round();

            let total = (price_score * weights.price
                + eta_score * weights.eta
                + reliability_score * weights.reliability
                + margin_score * weights.margin_impact)
                / 100.0;

            RateScore {
                rate_id: rate.rate_id.clone(),
                score: (total * 100.0).round() / 100.0,
                price_score,
                eta_score,
                reliability_score,
                margin_score,
            }
        })
        .collect();

    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    let recommended_rate_id = scores.first().map(|score| score.rate_id.clone());

    if let Some(best) = &recommended_rate_id {
        badges
            .entry(best.clone())
            .or_default()
            .push(BADGE_BEST_VALUE.to_string());
    }
    add_speed_and_price_badges(rates, &etas, &mut badges);

    RateRecommendation {
        is_available: true,
        recommended_rate_id,
        scores,
        badges,
    }
}

/// Map the minimum to 100 and the maximum to 0; 100 for everything when all
/// values are equal.
fn inverse_normalize(value: f64, values: &[f64]) -> f64 {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return 100.0;
    }
    ((max - value) / (max - min) * 100.0).round()
}

fn add_speed_and_price_badges(
    rates: &[AggregatedRate],
    etas: &[u32],
    badges: &mut BTreeMap<String, Vec<String>>,
) {
    let fastest = etas
        .iter()
        .enumerate()
        .min_by_key(|(position, eta)| (**eta, *position))
        .map(|(position, _)| position);
    if let Some(position) = fastest {
        badges
            .entry(rates[position].rate_id.clone())
            .or_default()
            .push(BADGE_FASTEST.to_string());
    }

    let cheapest = rates
        .iter()
        .enumerate()
        .min_by_key(|(position, rate)| (rate.price, *position))
        .map(|(position, _)| position);
    if let Some(position) = cheapest {
        badges
            .entry(rates[position].rate_id.clone())
            .or_default()
            .push(BADGE_CHEAPEST.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(courier: &str, price: u64, eta_label: &str) -> AggregatedRate {
        AggregatedRate {
            rate_id: format!("col:{courier}-reg"),
            courier: courier.to_string(),
            service: "REG".to_string(),
            price,
            shipment_count: 1,
            eta_days_max: max_eta_days(eta_label).unwrap_or(1),
            eta_label: eta_label.to_string(),
            override_applied: None,
            surcharge_applied: None,
            promise: None,
        }
    }

    #[test]
    fn scores_rank_rates_and_assign_badges() {
        let rates = vec![
            rate("jne", 20_000, "3 hari"),
            rate("jnt", 15_000, "4 hari"),
            rate("anteraja", 25_000, "2 hari"),
        ];

        let recommendation = recommend_rates(&rates, 300_000, &RecommendationSettings::default());

        assert!(recommendation.is_available);
        assert_eq!(recommendation.scores.len(), 3);
        let jnt = recommendation
            .scores
            .iter()
            .find(|score| score.rate_id == "col:jnt-reg")
            .expect("jnt scored");
        assert_eq!(jnt.price_score, 100.0);
        assert_eq!(jnt.eta_score, 0.0);
        assert_eq!(jnt.reliability_score, 78.0);
        assert_eq!(jnt.margin_score, 95.0);

        assert_eq!(
            recommendation.badges["col:anteraja-reg"],
            vec![BADGE_FASTEST.to_string()]
        );
        assert!(recommendation.badges["col:jnt-reg"].contains(&BADGE_CHEAPEST.to_string()));
        let best = recommendation.recommended_rate_id.expect("recommended");
        assert_eq!(best, recommendation.scores[0].rate_id);
        assert_eq!(recommendation.badges[&best][0], BADGE_BEST_VALUE);
    }

    #[test]
    fn equal_values_normalize_to_full_marks() {
        let rates = vec![rate("jne", 10_000, "2 hari"), rate("jnt", 10_000, "2 hari")];
        let recommendation = recommend_rates(&rates, 50_000, &RecommendationSettings::default());
        assert!(recommendation.scores.iter().all(|score| score.price_score == 100.0));
        assert!(recommendation.scores.iter().all(|score| score.eta_score == 100.0));
        assert_eq!(recommendation.recommended_rate_id.as_deref(), Some("col:jne-reg"));
    }

    #[test]
    fn zero_cart_total_disables_scoring_but_keeps_badges() {
        let rates = vec![rate("jne", 10_000, "2 hari"), rate("jnt", 9_000, "4 hari")];
        let recommendation = recommend_rates(&rates, 0, &RecommendationSettings::default());

        assert!(!recommendation.is_available);
        assert!(recommendation.scores.is_empty());
        assert_eq!(recommendation.badges["col:jne-reg"], vec![BADGE_FASTEST.to_string()]);
        assert_eq!(recommendation.badges["col:jnt-reg"], vec![BADGE_CHEAPEST.to_string()]);
    }

    #[test]
    fn same_day_label_counts_as_one_day() {
        let rates = vec![rate("jne", 12_000, "0 hari"), rate("jnt", 10_000, "2 hari")];
        let recommendation = recommend_rates(&rates, 80_000, &RecommendationSettings::default());

        assert!(recommendation.is_available);
        let jne = recommendation
            .scores
            .iter()
            .find(|score| score.rate_id == "col:jne-reg")
            .expect("jne scored");
        assert_eq!(jne.eta_score, 100.0);
        assert_eq!(recommendation.badges["col:jne-reg"], vec![BADGE_FASTEST.to_string()]);
        assert_eq!(eta_days_for_scoring("besok"), UNKNOWN_ETA_DAYS);
    }

    #[test]
    fn no_rates_means_unavailable() {
        let recommendation = recommend_rates(&[], 10_000, &RecommendationSettings::default());
        assert!(!recommendation.is_available);
        assert!(recommendation.badges.is_empty());
    }
}
