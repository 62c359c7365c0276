use serde::{Deserialize, Serialize};

use super::config::{RiskConfig, RiskWeights};
use super::RiskContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSignal {
    OrderValue,
    AreaDistance,
    CustomerHistory,
    AddressQuality,
    OrderTime,
}

impl RiskSignal {
    pub const ALL: [RiskSignal; 5] = [
        RiskSignal::OrderValue,
        RiskSignal::AreaDistance,
        RiskSignal::CustomerHistory,
        RiskSignal::AddressQuality,
        RiskSignal::OrderTime,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RiskSignal::OrderValue => "order_value",
            RiskSignal::AreaDistance => "area_distance",
            RiskSignal::CustomerHistory => "customer_history",
            RiskSignal::AddressQuality => "address_quality",
            RiskSignal::OrderTime => "order_time",
        }
    }

    fn weight(self, weights: &RiskWeights) -> u32 {
        match self {
            RiskSignal::OrderValue => weights.order_value,
            RiskSignal::AreaDistance => weights.area_distance,
            RiskSignal::CustomerHistory => weights.customer_history,
            RiskSignal::AddressQuality => weights.address_quality,
            RiskSignal::OrderTime => weights.order_time,
        }
    }
}

/// Per-signal risk, each on a 0-100 scale where higher is riskier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalScores {
    pub order_value: u8,
    pub area_distance: u8,
    pub customer_history: u8,
    pub address_quality: u8,
    pub order_time: u8,
}

impl SignalScores {
    pub fn get(&self, signal: RiskSignal) -> u8 {
        match signal {
            RiskSignal::OrderValue => self.order_value,
            RiskSignal::AreaDistance => self.area_distance,
            RiskSignal::CustomerHistory => self.customer_history,
            RiskSignal::AddressQuality => self.address_quality,
            RiskSignal::OrderTime => self.order_time,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiskSignal, u8)> + '_ {
        RiskSignal::ALL.into_iter().map(|signal| (signal, self.get(signal)))
    }
}

pub(crate) fn score_signals(
    context: &RiskContext,
    order_hour: i32,
    config: &RiskConfig,
) -> SignalScores {
    SignalScores {
        order_value: order_value(context.cart_total),
        area_distance: area_distance(&context.destination_district_code, &context.origin_list),
        customer_history: customer_history(
            context.cancel_count,
            context.rto_count,
            context.completed_count,
        ),
        address_quality: address_quality(&context.address_line, &context.destination_postcode),
        order_time: order_time(order_hour, &config.risky_hours),
    }
}

/// Weighted mean of the signals, rounded and clamped to 0-100. Zero when
/// every weight is zero.
pub(crate) fn blend(scores: &SignalScores, weights: &RiskWeights) -> u8 {
    let (weighted, total_weight) = scores
        .iter()
        .fold((0u64, 0u64), |(sum, total), (signal, score)| {
            let weight = u64::from(signal.weight(weights));
            (sum + u64::from(score) * weight, total + weight)
        });

    if total_weight == 0 {
        return 0;
    }
    let score = (weighted as f64 / total_weight as f64).round();
    score.clamp(0.0, 100.0) as u8
}

fn order_value(cart_total: u64) -> u8 {
    match cart_total {
        total if total >= 1_000_000 => 90,
        total if total >= 500_000 => 70,
        total if total >= 250_000 => 45,
        _ => 20,
    }
}

fn area_distance(destination: &str, origin_list: &[String]) -> u8 {
    if destination.is_empty() {
        return 50;
    }
    if origin_list.iter().any(|origin| origin == destination) {
        return 15;
    }
    75
}

fn customer_history(cancel_count: u32, rto_count: u32, completed_count: u32) -> u8 {
    let negative = i64::from(cancel_count) * 12 + i64::from(rto_count) * 20;
    let reduction = (i64::from(completed_count) * 4).min(30);
    (20 + negative - reduction).clamp(10, 100) as u8
}

// Longer addresses with digits score lower; kept as the product rule states.
fn address_quality(address_line: &str, postcode: &str) -> u8 {
    let mut quality: i32 = 100;
    if address_line.trim().len() >= 24 {
        quality -= 35;
    }
    if address_line.chars().any(|c| c.is_ascii_digit()) {
        quality -= 20;
    }
    if postcode.len() >= 5 {
        quality -= 20;
    }
    quality.clamp(5, 100) as u8
}

fn order_time(hour: i32, risky_hours: &[u8]) -> u8 {
    let hour = hour.clamp(0, 23) as u8;
    if risky_hours.contains(&hour) {
        85
    } else {
        25
    }
}
