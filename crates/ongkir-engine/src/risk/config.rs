use serde::{Deserialize, Serialize};

/// Relative weight of each risk signal. Zero removes a signal from the blend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub order_value: u32,
    pub area_distance: u32,
    pub customer_history: u32,
    pub address_quality: u32,
    pub order_time: u32,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            order_value: 25,
            area_distance: 20,
            customer_history: 25,
            address_quality: 15,
            order_time: 15,
        }
    }
}

/// Score cut-offs, inclusive, on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub block: u8,
    pub review: u8,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            block: 80,
            review: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub enabled: bool,
    pub weights: RiskWeights,
    pub thresholds: RiskThresholds,
    /// Hours of day (0-23) treated as risky for COD orders.
    pub risky_hours: Vec<u8>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weights: RiskWeights::default(),
            thresholds: RiskThresholds::default(),
            risky_hours: vec![22, 23, 0, 1, 2, 3, 4],
        }
    }
}

impl RiskConfig {
    pub fn with_thresholds(mut self, block: i64, review: i64) -> Self {
        self.thresholds = RiskThresholds {
            block: block.clamp(0, 100) as u8,
            review: review.clamp(0, 100) as u8,
        };
        self
    }

    /// Clamp each hour into 0-23 and drop repeats, keeping first occurrence.
    pub fn with_risky_hours(mut self, hours: &[i64]) -> Self {
        let mut risky_hours: Vec<u8> = Vec::with_capacity(hours.len());
        for hour in hours {
            let hour = (*hour).clamp(0, 23) as u8;
            if !risky_hours.contains(&hour) {
                risky_hours.push(hour);
            }
        }
        self.risky_hours = risky_hours;
        self
    }
}
