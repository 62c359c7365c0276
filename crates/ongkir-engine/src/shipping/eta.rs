use serde::{Deserialize, Serialize};

/// All non-negative integers appearing in a free-text label, in order.
pub fn label_numbers(label: &str) -> Vec<u32> {
    label
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse::<u32>().unwrap_or(u32::MAX))
        .collect()
}

/// Largest integer in an ETA label such as `"2-3 hari"`.
pub fn max_eta_days(label: &str) -> Option<u32> {
    label_numbers(label).into_iter().max()
}

/// Delivery window in days parsed from a courier label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtaRange {
    pub min_days: u32,
    pub max_days: u32,
}

impl EtaRange {
    /// Window assumed when a label carries no numbers.
    pub const UNKNOWN: EtaRange = EtaRange {
        min_days: 2,
        max_days: 4,
    };

    pub fn parse(label: &str) -> Self {
        match label_numbers(label).as_slice() {
            [first, second, ..] => Self {
                min_days: (*first).min(*second),
                max_days: (*first).max(*second),
            },
            [only] => {
                let days = (*only).max(1);
                Self {
                    min_days: days,
                    max_days: days,
                }
            }
            [] => Self::UNKNOWN,
        }
    }

    pub fn label(&self) -> String {
        if self.min_days == self.max_days {
            format!("{} hari", self.max_days)
        } else {
            format!("{}-{} hari", self.min_days, self.max_days)
        }
    }
}
