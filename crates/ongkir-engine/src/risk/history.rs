use serde::{Deserialize, Serialize};

/// Number of recent orders considered when deriving a customer's history.
pub const HISTORY_WINDOW: usize = 20;

/// A past order of the same customer, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastOrder {
    pub status: String,
    #[serde(default)]
    pub rto_flag: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerHistory {
    pub cancel_count: u32,
    pub rto_count: u32,
    pub completed_count: u32,
}

impl CustomerHistory {
    /// Count outcomes over the most recent [`HISTORY_WINDOW`] orders.
    pub fn from_orders(orders: &[PastOrder]) -> Self {
        let mut history = Self::default();
        for order in orders.iter().take(HISTORY_WINDOW) {
            let status = order.status.trim().to_ascii_lowercase();
            let status = status.strip_prefix("wc-").unwrap_or(&status);
            if matches!(status, "cancelled" | "failed" | "refunded") {
                history.cancel_count += 1;
            }
            if order.rto_flag || status == "rto" {
                history.rto_count += 1;
            }
            if status == "completed" {
                history.completed_count += 1;
            }
        }
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: &str, rto_flag: bool) -> PastOrder {
        PastOrder {
            status: status.to_string(),
            rto_flag,
        }
    }

    #[test]
    fn counts_each_outcome() {
        let history = CustomerHistory::from_orders(&[
            order("completed", false),
            order("wc-cancelled", false),
            order("refunded", false),
            order("rto", false),
            order("processing", true),
            order("Completed", false),
        ]);
        assert_eq!(
            history,
            CustomerHistory {
                cancel_count: 2,
                rto_count: 2,
                completed_count: 2,
            }
        );
    }

    #[test]
    fn only_recent_window_is_considered() {
        let orders = vec![order("failed", false); HISTORY_WINDOW + 5];
        assert_eq!(
            CustomerHistory::from_orders(&orders).cancel_count,
            HISTORY_WINDOW as u32
        );
    }
}
