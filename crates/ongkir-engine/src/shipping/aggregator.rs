use std::collections::HashMap;

use super::domain::{rate_slug, AggregatedRate, RateQuote};
use super::eta::max_eta_days;

/// Identifier of the combined rate for a courier service.
pub fn aggregated_rate_id(courier: &str, service: &str) -> String {
    format!("col:{}", rate_slug(courier, service))
}

/// Combine per-shipment quotes into one price per courier service.
///
/// Prices are summed, the ETA is the slowest shipment's, and the output keeps
/// the order in which each service first appears. A service missing from some
/// shipments still aggregates over the shipments that quoted it; callers
/// compare `shipment_count` against the plan when full coverage matters.
pub fn aggregate_rates(rate_groups: &[Vec<RateQuote>]) -> Vec<AggregatedRate> {
    let mut aggregated: Vec<AggregatedRate> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for group in rate_groups {
        for quote in group {
            let key = rate_slug(&quote.courier, &quote.service);
            let eta_days = max_eta_days(&quote.eta_label).unwrap_or(1);

            match positions.get(&key) {
                Some(&position) => {
                    let rate = &mut aggregated[position];
                    rate.price = rate.price.saturating_add(quote.price);
                    rate.shipment_count += 1;
                    rate.eta_days_max = rate.eta_days_max.max(eta_days);
                }
                None => {
                    positions.insert(key.clone(), aggregated.len());
                    aggregated.push(AggregatedRate {
                        rate_id: aggregated_rate_id(&quote.courier, &quote.service),
                        courier: quote.courier.clone(),
                        service: quote.service.clone(),
                        price: quote.price,
                        shipment_count: 1,
                        eta_days_max: eta_days,
                        eta_label: String::new(),
                        override_applied: None,
                        surcharge_applied: None,
                        promise: None,
                    });
                }
            }
        }
    }

    for rate in &mut aggregated {
        rate.eta_label = format!("{} hari", rate.eta_days_max.max(1));
    }

    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(courier: &str, service: &str, price: u64, eta: &str) -> RateQuote {
        RateQuote {
            courier: courier.to_string(),
            service: service.to_string(),
            price,
            eta_label: eta.to_string(),
        }
    }

    #[test]
    fn sums_prices_and_keeps_slowest_eta() {
        let groups = vec![
            vec![quote("jne", "REG", 15_000, "2-3 hari"), quote("jnt", "EZ", 14_000, "2 hari")],
            vec![quote("jne", "REG", 12_000, "3-4 hari")],
        ];

        let rates = aggregate_rates(&groups);

        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].rate_id, "col:jne-reg");
        assert_eq!(rates[0].price, 27_000);
        assert_eq!(rates[0].shipment_count, 2);
        assert_eq!(rates[0].eta_label, "4 hari");
        assert_eq!(rates[1].courier, "jnt");
        assert_eq!(rates[1].shipment_count, 1);
    }

    #[test]
    fn eta_without_digits_counts_as_one_day() {
        let rates = aggregate_rates(&[vec![quote("jne", "YES", 30_000, "besok")]]);
        assert_eq!(rates[0].eta_days_max, 1);
        assert_eq!(rates[0].eta_label, "1 hari");
    }

    #[test]
    fn empty_input_yields_no_rates() {
        assert!(aggregate_rates(&[]).is_empty());
        assert!(aggregate_rates(&[Vec::new(), Vec::new()]).is_empty());
    }
}
