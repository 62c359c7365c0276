use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Surcharge suggestions move in steps of this many rupiah.
pub const ADJUSTMENT_STEP: i64 = 500;

/// Actual minus estimated shipping cost for one reconciled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceSample {
    pub courier: String,
    pub service: String,
    pub area: String,
    /// Rate rule (override or surcharge label) active when the order was quoted.
    #[serde(default)]
    pub active_rule: String,
    pub variance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceGroup {
    pub courier: String,
    pub service: String,
    pub area: String,
    pub active_rule: String,
    pub sample_count: u32,
    pub total_variance: i64,
    pub average_variance: f64,
    pub positive_variance_count: u32,
    pub negative_variance_count: u32,
}

impl VarianceGroup {
    fn start(sample: &VarianceSample) -> Self {
        Self {
            courier: sample.courier.clone(),
            service: sample.service.clone(),
            area: sample.area.clone(),
            active_rule: sample.active_rule.clone(),
            sample_count: 0,
            total_variance: 0,
            average_variance: 0.0,
            positive_variance_count: 0,
            negative_variance_count: 0,
        }
    }

    fn add(&mut self, variance: i64) {
        self.sample_count += 1;
        self.total_variance = self.total_variance.saturating_add(variance);
        if variance > 0 {
            self.positive_variance_count += 1;
        } else if variance < 0 {
            self.negative_variance_count += 1;
        }
    }
}

/// Group samples by courier, service, area and active rule, keeping the order
/// in which each group first appears.
pub fn build_variance_report<'a, I>(samples: I) -> Vec<VarianceGroup>
where
    I: IntoIterator<Item = &'a VarianceSample>,
{
    let mut positions: HashMap<(&str, &str, &str, &str), usize> = HashMap::new();
    let mut groups: Vec<VarianceGroup> = Vec::new();

    for sample in samples {
        let key = (
            sample.courier.as_str(),
            sample.service.as_str(),
            sample.area.as_str(),
            sample.active_rule.as_str(),
        );
        let index = *positions.entry(key).or_insert_with(|| {
            groups.push(VarianceGroup::start(sample));
            groups.len() - 1
        });
        groups[index].add(sample.variance);
    }

    for group in &mut groups {
        if group.sample_count > 0 {
            group.average_variance = group.total_variance as f64 / f64::from(group.sample_count);
        }
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningAction {
    AddSurcharge,
    ReduceSurcharge,
}

impl TuningAction {
    pub const fn label(self) -> &'static str {
        match self {
            TuningAction::AddSurcharge => "add_surcharge",
            TuningAction::ReduceSurcharge => "reduce_surcharge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningRecommendation {
    pub courier: String,
    pub service: String,
    pub area: String,
    pub active_rule: String,
    pub recommended_action: TuningAction,
    /// Signed rupiah amount, a multiple of [`ADJUSTMENT_STEP`].
    pub suggested_adjustment: i64,
    pub average_variance: f64,
    pub sample_count: u32,
}

/// Suggest surcharge changes for groups whose average variance reaches the
/// threshold with enough samples behind it.
pub fn recommend_rule_tuning(
    report: &[VarianceGroup],
    threshold: u64,
    minimum_samples: u32,
) -> Vec<TuningRecommendation> {
    report
        .iter()
        .filter(|group| group.sample_count >= minimum_samples)
        .filter(|group| group.average_variance.abs() >= threshold as f64)
        .filter_map(|group| {
            let steps = (group.average_variance / ADJUSTMENT_STEP as f64).round() as i64;
            let suggested_adjustment = steps.saturating_mul(ADJUSTMENT_STEP);
            if suggested_adjustment == 0 {
                return None;
            }
            let recommended_action = if suggested_adjustment > 0 {
                TuningAction::AddSurcharge
            } else {
                TuningAction::ReduceSurcharge
            };
            Some(TuningRecommendation {
                courier: group.courier.clone(),
                service: group.service.clone(),
                area: group.area.clone(),
                active_rule: group.active_rule.clone(),
                recommended_action,
                suggested_adjustment,
                average_variance: group.average_variance,
                sample_count: group.sample_count,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceAlert {
    pub courier: String,
    pub service: String,
    pub area: String,
    pub active_rule: String,
    pub average_variance: f64,
    pub threshold: u64,
}

/// Receives the alerts of one report run; never called with an empty batch.
pub trait VarianceAlertSink: Send + Sync {
    fn notify(&self, alerts: &[VarianceAlert]);
}

/// Writes alert batches to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingVarianceAlerts;

impl VarianceAlertSink for TracingVarianceAlerts {
    fn notify(&self, alerts: &[VarianceAlert]) {
        let groups = alerts
            .iter()
            .map(|alert| {
                format!(
                    "{}/{}/{}={:.0}",
                    alert.courier, alert.service, alert.area, alert.average_variance
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        tracing::warn!(
            event = "cost_variance_threshold",
            alerts = alerts.len(),
            threshold = alerts.first().map(|alert| alert.threshold).unwrap_or_default(),
            groups = %groups,
            "shipping cost variance above threshold"
        );
    }
}

/// Collect groups whose average variance reaches the threshold in either
/// direction and hand them to `sink` as a single batch.
pub fn check_threshold_and_notify(
    report: &[VarianceGroup],
    threshold: u64,
    sink: &dyn VarianceAlertSink,
) -> Vec<VarianceAlert> {
    let alerts: Vec<VarianceAlert> = report
        .iter()
        .filter(|group| group.average_variance.abs() >= threshold as f64)
        .map(|group| VarianceAlert {
            courier: group.courier.clone(),
            service: group.service.clone(),
            area: group.area.clone(),
            active_rule: group.active_rule.clone(),
            average_variance: group.average_variance,
            threshold,
        })
        .collect();

    if !alerts.is_empty() {
        sink.notify(&alerts);
    }
    alerts
}
