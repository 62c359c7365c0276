//! Courier invoices against checkout estimates: variance logging, periodic
//! reports, threshold alerts and surcharge tuning suggestions.

mod parser;
mod report;

pub use report::{
    build_variance_report, check_threshold_and_notify, recommend_rule_tuning,
    TracingVarianceAlerts, TuningAction, TuningRecommendation, VarianceAlert, VarianceAlertSink,
    VarianceGroup, VarianceSample, ADJUSTMENT_STEP,
};

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::RepositoryError;

use parser::{parse_actual_costs, parse_order_ledger};

pub type OrderId = u64;

/// Longest report window accepted from configuration.
pub const MAX_REPORT_PERIOD_DAYS: u32 = 366;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Rupiah of average variance, either direction, that raises an alert.
    pub variance_threshold: u64,
    pub minimum_samples: u32,
    pub report_period_days: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            variance_threshold: 5_000,
            minimum_samples: 3,
            report_period_days: 7,
        }
    }
}

/// Blank amounts read as zero.
fn amount<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

/// One line of a courier invoice. Route fields fall back to the order's
/// checkout selection when blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualCostRecord {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub courier: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default, alias = "area_code")]
    pub area: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    pub actual_cost: u64,
    #[serde(default, alias = "awb")]
    pub source_reference: Option<String>,
}

/// Shipping selection stored on an order at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShipping {
    pub order_id: OrderId,
    #[serde(default)]
    pub courier: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub active_rule: String,
    #[serde(default, deserialize_with = "amount")]
    pub estimated_cost: u64,
    #[serde(default, deserialize_with = "amount")]
    pub shipping_total: u64,
}

impl OrderShipping {
    /// Quoted cost, or the charged shipping total when no quote was kept.
    pub fn estimate(&self) -> u64 {
        if self.estimated_cost > 0 {
            self.estimated_cost
        } else {
            self.shipping_total
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceRow {
    pub order_id: OrderId,
    #[serde(flatten)]
    pub sample: VarianceSample,
    pub estimated_cost: u64,
    pub actual_cost: u64,
    pub source_reference: String,
    pub reconciled_at: DateTime<Utc>,
}

pub trait OrderLedger: Send + Sync {
    fn order_shipping(&self, order_id: OrderId) -> Result<Option<OrderShipping>, RepositoryError>;
}

pub trait VarianceLog: Send + Sync {
    fn append(&self, row: VarianceRow) -> Result<(), RepositoryError>;
    /// Rows reconciled at or after `since`, oldest first.
    fn rows_since(&self, since: DateTime<Utc>) -> Result<Vec<VarianceRow>, RepositoryError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderLedger {
    orders: BTreeMap<OrderId, OrderShipping>,
}

impl InMemoryOrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: OrderShipping) -> Self {
        self.add_order(order);
        self
    }

    /// Insert or replace an order.
    pub fn add_order(&mut self, order: OrderShipping) {
        self.orders.insert(order.order_id, order);
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl OrderLedger for InMemoryOrderLedger {
    fn order_shipping(&self, order_id: OrderId) -> Result<Option<OrderShipping>, RepositoryError> {
        Ok(self.orders.get(&order_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryVarianceLog {
    rows: Mutex<Vec<VarianceRow>>,
}

impl InMemoryVarianceLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VarianceLog for InMemoryVarianceLog {
    fn append(&self, row: VarianceRow) -> Result<(), RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("variance log poisoned".to_string()))?
            .push(row);
        Ok(())
    }

    fn rows_since(&self, since: DateTime<Utc>) -> Result<Vec<VarianceRow>, RepositoryError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("variance log poisoned".to_string()))?;
        let mut recent: Vec<VarianceRow> = rows
            .iter()
            .filter(|row| row.reconciled_at >= since)
            .cloned()
            .collect();
        recent.sort_by_key(|row| row.reconciled_at);
        Ok(recent)
    }
}

#[derive(Debug)]
pub enum ReconciliationError {
    Io(std::io::Error),
    Csv(csv::Error),
    Store(RepositoryError),
}

impl std::fmt::Display for ReconciliationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconciliationError::Io(err) => write!(f, "failed to read cost export: {}", err),
            ReconciliationError::Csv(err) => write!(f, "invalid cost CSV data: {}", err),
            ReconciliationError::Store(err) => write!(f, "variance store failure: {}", err),
        }
    }
}

impl std::error::Error for ReconciliationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconciliationError::Io(err) => Some(err),
            ReconciliationError::Csv(err) => Some(err),
            ReconciliationError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ReconciliationError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ReconciliationError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for ReconciliationError {
    fn from(err: RepositoryError) -> Self {
        Self::Store(err)
    }
}

/// Build an order ledger from a checkout export.
pub fn import_order_ledger<R: Read>(reader: R) -> Result<InMemoryOrderLedger, ReconciliationError> {
    let mut ledger = InMemoryOrderLedger::new();
    for order in parse_order_ledger(reader)? {
        ledger.add_order(order);
    }
    tracing::info!(orders = ledger.order_count(), "order ledger imported");
    Ok(ledger)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub matched: u32,
    pub unmatched: u32,
    pub rows: Vec<VarianceRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceReport {
    pub generated_at: DateTime<Utc>,
    pub period_days: u32,
    pub rows: Vec<VarianceGroup>,
    pub alerts: Vec<VarianceAlert>,
    pub recommendations: Vec<TuningRecommendation>,
}

/// Matches invoice lines to orders, logs the variance of each, and reports on
/// recent variance per route and rule.
pub struct CostReconciliationService {
    ledger: Arc<dyn OrderLedger>,
    log: Arc<dyn VarianceLog>,
    alerts: Arc<dyn VarianceAlertSink>,
    config: ReconciliationConfig,
}

impl CostReconciliationService {
    pub fn new(
        ledger: Arc<dyn OrderLedger>,
        log: Arc<dyn VarianceLog>,
        alerts: Arc<dyn VarianceAlertSink>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            ledger,
            log,
            alerts,
            config,
        }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// Records without a known order are counted as unmatched and skipped.
    pub fn ingest(
        &self,
        records: &[ActualCostRecord],
        reconciled_at: DateTime<Utc>,
    ) -> Result<IngestSummary, RepositoryError> {
        let mut summary = IngestSummary {
            matched: 0,
            unmatched: 0,
            rows: Vec::new(),
        };

        for record in records {
            let order = match record.order_id.filter(|id| *id > 0) {
                Some(order_id) => self.ledger.order_shipping(order_id)?,
                None => None,
            };
            let Some(order) = order else {
                summary.unmatched += 1;
                continue;
            };

            let row = variance_row(record, &order, reconciled_at);
            self.log.append(row.clone())?;
            summary.rows.push(row);
            summary.matched += 1;
        }

        tracing::info!(
            matched = summary.matched,
            unmatched = summary.unmatched,
            "actual shipping costs ingested"
        );
        Ok(summary)
    }

    pub fn ingest_csv<R: Read>(
        &self,
        reader: R,
        reconciled_at: DateTime<Utc>,
    ) -> Result<IngestSummary, ReconciliationError> {
        let records = parse_actual_costs(reader)?;
        Ok(self.ingest(&records, reconciled_at)?)
    }

    /// Report over rows reconciled within the configured period before `now`.
    pub fn generate_report(&self, now: DateTime<Utc>) -> Result<VarianceReport, RepositoryError> {
        let period_days = self.config.report_period_days.clamp(1, MAX_REPORT_PERIOD_DAYS);
        let since = now
            .checked_sub_signed(Duration::days(i64::from(period_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let samples: Vec<VarianceSample> = self
            .log
            .rows_since(since)?
            .into_iter()
            .filter(|row| row.reconciled_at <= now)
            .map(|row| row.sample)
            .collect();

        let threshold = self.config.variance_threshold;
        let rows = build_variance_report(&samples);
        let alerts = check_threshold_and_notify(&rows, threshold, self.alerts.as_ref());
        let recommendations = recommend_rule_tuning(&rows, threshold, self.config.minimum_samples);

        tracing::info!(
            period_days,
            rows = rows.len(),
            alerts = alerts.len(),
            recommendations = recommendations.len(),
            "cost variance report generated"
        );

        Ok(VarianceReport {
            generated_at: now,
            period_days,
            rows,
            alerts,
            recommendations,
        })
    }
}

fn variance_row(
    record: &ActualCostRecord,
    order: &OrderShipping,
    reconciled_at: DateTime<Utc>,
) -> VarianceRow {
    let or_order = |value: &Option<String>, fallback: &str| {
        value
            .as_deref()
            .filter(|value| !value.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };
    let estimated_cost = order.estimate();
    let variance = i64::try_from(record.actual_cost)
        .unwrap_or(i64::MAX)
        .saturating_sub(i64::try_from(estimated_cost).unwrap_or(i64::MAX));

    VarianceRow {
        order_id: order.order_id,
        sample: VarianceSample {
            courier: or_order(&record.courier, &order.courier),
            service: or_order(&record.service, &order.service),
            area: or_order(&record.area, &order.area),
            active_rule: order.active_rule.clone(),
            variance,
        },
        estimated_cost,
        actual_cost: record.actual_cost,
        source_reference: record.source_reference.clone().unwrap_or_default(),
        reconciled_at,
    }
}
