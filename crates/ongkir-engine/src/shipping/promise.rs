use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::catalog::RepositoryError;

use super::domain::WarehouseId;
use super::eta::EtaRange;

/// Deliveries needed before history may correct a promise.
pub const MIN_SLA_SAMPLES: u32 = 5;

/// Order cutoff assumed for warehouses without one on record.
pub fn default_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 0, 0).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseConfidence {
    High,
    Medium,
    Low,
}

impl PromiseConfidence {
    pub fn assess(adjustment_days: u32, sample_size: u32) -> Self {
        if adjustment_days <= 1 && sample_size >= 10 {
            Self::High
        } else if adjustment_days <= 2 && sample_size >= MIN_SLA_SAMPLES {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PromiseConfidence::High => "high",
            PromiseConfidence::Medium => "medium",
            PromiseConfidence::Low => "low",
        }
    }
}

/// Delivery window shown to the buyer for one rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPromise {
    pub eta_min_days: u32,
    pub eta_max_days: u32,
    pub eta_label: String,
    pub confidence: PromiseConfidence,
    pub reasons: Vec<String>,
    pub baseline_eta_label: String,
}

/// Delivered-late statistics for one courier service.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SlaStats {
    pub sample_size: u32,
    pub average_delay_days: f64,
}

impl SlaStats {
    /// Whole days added to promises; zero below [`MIN_SLA_SAMPLES`].
    pub fn adjustment_days(&self) -> u32 {
        if self.sample_size < MIN_SLA_SAMPLES {
            return 0;
        }
        self.average_delay_days.max(0.0).ceil() as u32
    }
}

pub trait WarehouseCutoffs: Send + Sync {
    fn cutoff(&self, warehouse_id: WarehouseId) -> Result<Option<NaiveTime>, RepositoryError>;
}

pub trait OperationalCalendar: Send + Sync {
    /// Closed days between `start` and `end`, both inclusive.
    fn closed_days_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u32, RepositoryError>;
}

pub trait DeliveryHistory: Send + Sync {
    fn sla_stats(&self, courier: &str, service: &str) -> Result<SlaStats, RepositoryError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCutoffs {
    cutoffs: BTreeMap<WarehouseId, NaiveTime>,
}

impl InMemoryCutoffs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cutoff(mut self, warehouse_id: WarehouseId, cutoff: NaiveTime) -> Self {
        self.cutoffs.insert(warehouse_id, cutoff);
        self
    }
}

impl WarehouseCutoffs for InMemoryCutoffs {
    fn cutoff(&self, warehouse_id: WarehouseId) -> Result<Option<NaiveTime>, RepositoryError> {
        Ok(self.cutoffs.get(&warehouse_id).copied())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCalendar {
    closed: BTreeSet<NaiveDate>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_closed_day(mut self, date: NaiveDate) -> Self {
        self.closed.insert(date);
        self
    }
}

impl OperationalCalendar for InMemoryCalendar {
    fn closed_days_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u32, RepositoryError> {
        if start > end {
            return Ok(0);
        }
        Ok(self.closed.range(start..=end).count() as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DeliveryRecord {
    courier: String,
    service: String,
    promised_max_date: NaiveDate,
    delivered_on: NaiveDate,
}

/// Promised-versus-actual log of completed deliveries.
#[derive(Debug, Default)]
pub struct InMemoryDeliveryHistory {
    records: Mutex<Vec<DeliveryRecord>>,
}

impl InMemoryDeliveryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        courier: &str,
        service: &str,
        promised_max_date: NaiveDate,
        delivered_on: NaiveDate,
    ) -> Result<(), RepositoryError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("delivery history poisoned".to_string()))?;
        records.push(DeliveryRecord {
            courier: courier.to_string(),
            service: service.to_string(),
            promised_max_date,
            delivered_on,
        });
        Ok(())
    }
}

impl DeliveryHistory for InMemoryDeliveryHistory {
    fn sla_stats(&self, courier: &str, service: &str) -> Result<SlaStats, RepositoryError> {
        let records = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("delivery history poisoned".to_string()))?;

        let delays: Vec<i64> = records
            .iter()
            .filter(|record| {
                record.courier.eq_ignore_ascii_case(courier)
                    && record.service.eq_ignore_ascii_case(service)
            })
            .map(|record| {
                (record.delivered_on - record.promised_max_date)
                    .num_days()
                    .max(0)
            })
            .collect();

        if delays.is_empty() {
            return Ok(SlaStats::default());
        }
        Ok(SlaStats {
            sample_size: delays.len() as u32,
            average_delay_days: delays.iter().sum::<i64>() as f64 / delays.len() as f64,
        })
    }
}

/// Turns a courier ETA into a buyer-facing promise.
///
/// The baseline window shifts by one day past the warehouse cutoff, by every
/// closed day inside the window, and by the historical SLA delay once enough
/// deliveries are on record. Store failures skip their adjustment.
#[derive(Clone)]
pub struct DeliveryPromiseEngine {
    cutoffs: Arc<dyn WarehouseCutoffs>,
    calendar: Arc<dyn OperationalCalendar>,
    history: Arc<dyn DeliveryHistory>,
}

impl Default for DeliveryPromiseEngine {
    fn default() -> Self {
        Self::new(
            Arc::new(InMemoryCutoffs::new()),
            Arc::new(InMemoryCalendar::new()),
            Arc::new(InMemoryDeliveryHistory::new()),
        )
    }
}

impl DeliveryPromiseEngine {
    pub fn new(
        cutoffs: Arc<dyn WarehouseCutoffs>,
        calendar: Arc<dyn OperationalCalendar>,
        history: Arc<dyn DeliveryHistory>,
    ) -> Self {
        Self {
            cutoffs,
            calendar,
            history,
        }
    }

    pub fn build_promise(
        &self,
        courier: &str,
        service: &str,
        eta_label: &str,
        warehouse_id: WarehouseId,
        now: NaiveDateTime,
    ) -> DeliveryPromise {
        let baseline = EtaRange::parse(eta_label);
        let mut window = baseline;
        let mut adjustment_days = 0u32;
        let mut reasons = vec![format!("ETA dasar kurir: {}", baseline.label())];

        let mut shift = |window: &mut EtaRange, days: u32| {
            window.min_days += days;
            window.max_days += days;
            adjustment_days += days;
        };

        if self.past_cutoff(warehouse_id, now) {
            shift(&mut window, 1);
            reasons.push("Pesanan masuk setelah jam cutoff gudang.".to_string());
        }

        let closed_days = self.closed_days(now.date(), window.max_days);
        if closed_days > 0 {
            shift(&mut window, closed_days);
            reasons.push(format!("+{closed_days} hari karena hari libur operasional."));
        }

        let sla = self.sla(courier, service);
        let sla_days = sla.adjustment_days();
        if sla_days > 0 {
            shift(&mut window, sla_days);
            reasons.push(format!(
                "Koreksi riwayat SLA +{sla_days} hari (n={}).",
                sla.sample_size
            ));
        }

        DeliveryPromise {
            eta_min_days: window.min_days,
            eta_max_days: window.max_days,
            eta_label: window.label(),
            confidence: PromiseConfidence::assess(adjustment_days, sla.sample_size),
            reasons,
            baseline_eta_label: baseline.label(),
        }
    }

    fn past_cutoff(&self, warehouse_id: WarehouseId, now: NaiveDateTime) -> bool {
        let cutoff = match self.cutoffs.cutoff(warehouse_id) {
            Ok(cutoff) => cutoff.unwrap_or_else(default_cutoff),
            Err(err) => {
                tracing::warn!(warehouse_id, error = %err, "warehouse cutoff lookup failed");
                default_cutoff()
            }
        };
        now > now.date().and_time(cutoff)
    }

    fn closed_days(&self, start: NaiveDate, window_days: u32) -> u32 {
        let end = start
            .checked_add_days(Days::new(u64::from(window_days)))
            .unwrap_or(start);
        self.calendar
            .closed_days_between(start, end)
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "operational calendar lookup failed");
                0
            })
    }

    fn sla(&self, courier: &str, service: &str) -> SlaStats {
        self.history
            .sla_stats(courier, service)
            .unwrap_or_else(|err| {
                tracing::warn!(courier, service, error = %err, "delivery history lookup failed");
                SlaStats::default()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn morning_order_keeps_courier_window() {
        let promise =
            DeliveryPromiseEngine::default().build_promise("jne", "REG", "2-3 hari", 1, at(9, 0));

        assert_eq!((promise.eta_min_days, promise.eta_max_days), (2, 3));
        assert_eq!(promise.eta_label, "2-3 hari");
        assert_eq!(promise.confidence, PromiseConfidence::Low);
        assert_eq!(promise.reasons.len(), 1);
    }

    #[test]
    fn warehouse_cutoff_overrides_default() {
        let cutoffs = InMemoryCutoffs::new().with_cutoff(
            7,
            NaiveTime::from_hms_opt(18, 0, 0).expect("valid time"),
        );
        let engine = DeliveryPromiseEngine::new(
            Arc::new(cutoffs),
            Arc::new(InMemoryCalendar::new()),
            Arc::new(InMemoryDeliveryHistory::new()),
        );

        let late_cutoff = engine.build_promise("jne", "REG", "2 hari", 7, at(16, 30));
        assert_eq!(late_cutoff.eta_label, "2 hari");

        let default_cutoff = engine.build_promise("jne", "REG", "2 hari", 8, at(16, 30));
        assert_eq!(default_cutoff.eta_label, "3 hari");
        assert_eq!(default_cutoff.baseline_eta_label, "2 hari");
    }

    #[test]
    fn calendar_counts_closed_days_inside_window_only() {
        let day = |d: u32| NaiveDate::from_ymd_opt(2026, 1, d).expect("valid date");
        let calendar = InMemoryCalendar::new()
            .with_closed_day(day(2))
            .with_closed_day(day(3))
            .with_closed_day(day(20));

        let inside = calendar
            .closed_days_between(day(1), day(4))
            .expect("calendar reads");
        assert_eq!(inside, 2);
        let reversed = calendar
            .closed_days_between(day(4), day(1))
            .expect("calendar reads");
        assert_eq!(reversed, 0);
    }

    #[test]
    fn history_below_sample_floor_is_ignored() {
        let history = InMemoryDeliveryHistory::new();
        let promised = NaiveDate::from_ymd_opt(2026, 1, 5).expect("valid date");
        let late = NaiveDate::from_ymd_opt(2026, 1, 8).expect("valid date");
        for _ in 0..4 {
            history.record("jne", "REG", promised, late).expect("recorded");
        }
        history.record("jne", "REG", promised, promised).expect("recorded");

        let stats = history.sla_stats("JNE", "reg").expect("stats");
        assert_eq!(stats.sample_size, 5);
        assert!((stats.average_delay_days - 2.4).abs() < 1e-9);
        assert_eq!(stats.adjustment_days(), 3);

        let thin = SlaStats {
            sample_size: 4,
            average_delay_days: 3.0,
        };
        assert_eq!(thin.adjustment_days(), 0);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(PromiseConfidence::assess(1, 10), PromiseConfidence::High);
        assert_eq!(PromiseConfidence::assess(2, 10), PromiseConfidence::Medium);
        assert_eq!(PromiseConfidence::assess(0, 5), PromiseConfidence::Medium);
        assert_eq!(PromiseConfidence::assess(0, 4), PromiseConfidence::Low);
        assert_eq!(PromiseConfidence::assess(3, 50), PromiseConfidence::Low);
    }
}
