use chrono::{DateTime, Utc};
use clap::Args;
use ongkir_engine::config::AppConfig;
use ongkir_engine::error::AppError;
use ongkir_engine::reconciliation::{
    import_order_ledger, CostReconciliationService, InMemoryVarianceLog, IngestSummary,
    ReconciliationConfig, ReconciliationError, TracingVarianceAlerts, VarianceReport,
};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ReconcileArgs {
    /// Courier invoice export (order_id, courier, service, area, actual_cost, source_reference)
    #[arg(long)]
    pub(crate) costs_csv: PathBuf,
    /// Checkout order export (order_id, courier, service, area, active_rule, estimated_cost,
    /// shipping_total)
    #[arg(long)]
    pub(crate) orders_csv: PathBuf,
    /// Override the configured variance alert threshold in rupiah
    #[arg(long)]
    pub(crate) threshold: Option<u64>,
}

pub(crate) fn run_reconcile(args: ReconcileArgs) -> Result<(), AppError> {
    let ReconcileArgs {
        costs_csv,
        orders_csv,
        threshold,
    } = args;

    let mut config = AppConfig::load()?.reconciliation;
    if let Some(threshold) = threshold {
        config.variance_threshold = threshold;
    }

    let (summary, report) = reconcile_exports(
        File::open(costs_csv)?,
        File::open(orders_csv)?,
        config,
        Utc::now(),
    )?;
    render(&summary, &report);
    Ok(())
}

/// Ingest one invoice against one order export and report on it straight away.
pub(crate) fn reconcile_exports<C: Read, O: Read>(
    costs: C,
    orders: O,
    config: ReconciliationConfig,
    now: DateTime<Utc>,
) -> Result<(IngestSummary, VarianceReport), AppError> {
    let service = CostReconciliationService::new(
        Arc::new(import_order_ledger(orders)?),
        Arc::new(InMemoryVarianceLog::new()),
        Arc::new(TracingVarianceAlerts),
        config,
    );
    let summary = service.ingest_csv(costs, now)?;
    let report = service
        .generate_report(now)
        .map_err(ReconciliationError::from)?;
    Ok((summary, report))
}

fn render(summary: &IngestSummary, report: &VarianceReport) {
    println!(
        "Ingested {} invoice row(s); {} unmatched",
        summary.matched, summary.unmatched
    );

    println!("\nVariance by route ({} day window)", report.period_days);
    for row in &report.rows {
        println!(
            "- {} {} -> {} [{}]: {} sample(s), avg {:+.0}, +{} / -{}",
            row.courier,
            row.service,
            row.area,
            if row.active_rule.is_empty() {
                "no rule"
            } else {
                row.active_rule.as_str()
            },
            row.sample_count,
            row.average_variance,
            row.positive_variance_count,
            row.negative_variance_count
        );
    }

    for alert in &report.alerts {
        println!(
            "Alert: {} {} -> {} averages {:+.0} (threshold {})",
            alert.courier, alert.service, alert.area, alert.average_variance, alert.threshold
        );
    }
    for tuning in &report.recommendations {
        println!(
            "Suggest {} {:+} for {} {} -> {}",
            tuning.recommended_action.label(),
            tuning.suggested_adjustment,
            tuning.courier,
            tuning.service,
            tuning.area
        );
    }
}
