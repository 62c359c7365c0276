use chrono::NaiveTime;
use metrics_exporter_prometheus::PrometheusHandle;
use ongkir_engine::catalog::{InMemoryOriginCatalog, RepositoryError};
use ongkir_engine::config::AppConfig;
use ongkir_engine::error::AppError;
use ongkir_engine::risk::CodRiskEngine;
use ongkir_engine::shipping::{
    default_cutoff, DeliveryPromiseEngine, FanOutRateEvents, InMemoryCalendar, InMemoryCutoffs,
    InMemoryDeliveryHistory, InMemoryRateCache, InMemoryStaleStore, OriginMapping,
    RateAcquisitionPipeline, RateEvent, RateEventSink, ShippingQuoteService,
    SimulatedRateProvider, TracingRateEvents, Warehouse,
};
use ongkir_engine::EngineState;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Counts pipeline events under `ongkir_rate_events_total{event,provider}`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PrometheusRateEvents;

impl RateEventSink for PrometheusRateEvents {
    fn record(&self, event: &RateEvent) {
        metrics::counter!(
            "ongkir_rate_events_total",
            "event" => event.kind.label(),
            "provider" => event.provider.clone()
        )
        .increment(1);
    }
}

/// Paths to `warehouses.csv` and `product_origins.csv` exports.
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogPaths {
    pub(crate) warehouses: Option<PathBuf>,
    pub(crate) origins: Option<PathBuf>,
}

pub(crate) fn load_catalog(paths: &CatalogPaths) -> Result<InMemoryOriginCatalog, AppError> {
    match (&paths.warehouses, &paths.origins) {
        (Some(warehouses), Some(origins)) => {
            Ok(InMemoryOriginCatalog::from_csv_paths(warehouses, origins)?)
        }
        _ => Ok(demo_catalog()?),
    }
}

/// Three warehouses and a handful of products, enough to exercise both plans.
pub(crate) fn demo_catalog() -> Result<InMemoryOriginCatalog, RepositoryError> {
    let mut catalog = InMemoryOriginCatalog::new()
        .with_warehouse(warehouse(1, "Gudang Jakarta", "JKT", 1))
        .with_warehouse(warehouse(2, "Gudang Bandung", "BDG", 2))
        .with_warehouse(warehouse(3, "Gudang Surabaya", "SUB", 3));

    let origins = [
        // Kaos polos: plenty everywhere.
        (101, origin(1, 50, 1, false)),
        (101, origin(2, 30, 2, false)),
        // Sepatu lari: short in Jakarta.
        (102, origin(1, 1, 1, false)),
        (102, origin(2, 6, 2, false)),
        // Rice cooker: Surabaya only, Bandung as fallback.
        (103, origin(3, 4, 1, false)),
        (103, origin(2, 2, 5, true)),
    ];
    for (product_id, mapping) in origins {
        catalog.add_origin(product_id, mapping)?;
    }
    Ok(catalog)
}

/// Order cutoffs for the demo warehouses; Jakarta keeps the default.
pub(crate) fn demo_promises() -> DeliveryPromiseEngine {
    let cutoff = |hour: u32| NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_else(default_cutoff);
    let cutoffs = InMemoryCutoffs::new()
        .with_cutoff(2, cutoff(14))
        .with_cutoff(3, cutoff(13));

    DeliveryPromiseEngine::new(
        Arc::new(cutoffs),
        Arc::new(InMemoryCalendar::new()),
        Arc::new(InMemoryDeliveryHistory::new()),
    )
}

fn warehouse(id: u64, name: &str, region_code: &str, priority: u32) -> Warehouse {
    Warehouse {
        id,
        name: name.to_string(),
        region_code: region_code.to_string(),
        priority,
    }
}

fn origin(warehouse_id: u64, stock_qty: u32, priority: u32, is_fallback: bool) -> OriginMapping {
    OriginMapping {
        warehouse_id,
        stock_qty,
        priority,
        is_fallback,
    }
}

pub(crate) fn build_engine_state(
    config: &AppConfig,
    catalog: InMemoryOriginCatalog,
    events: Arc<dyn RateEventSink>,
) -> EngineState<InMemoryOriginCatalog> {
    let pipeline = RateAcquisitionPipeline::new(
        Arc::new(InMemoryRateCache::new()),
        Arc::new(InMemoryStaleStore::new()),
        Arc::new(SimulatedRateProvider::new(&config.shipping.provider)),
        events,
        config.shipping.pipeline_settings(),
    );

    EngineState {
        quotes: Arc::new(
            ShippingQuoteService::new(Arc::new(catalog), pipeline, config.shipping.clone())
                .with_promises(demo_promises()),
        ),
        risk: Arc::new(CodRiskEngine::new(config.risk.clone())),
    }
}

pub(crate) fn service_events() -> Arc<dyn RateEventSink> {
    Arc::new(FanOutRateEvents::new(vec![
        Arc::new(TracingRateEvents),
        Arc::new(PrometheusRateEvents),
    ]))
}
