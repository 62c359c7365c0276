use crate::cli::ServeArgs;
use crate::infra::{build_engine_state, load_catalog, service_events, AppState, CatalogPaths};
use crate::routes::with_engine_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ongkir_engine::config::AppConfig;
use ongkir_engine::error::AppError;
use ongkir_engine::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(&CatalogPaths {
        warehouses: args.warehouses_csv.take(),
        origins: args.origins_csv.take(),
    })?;
    info!(
        warehouses = catalog.warehouse_count(),
        products = catalog.product_count(),
        "origin catalog loaded"
    );

    let engine = build_engine_state(&config, catalog, service_events());
    let app = with_engine_routes(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        provider = %config.shipping.provider,
        cod_risk = config.risk.enabled,
        "ongkir engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
