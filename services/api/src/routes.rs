use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use ongkir_engine::catalog::OriginRepository;
use ongkir_engine::{engine_router, EngineState};
use serde_json::json;

pub(crate) fn with_engine_routes<R>(state: EngineState<R>) -> axum::Router
where
    R: OriginRepository + 'static,
{
    engine_router(state)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{build_engine_state, demo_catalog};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use ongkir_engine::config::AppConfig;
    use ongkir_engine::shipping::TracingRateEvents;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let config = AppConfig::default();
        let engine = build_engine_state(
            &config,
            demo_catalog().expect("demo catalog builds"),
            Arc::new(TracingRateEvents),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_engine_routes(engine).layer(Extension(state))
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_flag() {
        let (status, body) = send(app(false), get("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        let (status, body) = send(app(true), get("/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn quote_route_serves_demo_catalog() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/shipping/quote")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "lines": [
                        { "product_id": 101, "quantity": 2, "unit_weight_gram": 250 },
                        { "product_id": 102, "quantity": 2, "unit_weight_gram": 900 }
                    ],
                    "destination": { "district_code": "3273010", "city": "Bandung" },
                    "cart_total": 350000
                })
                .to_string(),
            ))
            .expect("request builds");

        let (status, body) = send(app(true), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plan_kind"], "single_origin");
        assert_eq!(body["origin_list"], json!(["BDG"]));
        assert!(!body["rates"].as_array().map(Vec::is_empty).unwrap_or(true));
        assert_eq!(body["recommendation"]["is_available"], true);
    }
}
