use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::catalog::OriginRepository;
use crate::error::AppError;
use crate::risk::{
    check_cod_eligibility, CodEligibility, CodEligibilityContext, CodRiskEngine, CustomerHistory,
    GatewayDecision, PastOrder, PaymentGateway, RiskContext, RiskEvaluation, COD_GATEWAY_ID,
};
use crate::shipping::{
    optimize_packaging, validate_cart, BoxPreset, CartLine, Dimensions, QuoteRequest,
    ShipmentStrategy, ShippingQuoteService, VolumetricDivisors,
};

/// Shared handles behind the engine routes.
pub struct EngineState<R> {
    pub quotes: Arc<ShippingQuoteService<R>>,
    pub risk: Arc<CodRiskEngine>,
}

impl<R> Clone for EngineState<R> {
    fn clone(&self) -> Self {
        Self {
            quotes: Arc::clone(&self.quotes),
            risk: Arc::clone(&self.risk),
        }
    }
}

/// Router builder exposing planning, packaging, quoting and COD risk.
pub fn engine_router<R>(state: EngineState<R>) -> Router
where
    R: OriginRepository + 'static,
{
    Router::new()
        .route("/api/v1/shipping/plan", post(plan_handler::<R>))
        .route("/api/v1/shipping/packaging", post(packaging_handler::<R>))
        .route("/api/v1/shipping/quote", post(quote_handler::<R>))
        .route("/api/v1/cod/risk", post(cod_risk_handler::<R>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub strategy: Option<ShipmentStrategy>,
}

#[derive(Debug, Deserialize)]
pub struct PackagingRequest {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub box_presets: Option<Vec<BoxPreset>>,
    #[serde(default)]
    pub volumetric_divisors: Option<VolumetricDivisors>,
    #[serde(default)]
    pub fallback_dimensions: Option<Dimensions>,
}

#[derive(Debug, Deserialize)]
pub struct CodRiskRequest {
    pub context: RiskContext,
    #[serde(default)]
    pub destination_city: String,
    #[serde(default)]
    pub product_tags: Vec<String>,
    #[serde(default)]
    pub gateways: Vec<PaymentGateway>,
    /// When present, history counts are derived from these orders.
    #[serde(default)]
    pub recent_orders: Option<Vec<PastOrder>>,
}

#[derive(Debug, Serialize)]
pub struct CodRiskResponse {
    pub enabled: bool,
    pub eligibility: CodEligibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<RiskEvaluation>,
    pub gateways: GatewayDecision,
}

pub(crate) async fn plan_handler<R>(
    State(state): State<EngineState<R>>,
    Json(request): Json<PlanRequest>,
) -> Response
where
    R: OriginRepository + 'static,
{
    match state.quotes.plan(&request.lines, request.strategy) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn packaging_handler<R>(
    State(state): State<EngineState<R>>,
    Json(request): Json<PackagingRequest>,
) -> Response
where
    R: OriginRepository + 'static,
{
    if let Err(err) = validate_cart(&request.items) {
        return AppError::from(err).into_response();
    }

    let config = state.quotes.config();
    let presets = request
        .box_presets
        .unwrap_or_else(|| config.box_presets.clone());
    let divisors = request
        .volumetric_divisors
        .unwrap_or_else(|| config.volumetric_divisors.clone());
    let fallback = request
        .fallback_dimensions
        .unwrap_or(config.fallback_dimensions);

    let result = optimize_packaging(&request.items, &presets, &divisors, fallback);
    (StatusCode::OK, Json(result)).into_response()
}

pub(crate) async fn quote_handler<R>(
    State(state): State<EngineState<R>>,
    Json(request): Json<QuoteRequest>,
) -> Response
where
    R: OriginRepository + 'static,
{
    match state.quotes.quote(request).await {
        Ok(quote) => (StatusCode::OK, Json(quote)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn cod_risk_handler<R>(
    State(state): State<EngineState<R>>,
    Json(request): Json<CodRiskRequest>,
) -> Response
where
    R: OriginRepository + 'static,
{
    let mut context = request.context;
    if let Some(orders) = &request.recent_orders {
        context = context.with_history(CustomerHistory::from_orders(orders));
    }

    let eligibility = check_cod_eligibility(&CodEligibilityContext {
        destination_city: request.destination_city,
        cart_total: context.cart_total,
        product_tags: request.product_tags,
    });

    let enabled = state.risk.is_enabled();
    let evaluation = enabled.then(|| state.risk.evaluate(&context));

    let gateways = if !eligibility.allow_cod {
        GatewayDecision {
            gateways: request
                .gateways
                .into_iter()
                .filter(|gateway| gateway.id != COD_GATEWAY_ID)
                .collect(),
            notices: Vec::new(),
        }
    } else {
        match &evaluation {
            Some(evaluation) => state.risk.enforce(request.gateways, evaluation),
            None => GatewayDecision {
                gateways: request.gateways,
                notices: Vec::new(),
            },
        }
    };

    let response = CodRiskResponse {
        enabled,
        eligibility,
        evaluation,
        gateways,
    };
    (StatusCode::OK, Json(response)).into_response()
}
