use std::sync::Arc;

use chrono::NaiveDateTime;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::catalog::{OriginRepository, RepositoryError};
use crate::clock::{self, Clock};
use crate::config::ShippingConfig;

use super::acquisition::{RateAcquisitionPipeline, RateRequest, RateSource};
use super::adjustments::RateAdjustmentRules;
use super::aggregator::{aggregate_rates, aggregated_rate_id};
use super::domain::{
    validate_cart, AggregatedRate, CartLine, Destination, InputError, RateQuote, Shipment,
};
use super::packaging::optimize_packaging;
use super::planner::{plan_shipments, PlanKind, ShipmentPlans, ShipmentStrategy};
use super::promise::{DeliveryPromise, DeliveryPromiseEngine};
use super::recommendation::{recommend_rates, RateRecommendation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub destination: Destination,
    #[serde(default)]
    pub cart_total: u64,
    /// Overrides the configured strategy for this request.
    #[serde(default)]
    pub strategy: Option<ShipmentStrategy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub strategy: ShipmentStrategy,
    pub selected: Option<PlanKind>,
    pub plans: ShipmentPlans,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentQuote {
    pub shipment: Shipment,
    pub rate_source: RateSource,
    pub quotes: Vec<RateQuote>,
}

/// Request-scoped result of a checkout quote. `origin_list` feeds the COD
/// risk context of the same checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutQuote {
    pub strategy: ShipmentStrategy,
    pub plan_kind: PlanKind,
    pub shipments: Vec<ShipmentQuote>,
    pub rates: Vec<AggregatedRate>,
    pub recommendation: RateRecommendation,
    pub origin_list: Vec<String>,
    pub degraded: bool,
}

impl CheckoutQuote {
    pub fn cheapest(&self) -> Option<&AggregatedRate> {
        self.rates.iter().min_by_key(|rate| rate.price)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("origin repository failure: {0}")]
    Repository(#[from] RepositoryError),
    #[error("no warehouse combination can fulfill the cart")]
    NoFulfillmentPlan,
}

/// Drives a cart through planning, packaging, rate acquisition and
/// aggregation.
pub struct ShippingQuoteService<R> {
    repository: Arc<R>,
    pipeline: RateAcquisitionPipeline,
    config: ShippingConfig,
    promises: DeliveryPromiseEngine,
    clock: Clock,
}

impl<R> ShippingQuoteService<R>
where
    R: OriginRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        pipeline: RateAcquisitionPipeline,
        config: ShippingConfig,
    ) -> Self {
        Self {
            repository,
            pipeline,
            config,
            promises: DeliveryPromiseEngine::default(),
            clock: clock::local_now,
        }
    }

    pub fn with_promises(mut self, promises: DeliveryPromiseEngine) -> Self {
        self.promises = promises;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ShippingConfig {
        &self.config
    }

    pub fn plan(
        &self,
        lines: &[CartLine],
        strategy: Option<ShipmentStrategy>,
    ) -> Result<PlanOutcome, QuoteError> {
        validate_cart(lines)?;

        let product_ids: Vec<_> = lines.iter().map(|line| line.product_id).collect();
        let origin_map = self.repository.origin_map(&product_ids)?;
        let warehouses = self.repository.active_warehouses()?;

        let strategy = strategy.unwrap_or(self.config.strategy);
        let plans = plan_shipments(lines, &origin_map, &warehouses);
        let selected = plans.select(strategy).map(|(kind, _)| kind);

        tracing::info!(
            strategy = strategy.label(),
            selected = selected.map(PlanKind::label).unwrap_or("none"),
            single_origin_score = plans.single_origin.score,
            split_shipment_score = plans.split_shipment.score,
            "shipment plan computed"
        );

        Ok(PlanOutcome {
            strategy,
            selected,
            plans,
        })
    }

    pub async fn quote(&self, request: QuoteRequest) -> Result<CheckoutQuote, QuoteError> {
        let outcome = self.plan(&request.lines, request.strategy)?;
        let (plan_kind, candidate) = outcome
            .plans
            .select(outcome.strategy)
            .ok_or(QuoteError::NoFulfillmentPlan)?;

        let mut shipments = candidate.shipments.clone();
        for shipment in &mut shipments {
            shipment.packaging = Some(optimize_packaging(
                &shipment.items,
                &self.config.box_presets,
                &self.config.volumetric_divisors,
                self.config.fallback_dimensions,
            ));
        }

        let lookups = shipments.iter().map(|shipment| {
            let rate_request = RateRequest::for_shipment(
                &self.config.provider,
                shipment,
                &request.destination,
                &self.config.enabled_couriers,
            );
            async move {
                let key = rate_request.cache_key();
                self.pipeline.fetch_rates(&rate_request, &key).await
            }
        });
        let resolutions = join_all(lookups).await;

        let degraded = resolutions
            .iter()
            .any(|resolution| resolution.source.is_degraded());

        let mut origin_list: Vec<String> = Vec::new();
        for shipment in &shipments {
            let region = &shipment.origin_region_code;
            if !region.is_empty() && !origin_list.contains(region) {
                origin_list.push(region.clone());
            }
        }

        let shipments: Vec<ShipmentQuote> = shipments
            .into_iter()
            .zip(resolutions)
            .map(|(shipment, resolution)| ShipmentQuote {
                shipment,
                rate_source: resolution.source,
                quotes: resolution.quotes,
            })
            .collect();

        let rate_groups: Vec<Vec<RateQuote>> = shipments
            .iter()
            .map(|shipment| shipment.quotes.clone())
            .collect();
        let mut rates = self
            .adjustments()
            .apply(aggregate_rates(&rate_groups), &request.destination);
        let ordered_at = (self.clock)();
        for rate in &mut rates {
            rate.promise = self.promise_for(rate, &shipments, ordered_at);
        }
        let recommendation =
            recommend_rates(&rates, request.cart_total, &self.config.recommendation);

        tracing::info!(
            plan = plan_kind.label(),
            shipments = shipments.len(),
            rates = rates.len(),
            degraded,
            "checkout quote assembled"
        );

        Ok(CheckoutQuote {
            strategy: outcome.strategy,
            plan_kind,
            shipments,
            rates,
            recommendation,
            origin_list,
            degraded,
        })
    }

    fn adjustments(&self) -> &RateAdjustmentRules {
        &self.config.adjustments
    }

    /// Slowest promise among the shipments quoting this courier service.
    fn promise_for(
        &self,
        rate: &AggregatedRate,
        shipments: &[ShipmentQuote],
        ordered_at: NaiveDateTime,
    ) -> Option<DeliveryPromise> {
        shipments
            .iter()
            .filter_map(|shipment| {
                let quote = shipment.quotes.iter().find(|quote| {
                    aggregated_rate_id(&quote.courier, &quote.service) == rate.rate_id
                })?;
                Some(self.promises.build_promise(
                    &quote.courier,
                    &quote.service,
                    &quote.eta_label,
                    shipment.shipment.warehouse_id,
                    ordered_at,
                ))
            })
            .max_by_key(|promise| (promise.eta_max_days, promise.eta_min_days))
    }
}
