//! Cart to shipping rates: plan origins, pack boxes, fetch and combine rates.

mod acquisition;
mod adjustments;
mod aggregator;
mod domain;
mod eta;
mod events;
mod packaging;
mod planner;
mod promise;
mod recommendation;
mod service;
mod store;

pub use acquisition::{
    CacheKey, LiveRateProvider, PipelineSettings, ProviderError, RateAcquisitionPipeline,
    RateCache, RateRequest, RateResolution, RateSource, StaleRateStore, StoreError,
};
pub use adjustments::RateAdjustmentRules;
pub use aggregator::{aggregate_rates, aggregated_rate_id};
pub use domain::{
    rate_slug, slugify, validate_cart, AggregatedRate, CartLine, Destination, InputError,
    OriginMap, OriginMapping, ProductId, RateQuote, Shipment, Warehouse, WarehouseId,
    MAX_CART_UNITS, MAX_DIMENSION_CM,
};
pub use eta::{max_eta_days, EtaRange};
pub use events::{FanOutRateEvents, RateEvent, RateEventKind, RateEventSink, TracingRateEvents};
pub use packaging::{
    optimize_packaging, volumetric_weight_gram, BoxPreset, Dimensions, Package, PackageBox,
    PackageItem, PackagingResult, VolumetricDivisors, DEFAULT_VOLUMETRIC_DIVISOR,
};
pub use planner::{
    plan_shipments, PlanCandidate, PlanKind, ShipmentPlans, ShipmentStrategy, UNAVAILABLE_SCORE,
};
pub use promise::{
    default_cutoff, DeliveryHistory, DeliveryPromise, DeliveryPromiseEngine, InMemoryCalendar,
    InMemoryCutoffs, InMemoryDeliveryHistory, OperationalCalendar, PromiseConfidence, SlaStats,
    WarehouseCutoffs, MIN_SLA_SAMPLES,
};
pub use recommendation::{
    recommend_rates, RateRecommendation, RateScore, RecommendationSettings,
    RecommendationWeights, BADGE_BEST_VALUE, BADGE_CHEAPEST, BADGE_FASTEST,
};
pub use service::{
    CheckoutQuote, PlanOutcome, QuoteError, QuoteRequest, ShipmentQuote, ShippingQuoteService,
};
pub use store::{InMemoryRateCache, InMemoryStaleStore, SimulatedRateProvider};
