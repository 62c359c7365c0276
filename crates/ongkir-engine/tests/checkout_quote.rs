use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ongkir_engine::catalog::InMemoryOriginCatalog;
use ongkir_engine::config::ShippingConfig;
use ongkir_engine::shipping::{
    aggregate_rates, CartLine, DeliveryPromiseEngine, Destination, InMemoryCalendar,
    InMemoryCutoffs, InMemoryDeliveryHistory, InMemoryRateCache, InMemoryStaleStore, InputError,
    OriginMapping, PlanKind, PromiseConfidence, QuoteError, QuoteRequest,
    RateAcquisitionPipeline, RateQuote, RateSource, ShippingQuoteService, SimulatedRateProvider,
    TracingRateEvents, Warehouse,
};

fn catalog() -> InMemoryOriginCatalog {
    let warehouse = |id: u64, name: &str, region: &str| Warehouse {
        id,
        name: name.to_string(),
        region_code: region.to_string(),
        priority: id as u32,
    };
    let origin = |warehouse_id: u64, stock_qty: u32| OriginMapping {
        warehouse_id,
        stock_qty,
        priority: 1,
        is_fallback: false,
    };

    InMemoryOriginCatalog::new()
        .with_warehouse(warehouse(1, "Gudang Jakarta", "JKT"))
        .with_warehouse(warehouse(2, "Gudang Bandung", "BDG"))
        .with_origin(100, origin(1, 10))
        .and_then(|catalog| catalog.with_origin(200, origin(2, 5)))
        .and_then(|catalog| catalog.with_origin(300, origin(1, 40)))
        .expect("catalog builds")
}

fn service() -> ShippingQuoteService<InMemoryOriginCatalog> {
    ongkir_engine::telemetry::init_for_tests();
    let config = ShippingConfig::default();
    let pipeline = RateAcquisitionPipeline::new(
        Arc::new(InMemoryRateCache::new()),
        Arc::new(InMemoryStaleStore::new()),
        Arc::new(SimulatedRateProvider::default()),
        Arc::new(TracingRateEvents),
        config.pipeline_settings(),
    );
    ShippingQuoteService::new(Arc::new(catalog()), pipeline, config)
}

fn bandung(is_remote_area: bool) -> Destination {
    Destination {
        district_code: "3273010".to_string(),
        city: "Bandung".to_string(),
        postcode: "40115".to_string(),
        is_remote_area,
    }
}

fn request(lines: Vec<CartLine>, destination: Destination) -> QuoteRequest {
    QuoteRequest {
        lines,
        destination,
        cart_total: 250_000,
        strategy: None,
    }
}

#[tokio::test]
async fn split_cart_sums_rates_across_shipments() {
    let quote = service()
        .quote(request(
            vec![CartLine::new(100, 2, 500), CartLine::new(200, 1, 1200)],
            bandung(false),
        ))
        .await
        .expect("cart quotes");

    assert_eq!(quote.plan_kind, PlanKind::SplitShipment);
    assert_eq!(quote.shipments.len(), 2);
    assert_eq!(quote.origin_list, vec!["JKT", "BDG"]);
    assert!(!quote.degraded);
    assert!(quote
        .shipments
        .iter()
        .all(|shipment| shipment.rate_source == RateSource::Live));

    // Jakarta bills 1000 g (16500), Bandung bills 1200 g (19000).
    let jne = quote
        .rates
        .iter()
        .find(|rate| rate.courier == "jne")
        .expect("jne quoted");
    assert_eq!(jne.rate_id, "col:jne-reg");
    assert_eq!(jne.price, 35_500);
    assert_eq!(jne.shipment_count, 2);
    assert_eq!(jne.eta_label, "3 hari");
    assert!(jne.override_applied.is_none());

    let recommended = quote
        .recommendation
        .recommended_rate_id
        .as_deref()
        .expect("a rate is recommended");
    assert!(quote.rates.iter().any(|rate| rate.rate_id == recommended));
    assert_eq!(quote.cheapest().map(|rate| rate.price), Some(35_500));
}

#[tokio::test]
async fn remote_destination_adds_flat_surcharge() {
    let service = service();
    let lines = vec![CartLine::new(100, 2, 500)];

    let regular = service
        .quote(request(lines.clone(), bandung(false)))
        .await
        .expect("regular quote");
    let remote = service
        .quote(request(lines, bandung(true)))
        .await
        .expect("remote quote");

    assert_eq!(regular.plan_kind, PlanKind::SingleOrigin);
    for (before, after) in regular.rates.iter().zip(&remote.rates) {
        assert_eq!(after.price, before.price + 7_000);
        assert_eq!(after.surcharge_applied.as_deref(), Some("remote_area_flat_7000"));
    }
}

#[tokio::test]
async fn district_override_scales_prices() {
    let quote = service()
        .quote(request(
            vec![CartLine::new(100, 2, 500)],
            Destination {
                district_code: "3173040".to_string(),
                ..Destination::default()
            },
        ))
        .await
        .expect("cart quotes");

    for rate in &quote.rates {
        assert_eq!(rate.price, 18_975);
        assert_eq!(rate.override_applied.as_deref(), Some("district_multiplier_1_15"));
    }
}

#[tokio::test]
async fn overweight_shipment_degrades_to_flat_rate() {
    // 35 kg exceeds what the simulated provider will price.
    let quote = service()
        .quote(request(vec![CartLine::new(300, 35, 1000)], bandung(false)))
        .await
        .expect("cart quotes");

    assert!(quote.degraded);
    assert_eq!(quote.shipments[0].rate_source, RateSource::FlatRateBackup);
    assert_eq!(quote.rates.len(), 1);
    assert_eq!(quote.rates[0].courier, "backup");
    assert_eq!(quote.rates[0].price, 18_000);
}

#[tokio::test]
async fn unfulfillable_cart_is_rejected() {
    let err = service()
        .quote(request(vec![CartLine::new(200, 6, 100)], bandung(false)))
        .await
        .expect_err("no plan covers six units");

    assert!(matches!(err, QuoteError::NoFulfillmentPlan));
}

#[tokio::test]
async fn invalid_lines_are_rejected_before_planning() {
    let err = service()
        .quote(request(vec![CartLine::new(100, 1, 0)], bandung(false)))
        .await
        .expect_err("zero weight is invalid");

    assert!(matches!(err, QuoteError::Input(_)));
}

#[tokio::test]
async fn repeated_product_lines_are_rejected() {
    let err = service()
        .quote(request(
            vec![CartLine::new(100, 1, 500), CartLine::new(100, 2, 500)],
            bandung(false),
        ))
        .await
        .expect_err("product 100 listed twice");

    assert!(matches!(
        err,
        QuoteError::Input(InputError::DuplicateProduct { product_id: 100 })
    ));
}

fn half_past_two() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .and_then(|date| date.and_hms_opt(14, 30, 0))
        .expect("valid timestamp")
}

#[tokio::test]
async fn split_rates_promise_the_slowest_shipment() {
    // Bandung stops picking at 14:00; Jakarta keeps the 15:00 default.
    let cutoffs = InMemoryCutoffs::new()
        .with_cutoff(2, NaiveTime::from_hms_opt(14, 0, 0).expect("valid time"));
    let promises = DeliveryPromiseEngine::new(
        Arc::new(cutoffs),
        Arc::new(InMemoryCalendar::new()),
        Arc::new(InMemoryDeliveryHistory::new()),
    );
    let service = service().with_promises(promises).with_clock(half_past_two);

    let split = service
        .quote(request(
            vec![CartLine::new(100, 2, 500), CartLine::new(200, 1, 1200)],
            bandung(false),
        ))
        .await
        .expect("split cart quotes");
    let single = service
        .quote(request(vec![CartLine::new(100, 2, 500)], bandung(false)))
        .await
        .expect("jakarta cart quotes");

    assert_eq!(split.plan_kind, PlanKind::SplitShipment);
    for rate in &split.rates {
        let promise = rate.promise.as_ref().expect("promise attached");
        assert_eq!(promise.eta_label, "3-4 hari");
        assert_eq!(promise.baseline_eta_label, "2-3 hari");
        assert_eq!(promise.confidence, PromiseConfidence::Low);
    }
    for rate in &single.rates {
        let promise = rate.promise.as_ref().expect("promise attached");
        assert_eq!(promise.eta_label, "2-3 hari");
        assert_eq!(promise.reasons.len(), 1);
    }
}

#[test]
fn aggregation_ignores_shipment_order() {
    let quote = |courier: &str, service: &str, price: u64, eta: &str| RateQuote {
        courier: courier.to_string(),
        service: service.to_string(),
        price,
        eta_label: eta.to_string(),
    };
    let jakarta = vec![
        quote("jne", "REG", 16_500, "2-3 hari"),
        quote("jnt", "EZ", 15_000, "1-2 hari"),
    ];
    let bandung = vec![
        quote("jnt", "EZ", 19_000, "3-4 hari"),
        quote("jne", "REG", 19_000, "2 hari"),
    ];

    let mut forward = aggregate_rates(&[jakarta.clone(), bandung.clone()]);
    let mut reverse = aggregate_rates(&[bandung, jakarta]);
    forward.sort_by(|a, b| a.rate_id.cmp(&b.rate_id));
    reverse.sort_by(|a, b| a.rate_id.cmp(&b.rate_id));

    assert_eq!(forward, reverse);
    assert_eq!(forward[0].price, 35_500);
    assert_eq!(forward[1].eta_days_max, 4);
}
