use crate::infra::{build_engine_state, load_catalog, CatalogPaths};
use clap::Args;
use ongkir_engine::config::AppConfig;
use ongkir_engine::error::AppError;
use ongkir_engine::risk::{
    check_cod_eligibility, CodEligibilityContext, CodRiskEngine, PaymentGateway, RiskContext,
    COD_GATEWAY_ID,
};
use ongkir_engine::shipping::{
    CartLine, CheckoutQuote, Destination, QuoteRequest, ShipmentStrategy, TracingRateEvents,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Warehouse CSV export; the built-in catalog is used when omitted
    #[arg(long, requires = "origins_csv")]
    pub(crate) warehouses_csv: Option<PathBuf>,
    /// Product origin CSV export
    #[arg(long, requires = "warehouses_csv")]
    pub(crate) origins_csv: Option<PathBuf>,
    /// Destination district code
    #[arg(long, default_value = "3173040")]
    pub(crate) district: String,
    /// Destination city
    #[arg(long, default_value = "Jakarta Barat")]
    pub(crate) city: String,
    /// Mark the destination as a remote area
    #[arg(long)]
    pub(crate) remote: bool,
    /// Cart subtotal in rupiah
    #[arg(long, default_value_t = 425_000)]
    pub(crate) cart_total: u64,
    /// Plan selection strategy (balanced or fewest_shipments)
    #[arg(long)]
    pub(crate) strategy: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct RiskArgs {
    /// Cart subtotal in rupiah
    #[arg(long)]
    pub(crate) cart_total: u64,
    /// Destination district code
    #[arg(long, default_value = "")]
    pub(crate) district: String,
    /// Destination city, used for the COD eligibility check
    #[arg(long, default_value = "")]
    pub(crate) city: String,
    /// Comma-separated origin region codes
    #[arg(long, value_delimiter = ',')]
    pub(crate) origins: Vec<String>,
    #[arg(long, default_value_t = 0)]
    pub(crate) cancel_count: u32,
    #[arg(long, default_value_t = 0)]
    pub(crate) rto_count: u32,
    #[arg(long, default_value_t = 0)]
    pub(crate) completed_count: u32,
    /// Shipping address line
    #[arg(long, default_value = "")]
    pub(crate) address: String,
    #[arg(long, default_value = "")]
    pub(crate) postcode: String,
    /// Order hour (0-23); defaults to the current local hour
    #[arg(long)]
    pub(crate) hour: Option<i32>,
    /// Comma-separated product tags
    #[arg(long, value_delimiter = ',')]
    pub(crate) tags: Vec<String>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        warehouses_csv,
        origins_csv,
        district,
        city,
        remote,
        cart_total,
        strategy,
    } = args;

    let config = AppConfig::load()?;
    let catalog = load_catalog(&CatalogPaths {
        warehouses: warehouses_csv,
        origins: origins_csv,
    })?;
    let engine = build_engine_state(&config, catalog, Arc::new(TracingRateEvents));

    let lines = demo_cart();
    let strategy = strategy.as_deref().map(ShipmentStrategy::from_setting);

    println!("Ongkir checkout demo");
    println!(
        "Destination: {} ({}){}",
        city,
        district,
        if remote { " [remote]" } else { "" }
    );
    println!("Cart total: Rp{}", cart_total);

    let outcome = engine.quotes.plan(&lines, strategy)?;
    println!("\nShipment plans ({})", outcome.strategy.label());
    for (label, plan) in [
        ("single_origin", &outcome.plans.single_origin),
        ("split_shipment", &outcome.plans.split_shipment),
    ] {
        if plan.is_available {
            println!(
                "- {}: {} shipment(s), score {}",
                label,
                plan.shipment_count(),
                plan.score
            );
        } else {
            println!("- {}: unavailable", label);
        }
    }

    let quote = match engine
        .quotes
        .quote(QuoteRequest {
            lines,
            destination: Destination {
                district_code: district.clone(),
                city: city.clone(),
                postcode: String::new(),
                is_remote_area: remote,
            },
            cart_total,
            strategy,
        })
        .await
    {
        Ok(quote) => quote,
        Err(err) => {
            println!("\nQuote unavailable: {}", err);
            return Ok(());
        }
    };

    render_quote(&quote);

    let risk = CodRiskEngine::new(config.risk.clone());
    if risk.is_enabled() {
        let evaluation = risk.evaluate(&RiskContext {
            cart_total,
            destination_district_code: district,
            origin_list: quote.origin_list.clone(),
            address_line: "Jl. Kebon Jeruk Raya No. 27, RT 03/RW 05".to_string(),
            destination_postcode: "11530".to_string(),
            ..RiskContext::default()
        });
        println!(
            "\nCOD risk: score {} -> {} ({})",
            evaluation.score,
            evaluation.policy.label(),
            evaluation.policy.summary()
        );
        println!("Reasons: {}", evaluation.reasons.join(", "));
    } else {
        println!("\nCOD risk scoring disabled");
    }

    Ok(())
}

fn demo_cart() -> Vec<CartLine> {
    vec![
        CartLine::new(101, 2, 250).with_dimensions(30, 20, 3),
        CartLine::new(102, 2, 900).with_dimensions(32, 22, 12),
        CartLine::new(103, 1, 2800).with_dimensions(35, 30, 30),
    ]
}

fn render_quote(quote: &CheckoutQuote) {
    println!("\nSelected plan: {}", quote.plan_kind.label());
    for shipment in &quote.shipments {
        let items: Vec<String> = shipment
            .shipment
            .items
            .iter()
            .map(|item| format!("#{} x{}", item.product_id, item.quantity))
            .collect();
        let boxes = shipment
            .shipment
            .packaging
            .as_ref()
            .map(|packaging| packaging.packages.len())
            .unwrap_or_default();
        println!(
            "- {} [{}]: {} | {} g actual | {} box(es) | rates via {}",
            shipment.shipment.warehouse_name,
            shipment.shipment.origin_region_code,
            items.join(", "),
            shipment.shipment.weight_gram,
            boxes,
            shipment.rate_source.label()
        );
    }

    if quote.degraded {
        println!("Rates are degraded; some shipments used stale or backup prices.");
    }

    if quote.rates.is_empty() {
        println!("\nNo courier covers every shipment.");
        return;
    }

    println!("\nCombined rates");
    for rate in &quote.rates {
        let mut notes = Vec::new();
        if let Some(label) = &rate.override_applied {
            notes.push(label.as_str());
        }
        if let Some(label) = &rate.surcharge_applied {
            notes.push(label.as_str());
        }
        let badges = quote
            .recommendation
            .badges
            .get(&rate.rate_id)
            .map(|badges| badges.join(", "))
            .unwrap_or_default();
        let promise = rate
            .promise
            .as_ref()
            .map(|promise| {
                format!(
                    " | promise {} ({})",
                    promise.eta_label,
                    promise.confidence.label()
                )
            })
            .unwrap_or_default();
        println!(
            "- {} {}: Rp{} | {}{} | {} shipment(s){}{}",
            rate.courier,
            rate.service,
            rate.price,
            rate.eta_label,
            promise,
            rate.shipment_count,
            if notes.is_empty() {
                String::new()
            } else {
                format!(" | {}", notes.join(", "))
            },
            if badges.is_empty() {
                String::new()
            } else {
                format!(" | {}", badges)
            }
        );
    }

    if let Some(rate_id) = &quote.recommendation.recommended_rate_id {
        println!("Recommended: {}", rate_id);
    }
}

pub(crate) fn run_risk(args: RiskArgs) -> Result<(), AppError> {
    let RiskArgs {
        cart_total,
        district,
        city,
        origins,
        cancel_count,
        rto_count,
        completed_count,
        address,
        postcode,
        hour,
        tags,
    } = args;

    let config = AppConfig::load()?;
    let engine = CodRiskEngine::new(config.risk);

    let eligibility = check_cod_eligibility(&CodEligibilityContext {
        destination_city: city,
        cart_total,
        product_tags: tags,
    });
    println!(
        "COD eligibility: {} ({})",
        if eligibility.allow_cod { "allowed" } else { "denied" },
        eligibility.reason
    );

    if !engine.is_enabled() {
        println!("COD risk scoring disabled");
        return Ok(());
    }

    let evaluation = engine.evaluate(&RiskContext {
        cart_total,
        destination_district_code: district,
        origin_list: origins,
        cancel_count,
        rto_count,
        completed_count,
        address_line: address,
        destination_postcode: postcode,
        order_hour: hour,
    });

    println!(
        "Risk score: {} -> {} ({}) at hour {}",
        evaluation.score,
        evaluation.policy.label(),
        evaluation.policy.summary(),
        evaluation.order_hour
    );
    println!("Signals");
    for (signal, score) in evaluation.signal_scores.iter() {
        println!("- {}: {}", signal.label(), score);
    }
    println!("Reasons: {}", evaluation.reasons.join(", "));

    if eligibility.allow_cod {
        let decision = engine.enforce(
            vec![
                PaymentGateway {
                    id: "bacs".to_string(),
                    title: "Transfer Bank".to_string(),
                },
                PaymentGateway {
                    id: COD_GATEWAY_ID.to_string(),
                    title: "Bayar di Tempat".to_string(),
                },
            ],
            &evaluation,
        );
        let titles: Vec<&str> = decision
            .gateways
            .iter()
            .map(|gateway| gateway.title.as_str())
            .collect();
        println!("Gateways offered: {}", titles.join(" | "));
        for notice in &decision.notices {
            println!("Notice: {}", notice);
        }
    }

    Ok(())
}
