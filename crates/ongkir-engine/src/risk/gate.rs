use serde::{Deserialize, Serialize};

use super::policy::CodPolicy;

pub const COD_GATEWAY_ID: &str = "cod";
pub const MIN_COD_ORDER_TOTAL: u64 = 75_000;
pub const REMOTE_COD_CITY: &str = "Kab. Kepulauan Mentawai";
pub const FRAGILE_TAG: &str = "fragile";
pub const VERIFICATION_SUFFIX: &str = " - Perlu verifikasi tambahan";

/// Hard eligibility check on the checkout before any risk scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodEligibilityContext {
    #[serde(default)]
    pub destination_city: String,
    #[serde(default)]
    pub cart_total: u64,
    #[serde(default)]
    pub product_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodEligibility {
    pub allow_cod: bool,
    pub reason: String,
}

/// Rules run in order and a later match overrides an earlier one.
pub fn check_cod_eligibility(context: &CodEligibilityContext) -> CodEligibility {
    let mut eligibility = CodEligibility {
        allow_cod: true,
        reason: "default_allow".to_string(),
    };

    if context.destination_city == REMOTE_COD_CITY {
        eligibility = denied("deny_remote_city");
    }
    if context.cart_total < MIN_COD_ORDER_TOTAL {
        eligibility = denied("min_order_not_met");
    }
    if context.product_tags.iter().any(|tag| tag == FRAGILE_TAG) {
        eligibility = denied("fragile_product_excluded");
    }

    tracing::info!(
        allow_cod = eligibility.allow_cod,
        reason = %eligibility.reason,
        "cod eligibility evaluated"
    );
    eligibility
}

fn denied(reason: &str) -> CodEligibility {
    CodEligibility {
        allow_cod: false,
        reason: reason.to_string(),
    }
}

/// A payment option offered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentGateway {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDecision {
    pub gateways: Vec<PaymentGateway>,
    pub notices: Vec<String>,
}

/// Remove or relabel the COD gateway according to the risk policy.
pub fn enforce_cod_policy(gateways: Vec<PaymentGateway>, policy: CodPolicy) -> GatewayDecision {
    if !gateways.iter().any(|gateway| gateway.id == COD_GATEWAY_ID) {
        return GatewayDecision {
            gateways,
            notices: Vec::new(),
        };
    }

    match policy {
        CodPolicy::Normal => GatewayDecision {
            gateways,
            notices: Vec::new(),
        },
        CodPolicy::BlockCod => GatewayDecision {
            gateways: gateways
                .into_iter()
                .filter(|gateway| gateway.id != COD_GATEWAY_ID)
                .collect(),
            notices: vec!["COD tidak tersedia untuk profil risiko order ini.".to_string()],
        },
        CodPolicy::AllowWithConditions => GatewayDecision {
            gateways: gateways
                .into_iter()
                .map(|mut gateway| {
                    if gateway.id == COD_GATEWAY_ID {
                        gateway.title.push_str(VERIFICATION_SUFFIX);
                    }
                    gateway
                })
                .collect(),
            notices: vec![
                "COD diizinkan dengan syarat tambahan: verifikasi nomor telepon saat konfirmasi."
                    .to_string(),
            ],
        },
    }
}
