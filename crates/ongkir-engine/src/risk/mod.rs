//! Cash-on-delivery risk scoring and COD gating.

mod config;
mod gate;
mod history;
mod policy;
mod rules;

pub use config::{RiskConfig, RiskThresholds, RiskWeights};
pub use gate::{
    check_cod_eligibility, enforce_cod_policy, CodEligibility, CodEligibilityContext,
    GatewayDecision, PaymentGateway, COD_GATEWAY_ID,
};
pub use history::{CustomerHistory, PastOrder};
pub use policy::{CodPolicy, LOW_RISK_REASON};
pub use rules::{RiskSignal, SignalScores};

use serde::{Deserialize, Serialize};

use crate::clock::{self, Clock};

/// Checkout facts the scorer looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskContext {
    #[serde(default)]
    pub cart_total: u64,
    #[serde(default)]
    pub destination_district_code: String,
    /// Origin region codes of the quoted shipments.
    #[serde(default)]
    pub origin_list: Vec<String>,
    #[serde(default)]
    pub cancel_count: u32,
    #[serde(default)]
    pub rto_count: u32,
    #[serde(default)]
    pub completed_count: u32,
    #[serde(default)]
    pub address_line: String,
    #[serde(default)]
    pub destination_postcode: String,
    /// Local hour of the order; values outside 0-23 are clamped. The
    /// engine's clock supplies the hour when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_hour: Option<i32>,
}

impl RiskContext {
    pub fn with_history(mut self, history: CustomerHistory) -> Self {
        self.cancel_count = history.cancel_count;
        self.rto_count = history.rto_count;
        self.completed_count = history.completed_count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEvaluation {
    pub score: u8,
    /// Hour the order-time signal was scored against.
    pub order_hour: i32,
    pub policy: CodPolicy,
    pub signal_scores: SignalScores,
    pub reasons: Vec<String>,
}

/// Stateless scorer applying the configured weights and thresholds.
pub struct CodRiskEngine {
    config: RiskConfig,
    clock: Clock,
}

impl CodRiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            clock: clock::local_now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn evaluate(&self, context: &RiskContext) -> RiskEvaluation {
        let order_hour = context
            .order_hour
            .unwrap_or_else(|| clock::hour_of(self.clock));
        let signal_scores = rules::score_signals(context, order_hour, &self.config);
        let score = rules::blend(&signal_scores, &self.config.weights);
        let policy = policy::decide_policy(score, &self.config.thresholds);
        let reasons = policy::build_reasons(&signal_scores);

        tracing::info!(
            score,
            order_hour,
            policy = policy.label(),
            reasons = %reasons.join(","),
            "cod risk evaluated"
        );

        RiskEvaluation {
            score,
            order_hour,
            policy,
            signal_scores,
            reasons,
        }
    }

    /// Apply the policy to the offered gateways; a disabled engine leaves
    /// them untouched.
    pub fn enforce(
        &self,
        gateways: Vec<PaymentGateway>,
        evaluation: &RiskEvaluation,
    ) -> GatewayDecision {
        if !self.config.enabled {
            return GatewayDecision {
                gateways,
                notices: Vec::new(),
            };
        }
        enforce_cod_policy(gateways, evaluation.policy)
    }
}
