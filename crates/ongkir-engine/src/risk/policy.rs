use serde::{Deserialize, Serialize};

use super::config::RiskThresholds;
use super::rules::SignalScores;

pub const LOW_RISK_REASON: &str = "low_risk_profile";

/// What the checkout does with the COD payment option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodPolicy {
    Normal,
    AllowWithConditions,
    BlockCod,
}

impl CodPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            CodPolicy::Normal => "normal",
            CodPolicy::AllowWithConditions => "allow_with_conditions",
            CodPolicy::BlockCod => "block_cod",
        }
    }

    pub fn summary(self) -> String {
        match self {
            CodPolicy::Normal => "cod available".to_string(),
            CodPolicy::AllowWithConditions => "cod available after extra verification".to_string(),
            CodPolicy::BlockCod => "cod blocked for this risk profile".to_string(),
        }
    }
}

pub(crate) fn decide_policy(score: u8, thresholds: &RiskThresholds) -> CodPolicy {
    if score >= thresholds.block {
        return CodPolicy::BlockCod;
    }
    if score >= thresholds.review {
        return CodPolicy::AllowWithConditions;
    }
    CodPolicy::Normal
}

/// One reason per elevated signal, in signal order; never empty.
pub(crate) fn build_reasons(scores: &SignalScores) -> Vec<String> {
    let reasons: Vec<String> = scores
        .iter()
        .filter_map(|(signal, score)| match score {
            70.. => Some(format!("{}_high_risk", signal.label())),
            45..=69 => Some(format!("{}_medium_risk", signal.label())),
            _ => None,
        })
        .collect();

    if reasons.is_empty() {
        vec![LOW_RISK_REASON.to_string()]
    } else {
        reasons
    }
}
