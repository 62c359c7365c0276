use std::time::Duration;

use crate::shipping::{
    BoxPreset, Dimensions, PipelineSettings, RateAdjustmentRules, RecommendationSettings,
    ShipmentStrategy, VolumetricDivisors,
};

/// Store-level shipping settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingConfig {
    pub provider: String,
    pub enabled_couriers: Vec<String>,
    pub strategy: ShipmentStrategy,
    pub cache_ttl: Duration,
    pub stale_max_age: Duration,
    pub request_timeout: Duration,
    pub flat_rate_backup: u64,
    pub flat_rate_eta_label: String,
    pub box_presets: Vec<BoxPreset>,
    pub volumetric_divisors: VolumetricDivisors,
    pub fallback_dimensions: Dimensions,
    pub adjustments: RateAdjustmentRules,
    pub recommendation: RecommendationSettings,
}

impl ShippingConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            cache_ttl: self.cache_ttl,
            stale_max_age: self.stale_max_age,
            call_timeout: self.request_timeout,
            flat_rate_price: self.flat_rate_backup,
            flat_rate_eta_label: self.flat_rate_eta_label.clone(),
        }
    }
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            provider: "rajaongkir".to_string(),
            enabled_couriers: vec!["jne".to_string(), "jnt".to_string(), "anteraja".to_string()],
            strategy: ShipmentStrategy::Balanced,
            cache_ttl: Duration::from_secs(900),
            stale_max_age: Duration::from_secs(720 * 60),
            request_timeout: Duration::from_secs(7),
            flat_rate_backup: 18_000,
            flat_rate_eta_label: "2-5 hari".to_string(),
            box_presets: BoxPreset::builtin(),
            volumetric_divisors: VolumetricDivisors::from([
                ("jne".to_string(), 6_000),
                ("jnt".to_string(), 6_000),
                ("anteraja".to_string(), 5_000),
                ("default".to_string(), 6_000),
            ]),
            fallback_dimensions: Dimensions::default(),
            adjustments: RateAdjustmentRules::default(),
            recommendation: RecommendationSettings::default(),
        }
    }
}
