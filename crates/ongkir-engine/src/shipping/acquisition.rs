use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use super::domain::{Destination, RateQuote, Shipment};
use super::events::{RateEvent, RateEventKind, RateEventSink};

/// Key under which a rate lookup is cached and remembered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(pub String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything a live provider needs to price one shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRequest {
    pub provider: String,
    pub origin_region_code: String,
    pub destination: Destination,
    pub couriers: Vec<String>,
    pub weight_gram: u64,
    #[serde(default)]
    pub chargeable_weight_by_courier: BTreeMap<String, u64>,
}

impl RateRequest {
    pub fn for_shipment(
        provider: &str,
        shipment: &Shipment,
        destination: &Destination,
        couriers: &[String],
    ) -> Self {
        let chargeable_weight_by_courier = couriers
            .iter()
            .map(|courier| (courier.clone(), shipment.chargeable_weight_for(courier)))
            .collect();

        Self {
            provider: provider.to_string(),
            origin_region_code: shipment.origin_region_code.clone(),
            destination: destination.clone(),
            couriers: couriers.to_vec(),
            weight_gram: shipment.weight_gram,
            chargeable_weight_by_courier,
        }
    }

    /// Weight billed for `courier`: its chargeable total when known,
    /// otherwise the shipment weight. Never below one gram.
    pub fn billable_weight_for(&self, courier: &str) -> u64 {
        self.chargeable_weight_by_courier
            .get(courier)
            .copied()
            .unwrap_or(self.weight_gram)
            .max(1)
    }

    pub fn cache_key(&self) -> CacheKey {
        let mut couriers = self.couriers.clone();
        couriers.sort();
        couriers.dedup();

        let signature = self
            .chargeable_weight_by_courier
            .iter()
            .map(|(courier, weight)| format!("{courier}:{weight}"))
            .collect::<Vec<_>>()
            .join(";");

        CacheKey(format!(
            "rate:{}|{}|{}|{}|{}|{}|{}|{}",
            self.provider,
            self.origin_region_code,
            self.destination.district_code,
            self.destination.city,
            self.destination.postcode,
            self.weight_gram,
            signature,
            couriers.join(",")
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider transport failed: {0}")]
    Transport(String),
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

/// Short-lived cache of successful lookups.
#[async_trait]
pub trait RateCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<RateQuote>>, StoreError>;
    async fn put(&self, key: &CacheKey, quotes: &[RateQuote], ttl: Duration)
        -> Result<(), StoreError>;
}

/// Longer-lived record of the last successful lookup per key.
#[async_trait]
pub trait StaleRateStore: Send + Sync {
    async fn latest(
        &self,
        key: &CacheKey,
        max_age: Duration,
    ) -> Result<Option<Vec<RateQuote>>, StoreError>;
    async fn record(&self, key: &CacheKey, quotes: &[RateQuote]) -> Result<(), StoreError>;
}

/// Upstream rate source, such as a courier aggregator API.
#[async_trait]
pub trait LiveRateProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self, request: &RateRequest) -> Result<Vec<RateQuote>, ProviderError>;
}

/// Which rung of the ladder served a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Cache,
    Live,
    Stale,
    FlatRateBackup,
}

impl RateSource {
    pub const fn label(self) -> &'static str {
        match self {
            RateSource::Cache => "cache",
            RateSource::Live => "live",
            RateSource::Stale => "stale",
            RateSource::FlatRateBackup => "flat_rate_backup",
        }
    }

    pub const fn is_degraded(self) -> bool {
        matches!(self, RateSource::Stale | RateSource::FlatRateBackup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateResolution {
    pub quotes: Vec<RateQuote>,
    pub source: RateSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub cache_ttl: Duration,
    pub stale_max_age: Duration,
    pub call_timeout: Duration,
    pub flat_rate_price: u64,
    pub flat_rate_eta_label: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(900),
            stale_max_age: Duration::from_secs(720 * 60),
            call_timeout: Duration::from_secs(7),
            flat_rate_price: 18_000,
            flat_rate_eta_label: "2-5 hari".to_string(),
        }
    }
}

/// Resolves rates for one shipment through cache, live provider, stale store
/// and finally a flat-rate backup. Always yields at least one quote.
#[derive(Clone)]
pub struct RateAcquisitionPipeline {
    cache: Arc<dyn RateCache>,
    stale: Arc<dyn StaleRateStore>,
    provider: Arc<dyn LiveRateProvider>,
    events: Arc<dyn RateEventSink>,
    settings: PipelineSettings,
}

impl RateAcquisitionPipeline {
    pub fn new(
        cache: Arc<dyn RateCache>,
        stale: Arc<dyn StaleRateStore>,
        provider: Arc<dyn LiveRateProvider>,
        events: Arc<dyn RateEventSink>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            cache,
            stale,
            provider,
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn fetch_rates(&self, request: &RateRequest, key: &CacheKey) -> RateResolution {
        match self.bounded(self.cache.get(key)).await {
            Ok(Some(quotes)) if !quotes.is_empty() => {
                self.emit(RateEventKind::CacheHit, key, None);
                return RateResolution {
                    quotes,
                    source: RateSource::Cache,
                };
            }
            Ok(_) => self.emit(RateEventKind::CacheMiss, key, None),
            Err(err) => self.emit(RateEventKind::StoreFailure, key, Some(err.to_string())),
        }

        match timeout(self.settings.call_timeout, self.provider.fetch(request)).await {
            Ok(Ok(quotes)) if !quotes.is_empty() => {
                self.emit(RateEventKind::LiveSuccess, key, None);
                self.remember(key, &quotes).await;
                return RateResolution {
                    quotes,
                    source: RateSource::Live,
                };
            }
            Ok(Ok(_)) => self.emit(RateEventKind::LiveEmpty, key, None),
            Ok(Err(err)) => self.emit(RateEventKind::LiveError, key, Some(err.to_string())),
            Err(_) => self.emit(RateEventKind::LiveTimeout, key, None),
        }

        match self
            .bounded(self.stale.latest(key, self.settings.stale_max_age))
            .await
        {
            Ok(Some(quotes)) if !quotes.is_empty() => {
                self.emit(RateEventKind::StaleHit, key, None);
                return RateResolution {
                    quotes,
                    source: RateSource::Stale,
                };
            }
            Ok(_) => self.emit(RateEventKind::StaleMiss, key, None),
            Err(err) => self.emit(RateEventKind::StoreFailure, key, Some(err.to_string())),
        }

        self.emit(RateEventKind::FlatRateBackup, key, None);
        RateResolution {
            quotes: vec![self.flat_rate_quote()],
            source: RateSource::FlatRateBackup,
        }
    }

    pub fn flat_rate_quote(&self) -> RateQuote {
        RateQuote {
            courier: "backup".to_string(),
            service: "flat-rate".to_string(),
            price: self.settings.flat_rate_price,
            eta_label: self.settings.flat_rate_eta_label.clone(),
        }
    }

    async fn remember(&self, key: &CacheKey, quotes: &[RateQuote]) {
        if let Err(err) = self
            .bounded(self.cache.put(key, quotes, self.settings.cache_ttl))
            .await
        {
            self.emit(RateEventKind::StoreFailure, key, Some(err.to_string()));
        }
        if let Err(err) = self.bounded(self.stale.record(key, quotes)).await {
            self.emit(RateEventKind::StoreFailure, key, Some(err.to_string()));
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        timeout(self.settings.call_timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    fn emit(&self, kind: RateEventKind, key: &CacheKey, detail: Option<String>) {
        self.events.record(&RateEvent {
            kind,
            provider: self.provider.name().to_string(),
            cache_key: key.clone(),
            detail,
        });
    }
}
