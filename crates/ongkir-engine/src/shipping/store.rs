use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::acquisition::{
    CacheKey, LiveRateProvider, ProviderError, RateCache, RateRequest, StaleRateStore, StoreError,
};
use super::domain::RateQuote;

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("store mutex poisoned".to_string())
}

/// Process-local TTL cache. Expired entries are dropped on read and swept on
/// every write.
#[derive(Default)]
pub struct InMemoryRateCache {
    entries: Mutex<HashMap<CacheKey, (Instant, Vec<RateQuote>)>>,
}

impl InMemoryRateCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateCache for InMemoryRateCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<RateQuote>>, StoreError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        match entries.get(key) {
            Some((expires_at, quotes)) if *expires_at > Instant::now() => Ok(Some(quotes.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &CacheKey,
        quotes: &[RateQuote],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| StoreError::Unavailable(format!("cache ttl {ttl:?} out of range")))?;
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.retain(|_, (entry_expires_at, _)| *entry_expires_at > now);
        entries.insert(key.clone(), (expires_at, quotes.to_vec()));
        Ok(())
    }
}

/// Process-local record of the last successful lookup per key.
#[derive(Default)]
pub struct InMemoryStaleStore {
    entries: Mutex<HashMap<CacheKey, (DateTime<Utc>, Vec<RateQuote>)>>,
}

impl InMemoryStaleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record quotes as fetched at `fetched_at`; used to seed the store.
    pub fn record_at(
        &self,
        key: &CacheKey,
        quotes: &[RateQuote],
        fetched_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.insert(key.clone(), (fetched_at, quotes.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl StaleRateStore for InMemoryStaleStore {
    async fn latest(
        &self,
        key: &CacheKey,
        max_age: Duration,
    ) -> Result<Option<Vec<RateQuote>>, StoreError> {
        let entries = self.entries.lock().map_err(poisoned)?;
        let Some((fetched_at, quotes)) = entries.get(key) else {
            return Ok(None);
        };

        let max_age = chrono::Duration::from_std(max_age)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        if Utc::now().signed_duration_since(*fetched_at) <= max_age {
            Ok(Some(quotes.clone()))
        } else {
            Ok(None)
        }
    }

    async fn record(&self, key: &CacheKey, quotes: &[RateQuote]) -> Result<(), StoreError> {
        self.record_at(key, quotes, Utc::now())
    }
}

/// Offline provider pricing by weight band, for demos and local runs.
#[derive(Debug, Clone)]
pub struct SimulatedRateProvider {
    name: String,
}

impl SimulatedRateProvider {
    pub const MAX_WEIGHT_GRAM: u64 = 30_000;
    pub const BASE_PRICE: u64 = 14_000;
    pub const PRICE_PER_KG: u64 = 2_500;

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn price_for(weight_gram: u64) -> u64 {
        Self::BASE_PRICE + weight_gram.div_ceil(1_000) * Self::PRICE_PER_KG
    }
}

impl Default for SimulatedRateProvider {
    fn default() -> Self {
        Self::new("simulated")
    }
}

#[async_trait]
impl LiveRateProvider for SimulatedRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, request: &RateRequest) -> Result<Vec<RateQuote>, ProviderError> {
        if request.weight_gram > Self::MAX_WEIGHT_GRAM {
            return Ok(Vec::new());
        }

        Ok(request
            .couriers
            .iter()
            .map(|courier| RateQuote {
                courier: courier.clone(),
                service: "REG".to_string(),
                price: Self::price_for(request.billable_weight_for(courier)),
                eta_label: "2-3 hari".to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipping::domain::Destination;
    use std::collections::BTreeMap;

    fn quote() -> Vec<RateQuote> {
        vec![RateQuote {
            courier: "jne".to_string(),
            service: "REG".to_string(),
            price: 19_000,
            eta_label: "2-3 hari".to_string(),
        }]
    }

    #[tokio::test]
    async fn cache_entries_expire_after_ttl() {
        let cache = InMemoryRateCache::new();
        let key = CacheKey("k".to_string());

        cache.put(&key, &quote(), Duration::ZERO).await.expect("put");
        assert_eq!(cache.get(&key).await.expect("get"), None);

        cache.put(&key, &quote(), Duration::from_secs(60)).await.expect("put");
        assert_eq!(cache.get(&key).await.expect("get"), Some(quote()));
    }

    #[tokio::test]
    async fn writes_sweep_expired_entries() {
        let cache = InMemoryRateCache::new();
        let expired = CacheKey("expired".to_string());
        cache.put(&expired, &quote(), Duration::ZERO).await.expect("put");

        cache
            .put(&CacheKey("fresh".to_string()), &quote(), Duration::from_secs(60))
            .await
            .expect("put");

        let entries = cache.entries.lock().expect("cache lock");
        assert_eq!(entries.len(), 1);
        assert!(!entries.contains_key(&expired));
    }

    #[tokio::test]
    async fn unrepresentable_ttl_is_a_store_error() {
        let cache = InMemoryRateCache::new();
        let result = cache
            .put(&CacheKey("k".to_string()), &quote(), Duration::MAX)
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn stale_store_respects_max_age() {
        let store = InMemoryStaleStore::new();
        let key = CacheKey("k".to_string());
        store
            .record_at(&key, &quote(), Utc::now() - chrono::Duration::hours(2))
            .expect("seed");

        let fresh_enough = store
            .latest(&key, Duration::from_secs(3 * 3600))
            .await
            .expect("latest");
        assert_eq!(fresh_enough, Some(quote()));

        let too_old = store
            .latest(&key, Duration::from_secs(3600))
            .await
            .expect("latest");
        assert_eq!(too_old, None);
    }

    #[tokio::test]
    async fn simulated_provider_prices_by_chargeable_weight() {
        let provider = SimulatedRateProvider::default();
        let request = RateRequest {
            provider: "simulated".to_string(),
            origin_region_code: "JKT".to_string(),
            destination: Destination::default(),
            couriers: vec!["jne".to_string(), "anteraja".to_string()],
            weight_gram: 1_200,
            chargeable_weight_by_courier: BTreeMap::from([("anteraja".to_string(), 2_400)]),
        };

        let quotes = provider.fetch(&request).await.expect("quotes");
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].price, 14_000 + 2 * 2_500);
        assert_eq!(quotes[1].price, 14_000 + 3 * 2_500);

        let heavy = RateRequest {
            weight_gram: 30_001,
            ..request
        };
        assert!(provider.fetch(&heavy).await.expect("quotes").is_empty());
    }
}
