use serde::Serialize;

use super::acquisition::CacheKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateEventKind {
    CacheHit,
    CacheMiss,
    LiveSuccess,
    LiveEmpty,
    LiveError,
    LiveTimeout,
    StaleHit,
    StaleMiss,
    FlatRateBackup,
    StoreFailure,
}

impl RateEventKind {
    pub const fn label(self) -> &'static str {
        match self {
            RateEventKind::CacheHit => "cache_hit",
            RateEventKind::CacheMiss => "cache_miss",
            RateEventKind::LiveSuccess => "live_success",
            RateEventKind::LiveEmpty => "live_empty",
            RateEventKind::LiveError => "live_error",
            RateEventKind::LiveTimeout => "live_timeout",
            RateEventKind::StaleHit => "stale_hit",
            RateEventKind::StaleMiss => "stale_miss",
            RateEventKind::FlatRateBackup => "flat_rate_backup",
            RateEventKind::StoreFailure => "store_failure",
        }
    }
}

/// One transition on the rate acquisition ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateEvent {
    pub kind: RateEventKind,
    pub provider: String,
    pub cache_key: CacheKey,
    pub detail: Option<String>,
}

/// Receives pipeline events; implementations must not block.
pub trait RateEventSink: Send + Sync {
    fn record(&self, event: &RateEvent);
}

/// Writes events to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRateEvents;

impl RateEventSink for TracingRateEvents {
    fn record(&self, event: &RateEvent) {
        let detail = event.detail.as_deref().unwrap_or("");
        match event.kind {
            RateEventKind::CacheHit
            | RateEventKind::CacheMiss
            | RateEventKind::LiveSuccess => tracing::debug!(
                event = event.kind.label(),
                provider = %event.provider,
                cache_key = event.cache_key.as_str(),
                "rate lookup"
            ),
            RateEventKind::LiveEmpty
            | RateEventKind::LiveError
            | RateEventKind::LiveTimeout
            | RateEventKind::StaleHit
            | RateEventKind::StaleMiss
            | RateEventKind::StoreFailure => tracing::warn!(
                event = event.kind.label(),
                provider = %event.provider,
                cache_key = event.cache_key.as_str(),
                detail,
                "rate lookup degraded"
            ),
            RateEventKind::FlatRateBackup => tracing::error!(
                event = event.kind.label(),
                provider = %event.provider,
                cache_key = event.cache_key.as_str(),
                "serving flat-rate backup"
            ),
        }
    }
}

/// Fans one event out to several sinks.
pub struct FanOutRateEvents {
    sinks: Vec<std::sync::Arc<dyn RateEventSink>>,
}

impl FanOutRateEvents {
    pub fn new(sinks: Vec<std::sync::Arc<dyn RateEventSink>>) -> Self {
        Self { sinks }
    }
}

impl RateEventSink for FanOutRateEvents {
    fn record(&self, event: &RateEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
