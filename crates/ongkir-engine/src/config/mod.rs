mod shipping;

pub use shipping::ShippingConfig;

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::reconciliation::{ReconciliationConfig, MAX_REPORT_PERIOD_DAYS};
use crate::risk::RiskConfig;
use crate::shipping::ShipmentStrategy;

/// Upper bound for `ONGKIR_CACHE_TTL_SECONDS`, one week.
pub const MAX_CACHE_TTL_SECONDS: u64 = 7 * 24 * 3600;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub shipping: ShippingConfig,
    pub risk: RiskConfig,
    pub reconciliation: ReconciliationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            shipping: load_shipping()?,
            risk: load_risk()?,
            reconciliation: load_reconciliation()?,
        })
    }
}

/// Values `load` falls back to when no variables are set.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: AppEnvironment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
            shipping: ShippingConfig::default(),
            risk: RiskConfig::default(),
            reconciliation: ReconciliationConfig::default(),
        }
    }
}

fn load_shipping() -> Result<ShippingConfig, ConfigError> {
    let defaults = ShippingConfig::default();

    let enabled_couriers = match env::var("ONGKIR_ENABLED_COURIERS") {
        Ok(raw) => {
            let couriers = split_list(&raw)
                .map(|courier| courier.to_ascii_lowercase())
                .collect::<Vec<_>>();
            if couriers.is_empty() {
                defaults.enabled_couriers.clone()
            } else {
                couriers
            }
        }
        Err(_) => defaults.enabled_couriers.clone(),
    };

    Ok(ShippingConfig {
        provider: env::var("ONGKIR_PROVIDER").unwrap_or_else(|_| defaults.provider.clone()),
        enabled_couriers,
        strategy: env::var("ONGKIR_SHIPMENT_STRATEGY")
            .map(|raw| ShipmentStrategy::from_setting(&raw))
            .unwrap_or(defaults.strategy),
        cache_ttl: Duration::from_secs(
            parse_env("ONGKIR_CACHE_TTL_SECONDS", 900u64)?.min(MAX_CACHE_TTL_SECONDS),
        ),
        stale_max_age: Duration::from_secs(
            parse_env("ONGKIR_STALE_MAX_AGE_MINUTES", 720u64)?.saturating_mul(60),
        ),
        request_timeout: Duration::from_secs(
            parse_env("ONGKIR_REQUEST_TIMEOUT_SECONDS", 7u64)?.max(1),
        ),
        flat_rate_backup: parse_env("ONGKIR_FLAT_RATE_BACKUP", defaults.flat_rate_backup)?,
        ..defaults
    })
}

fn load_risk() -> Result<RiskConfig, ConfigError> {
    let defaults = RiskConfig::default();

    let enabled = match env::var("ONGKIR_COD_RISK_ENABLED") {
        Ok(raw) => !matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "no" | "false" | "0" | "off"
        ),
        Err(_) => defaults.enabled,
    };

    let risky_hours = match env::var("ONGKIR_COD_RISKY_HOURS") {
        Ok(raw) => split_list(&raw)
            .map(|hour| {
                hour.parse::<i64>().map_err(|_| ConfigError::InvalidNumber {
                    key: "ONGKIR_COD_RISKY_HOURS",
                    value: raw.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Err(_) => defaults.risky_hours.iter().map(|hour| i64::from(*hour)).collect(),
    };

    let block: i64 = parse_env("ONGKIR_COD_BLOCK_THRESHOLD", 80)?;
    let review: i64 = parse_env("ONGKIR_COD_REVIEW_THRESHOLD", 60)?;

    Ok(RiskConfig {
        enabled,
        ..defaults
    }
    .with_thresholds(block, review)
    .with_risky_hours(&risky_hours))
}

fn load_reconciliation() -> Result<ReconciliationConfig, ConfigError> {
    let defaults = ReconciliationConfig::default();

    Ok(ReconciliationConfig {
        variance_threshold: parse_env(
            "ONGKIR_RECONCILIATION_THRESHOLD",
            defaults.variance_threshold,
        )?,
        minimum_samples: parse_env(
            "ONGKIR_RECONCILIATION_MIN_SAMPLES",
            defaults.minimum_samples,
        )?,
        report_period_days: parse_env(
            "ONGKIR_RECONCILIATION_PERIOD_DAYS",
            defaults.report_period_days,
        )?
        .clamp(1, MAX_REPORT_PERIOD_DAYS),
    })
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidNumber { key, value: raw })
        }
        _ => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be numeric, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
        }
    }
}
