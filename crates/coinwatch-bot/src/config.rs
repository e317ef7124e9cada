//! Application configuration.

use crate::error::{AppError, AppResult};
use coinwatch_core::ProductId;
use coinwatch_detector::DetectorConfig;
use coinwatch_notify::sms::DEFAULT_BASE_URL;
use coinwatch_notify::DispatcherConfig;
use coinwatch_telemetry::LogFormat;
use coinwatch_ws::{ConnectionConfig, SubscriptionSpec};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment prefix for layered loading, e.g.
/// `COINWATCH_WEBSOCKET__MAX_RECONNECT_ATTEMPTS=5`.
pub const ENV_PREFIX: &str = "COINWATCH";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Feed websocket endpoint.
    #[serde(default = "default_feed_endpoint")]
    pub feed_endpoint: String,
    /// Product to watch.
    #[serde(default = "default_product_id")]
    pub product_id: String,
    /// Feed channels to subscribe to (`ticker`, `level2`).
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// Minimum order size that triggers a large-order alert (inclusive).
    #[serde(default = "default_large_order_threshold")]
    pub large_order_threshold: Decimal,
    /// Minimum `price / first price` that triggers a deviation alert (inclusive).
    #[serde(default = "default_price_deviation_ratio")]
    pub price_deviation_ratio: Decimal,
    /// Asset name used in notification text.
    #[serde(default = "default_asset_name")]
    pub asset_name: String,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_feed_endpoint() -> String {
    "wss://ws-feed.exchange.coinbase.com".to_string()
}

fn default_product_id() -> String {
    "BTC-USD".to_string()
}

fn default_channels() -> Vec<String> {
    vec!["ticker".to_string()]
}

fn default_large_order_threshold() -> Decimal {
    DetectorConfig::default().large_order_threshold
}

fn default_price_deviation_ratio() -> Decimal {
    DetectorConfig::default().price_deviation_ratio
}

fn default_asset_name() -> String {
    coinwatch_notify::format::DEFAULT_ASSET_NAME.to_string()
}

/// Feed connection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    /// Maximum consecutive failed connection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for reconnection backoff (ms).
    pub reconnect_base_delay_ms: u64,
    /// Cap for reconnection backoff (ms).
    pub reconnect_max_delay_ms: u64,
    /// Idle time before a ping is sent (ms).
    pub heartbeat_interval_ms: u64,
    /// Time allowed for the pong (ms).
    pub heartbeat_timeout_ms: u64,
    /// Time allowed for the subscription acknowledgement (ms).
    pub subscription_ack_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        let defaults = ConnectionConfig::default();
        Self {
            max_reconnect_attempts: defaults.max_reconnect_attempts,
            reconnect_base_delay_ms: defaults.reconnect_base_delay_ms,
            reconnect_max_delay_ms: defaults.reconnect_max_delay_ms,
            heartbeat_interval_ms: defaults.heartbeat_interval_ms,
            heartbeat_timeout_ms: defaults.heartbeat_timeout_ms,
            subscription_ack_timeout_ms: defaults.subscription_ack_timeout_ms,
        }
    }
}

/// Notification delivery settings. Provider credentials come from the
/// environment, never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// SMS provider API base URL.
    pub base_url: String,
    /// HTTP timeout for one provider request (ms).
    pub request_timeout_ms: u64,
    /// Pending notifications before new ones are dropped.
    pub queue_capacity: usize,
    /// Time in-flight notifications get on shutdown (ms).
    pub shutdown_grace_ms: u64,
    /// Log notifications instead of sending them.
    pub dry_run: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 10_000,
            queue_capacity: 64,
            shutdown_grace_ms: 5_000,
            dry_run: false,
        }
    }
}

impl NotifierConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Send timeout is the HTTP timeout plus one second.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            queue_capacity: self.queue_capacity,
            send_timeout: self.request_timeout() + Duration::from_secs(1),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `pretty` or `json`.
    pub log_format: LogFormat,
    /// Seconds between summary log lines (0 disables).
    pub stats_interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            stats_interval_secs: 60,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_endpoint: default_feed_endpoint(),
            product_id: default_product_id(),
            channels: default_channels(),
            large_order_threshold: default_large_order_threshold(),
            price_deviation_ratio: default_price_deviation_ratio(),
            asset_name: default_asset_name(),
            websocket: WsConfig::default(),
            notifier: NotifierConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file only.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Layered load: defaults, then the file at `path` if it exists, then
    /// `COINWATCH_*` environment variables.
    pub fn load(path: &str) -> AppResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`AppConfig::load`], reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(path: &str, env: Option<config::Map<String, String>>) -> AppResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()
            .map_err(|e| AppError::Config(format!("Failed to load config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.feed_endpoint.trim().is_empty() {
            return Err(AppError::Config("feed_endpoint must not be empty".to_string()));
        }
        if !(self.feed_endpoint.starts_with("ws://") || self.feed_endpoint.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "feed_endpoint must be a ws:// or wss:// URL, got {}",
                self.feed_endpoint
            )));
        }
        self.product()?;
        if self.channels.is_empty() || self.channels.iter().any(|c| c.trim().is_empty()) {
            return Err(AppError::Config(
                "channels must list at least one non-empty channel".to_string(),
            ));
        }
        self.detector_config().validate()?;
        if self.notifier.queue_capacity == 0 {
            return Err(AppError::Config("notifier.queue_capacity must be > 0".to_string()));
        }
        if self.websocket.reconnect_base_delay_ms > self.websocket.reconnect_max_delay_ms {
            return Err(AppError::Config(format!(
                "websocket.reconnect_base_delay_ms ({}) exceeds reconnect_max_delay_ms ({})",
                self.websocket.reconnect_base_delay_ms, self.websocket.reconnect_max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn product(&self) -> AppResult<ProductId> {
        Ok(ProductId::new(self.product_id.as_str())?)
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            large_order_threshold: self.large_order_threshold,
            price_deviation_ratio: self.price_deviation_ratio,
        }
    }

    pub fn subscription(&self) -> SubscriptionSpec {
        SubscriptionSpec::new(vec![self.product_id.clone()], self.channels.clone())
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        let ws = &self.websocket;
        ConnectionConfig {
            url: self.feed_endpoint.clone(),
            subscription: self.subscription(),
            max_reconnect_attempts: ws.max_reconnect_attempts,
            reconnect_base_delay_ms: ws.reconnect_base_delay_ms,
            reconnect_max_delay_ms: ws.reconnect_max_delay_ms,
            heartbeat_interval_ms: ws.heartbeat_interval_ms,
            heartbeat_timeout_ms: ws.heartbeat_timeout_ms,
            subscription_ack_timeout_ms: ws.subscription_ack_timeout_ms,
        }
    }
}
