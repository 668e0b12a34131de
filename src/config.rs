//! Configuration loader for the `telemetry-dashboard` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase, and the rest of
//! the crate only ever sees an immutable [`Config`] snapshot.
//!
use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::FixedOffset;

/// Parse an optional environment variable into `$ty`, falling back to a default.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($lookup:expr, $var_name:expr, $default:expr) => {
        $lookup($var_name)
            .filter(|v: &String| !v.trim().is_empty())
            .unwrap_or_else(|| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// MQTT broker host name.
    pub broker_host: String,

    /// MQTT broker TCP port.
    pub broker_port: u16,

    /// MQTT keep-alive interval in seconds.
    pub keep_alive_secs: u64,

    /// Prefix for generated MQTT client ids.
    pub client_id_prefix: String,

    /// Pause between subscriber reconnect attempts after a connection error.
    pub reconnect_delay_secs: u64,

    /// Topic carrying sensor readings (subscribed).
    pub topic_data: String,

    /// Topic receiving LED control commands (published).
    pub topic_control: String,

    /// Device status topic. Configured for completeness, never subscribed.
    pub topic_status: String,

    /// Maximum number of readings kept in the telemetry buffer.
    pub buffer_capacity: usize,

    /// Number of most recent readings plotted on the chart.
    pub chart_window: usize,

    /// Fixed display offset applied to capture timestamps.
    pub display_offset: FixedOffset,

    /// Field plotted on the left axis; the chart is shown only when present.
    pub chart_primary_field: String,

    /// Field plotted on the right axis when present.
    pub chart_secondary_field: String,

    /// HTTP listen port for the dashboard.
    pub http_port: u16,

    /// Browser auto-refresh interval for the dashboard page.
    pub page_refresh_secs: u32,

    /// Background drain interval in milliseconds, `0` disables the ticker.
    pub drain_interval_ms: u64,
}

/// Load configuration from environment variables with defaults.
///
/// Optional (all of them):
/// - `MQTT_BROKER` – broker host (default: `broker.hivemq.com`)
/// - `MQTT_PORT` – broker port (default: 1883)
/// - `MQTT_KEEP_ALIVE_SECS` – keep-alive, at least 5 (default: 60)
/// - `MQTT_CLIENT_ID_PREFIX` – client id prefix (default: `telemetry-dashboard`)
/// - `MQTT_RECONNECT_DELAY_SECS` – subscriber retry pause, at least 1 (default: 5)
/// - `TOPIC_DATA` / `TOPIC_CONTROL` / `TOPIC_STATUS` – topic names
/// - `BUFFER_CAPACITY` – telemetry buffer size (default: 2000)
/// - `CHART_WINDOW` – readings plotted (default: 200)
/// - `DISPLAY_UTC_OFFSET_HOURS` – display offset (default: 7)
/// - `CHART_PRIMARY_FIELD` / `CHART_SECONDARY_FIELD` – plotted fields
/// - `HTTP_PORT` – dashboard port (default: 8080)
/// - `PAGE_REFRESH_SECS` – page auto-refresh (default: 2)
/// - `DRAIN_INTERVAL_MS` – background drain tick (default: 1000)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    load_with(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
///
/// `load_from_env` is a thin wrapper over this; tests feed a map instead of
/// mutating the process environment.
pub fn load_with<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let broker_host = env_or!(lookup, "MQTT_BROKER", "broker.hivemq.com");
    let broker_port = parse_env!(lookup, "MQTT_PORT", u16, 1883);
    let keep_alive_secs = parse_env!(lookup, "MQTT_KEEP_ALIVE_SECS", u64, 60);
    let client_id_prefix = env_or!(lookup, "MQTT_CLIENT_ID_PREFIX", "telemetry-dashboard");
    let reconnect_delay_secs = parse_env!(lookup, "MQTT_RECONNECT_DELAY_SECS", u64, 5);

    let topic_data = env_or!(lookup, "TOPIC_DATA", "smuhsa/gudang/data");
    let topic_control = env_or!(lookup, "TOPIC_CONTROL", "smuhsa/gudang/kontrol");
    let topic_status = env_or!(lookup, "TOPIC_STATUS", "smuhsa/gudang/status");

    let buffer_capacity = parse_env!(lookup, "BUFFER_CAPACITY", usize, 2000);
    let chart_window = parse_env!(lookup, "CHART_WINDOW", usize, 200);
    let offset_hours = parse_env!(lookup, "DISPLAY_UTC_OFFSET_HOURS", i32, 7);
    let chart_primary_field = env_or!(lookup, "CHART_PRIMARY_FIELD", "suhu");
    let chart_secondary_field = env_or!(lookup, "CHART_SECONDARY_FIELD", "ldr");

    let http_port = parse_env!(lookup, "HTTP_PORT", u16, 8080);
    let page_refresh_secs = parse_env!(lookup, "PAGE_REFRESH_SECS", u32, 2);
    let drain_interval_ms = parse_env!(lookup, "DRAIN_INTERVAL_MS", u64, 1000);

    if keep_alive_secs < 5 {
        return Err(anyhow!(
            "Invalid MQTT_KEEP_ALIVE_SECS: {} (must be at least 5)",
            keep_alive_secs
        ));
    }
    if reconnect_delay_secs == 0 {
        return Err(anyhow!("Invalid MQTT_RECONNECT_DELAY_SECS: must be at least 1"));
    }
    if buffer_capacity == 0 {
        return Err(anyhow!("Invalid BUFFER_CAPACITY: must be at least 1"));
    }
    if chart_window == 0 {
        return Err(anyhow!("Invalid CHART_WINDOW: must be at least 1"));
    }

    let display_offset = offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            anyhow!(
                "Invalid DISPLAY_UTC_OFFSET_HOURS: {} (must be within -23..=23)",
                offset_hours
            )
        })?;

    Ok(Config {
        broker_host,
        broker_port,
        keep_alive_secs,
        client_id_prefix,
        reconnect_delay_secs,
        topic_data,
        topic_control,
        topic_status,
        buffer_capacity,
        chart_window,
        display_offset,
        chart_primary_field,
        chart_secondary_field,
        http_port,
        page_refresh_secs,
        drain_interval_ms,
    })
}

impl Default for Config {
    fn default() -> Self {
        // ---
        // Every variable has a valid default, so an empty lookup cannot fail.
        load_with(|_| None).unwrap_or_else(|e| unreachable!("default config invalid: {e}"))
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    /// Parse `KEY=VALUE` lines (dotenv style, `#` comments allowed).
    fn from_str(s: &str) -> Result<Self> {
        // ---
        let pairs: Vec<(String, String)> = s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        load_with(|name| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
    }
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  MQTT_BROKER              : {}:{}", self.broker_host, self.broker_port);
        tracing::info!("  MQTT_KEEP_ALIVE_SECS     : {}", self.keep_alive_secs);
        tracing::info!("  MQTT_CLIENT_ID_PREFIX    : {}", self.client_id_prefix);
        tracing::info!("  TOPIC_DATA               : {}", self.topic_data);
        tracing::info!("  TOPIC_CONTROL            : {}", self.topic_control);
        tracing::info!("  TOPIC_STATUS             : {} (not subscribed)", self.topic_status);
        tracing::info!("  BUFFER_CAPACITY          : {}", self.buffer_capacity);
        tracing::info!("  CHART_WINDOW             : {}", self.chart_window);
        tracing::info!("  DISPLAY_UTC_OFFSET       : {}", self.display_offset);
        tracing::info!(
            "  CHART_FIELDS             : {} / {}",
            self.chart_primary_field,
            self.chart_secondary_field
        );
        tracing::info!("  HTTP_PORT                : {}", self.http_port);
        tracing::info!("  PAGE_REFRESH_SECS        : {}", self.page_refresh_secs);
        tracing::info!("  DRAIN_INTERVAL_MS        : {}", self.drain_interval_ms);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults() {
        // ---
        let cfg = Config::default();

        assert_eq!(cfg.broker_host, "broker.hivemq.com");
        assert_eq!(cfg.broker_port, 1883);
        assert_eq!(cfg.topic_data, "smuhsa/gudang/data");
        assert_eq!(cfg.topic_control, "smuhsa/gudang/kontrol");
        assert_eq!(cfg.buffer_capacity, 2000);
        assert_eq!(cfg.chart_window, 200);
        assert_eq!(cfg.display_offset.local_minus_utc(), 7 * 3600);
        assert_eq!(cfg.chart_primary_field, "suhu");
        assert_eq!(cfg.chart_secondary_field, "ldr");
    }

    #[test]
    fn test_overrides() {
        // ---
        let cfg: Config = "
            # local broker
            MQTT_BROKER=localhost
            MQTT_PORT=1884
            BUFFER_CAPACITY=10
            DISPLAY_UTC_OFFSET_HOURS=-5
        "
        .parse()
        .unwrap();

        assert_eq!(cfg.broker_host, "localhost");
        assert_eq!(cfg.broker_port, 1884);
        assert_eq!(cfg.buffer_capacity, 10);
        assert_eq!(cfg.display_offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        // ---
        let err = "MQTT_PORT=not-a-port".parse::<Config>().unwrap_err();
        assert!(err.to_string().contains("MQTT_PORT"));

        let err = "BUFFER_CAPACITY=0".parse::<Config>().unwrap_err();
        assert!(err.to_string().contains("BUFFER_CAPACITY"));

        let err = "DISPLAY_UTC_OFFSET_HOURS=30".parse::<Config>().unwrap_err();
        assert!(err.to_string().contains("DISPLAY_UTC_OFFSET_HOURS"));

        let err = "MQTT_KEEP_ALIVE_SECS=1".parse::<Config>().unwrap_err();
        assert!(err.to_string().contains("MQTT_KEEP_ALIVE_SECS"));

        let err = "MQTT_RECONNECT_DELAY_SECS=0".parse::<Config>().unwrap_err();
        assert!(err.to_string().contains("MQTT_RECONNECT_DELAY_SECS"));
    }

    #[test]
    fn test_blank_string_falls_back_to_default() {
        // ---
        let cfg: Config = "TOPIC_DATA=   ".parse().unwrap();
        assert_eq!(cfg.topic_data, "smuhsa/gudang/data");
    }
}
