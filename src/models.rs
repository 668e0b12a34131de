//! Simple data models for the telemetry dashboard.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

// ---

/// Field name used when a payload cannot be parsed as a JSON object.
pub const RAW_FIELD: &str = "raw";

/// Field name carrying the display timestamp of a reading.
pub const TS_FIELD: &str = "ts";

/// Producer-defined reading fields, kept in arrival order.
pub type Payload = Map<String, Value>;

/// One event handed from the bus thread to the render context.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionEvent {
    // ---
    /// Broker connection went up or down.
    Status { connected: bool },

    /// A sensor message arrived on the data topic.
    Sensor {
        payload: Payload,
        received_at: DateTime<Utc>,
    },
}

impl IngestionEvent {
    // ---
    pub fn status(connected: bool) -> Self {
        IngestionEvent::Status { connected }
    }

    /// Build a sensor event from raw message bytes.
    ///
    /// Anything that is not a JSON object is kept as `{"raw": <text>}`.
    pub fn sensor_from_bytes(bytes: &[u8], received_at: DateTime<Utc>) -> Self {
        // ---
        IngestionEvent::Sensor {
            payload: decode_payload(bytes),
            received_at,
        }
    }
}

/// Decode a message body into a payload map, degrading to a `raw` record.
pub fn decode_payload(bytes: &[u8]) -> Payload {
    // ---
    let text = String::from_utf8_lossy(bytes);
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert(RAW_FIELD.to_string(), Value::String(text.into_owned()));
            map
        }
    }
}

/// Format a capture instant as `HH:MM:SS` in the given display offset.
pub fn display_timestamp(received_at: DateTime<Utc>, offset: &FixedOffset) -> String {
    // ---
    received_at
        .with_timezone(offset)
        .format("%H:%M:%S")
        .to_string()
}

/// A stored telemetry sample.
///
/// Serializes as the payload fields followed by `ts`, which is how the
/// dashboard shows it and how the snapshot API returns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    // ---
    /// Position in ingestion order, starting at 0 for the first reading.
    #[serde(skip)]
    pub seq: u64,

    #[serde(skip)]
    pub received_at: DateTime<Utc>,

    #[serde(flatten)]
    pub fields: Payload,

    /// Display timestamp (`HH:MM:SS` at the configured offset).
    pub ts: String,
}

impl Reading {
    // ---
    /// Build a reading; a producer field named `ts` is dropped in favour of
    /// the display timestamp.
    pub fn new(
        seq: u64,
        mut fields: Payload,
        received_at: DateTime<Utc>,
        offset: &FixedOffset,
    ) -> Self {
        // ---
        fields.retain(|key, _| key != TS_FIELD);
        Reading {
            seq,
            received_at,
            ts: display_timestamp(received_at, offset),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Numeric value of a field, if present and plottable.
    pub fn numeric(&self, field: &str) -> Option<f64> {
        // ---
        match self.fields.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

/// LED control commands published on the control topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
}

impl LedCommand {
    // ---
    /// Parse the `{state}` segment of `/control/led/{state}`.
    pub fn from_path(state: &str) -> Option<Self> {
        match state.to_ascii_lowercase().as_str() {
            "on" => Some(LedCommand::On),
            "off" => Some(LedCommand::Off),
            _ => None,
        }
    }

    /// Message body understood by the device firmware.
    pub fn payload(self) -> &'static str {
        match self {
            LedCommand::On => "ALERT_ON",
            LedCommand::Off => "ALERT_OFF",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LedCommand::On => "LED ON",
            LedCommand::Off => "LED OFF",
        }
    }
}
