//! Telemetry store: the capped, ordered reading buffer plus connection state.
//!
//! Mutated only by applying drained [`IngestionEvent`]s, in drain order, from
//! the render context. Everything else reads borrowed snapshots.

use std::collections::vec_deque::{self, VecDeque};

use chrono::FixedOffset;

use crate::models::{IngestionEvent, Reading};

// ---

#[derive(Debug)]
pub struct TelemetryStore {
    // ---
    readings: VecDeque<Reading>,
    /// Copy of the buffer tail, owned separately from the buffer.
    latest: Option<Reading>,
    connected: bool,
    capacity: usize,
    offset: FixedOffset,
    next_seq: u64,
}

impl TelemetryStore {
    // ---
    /// Create an empty store. A `capacity` of zero is treated as one.
    pub fn new(capacity: usize, offset: FixedOffset) -> Self {
        // ---
        let capacity = capacity.max(1);
        TelemetryStore {
            readings: VecDeque::with_capacity(capacity.min(4096)),
            latest: None,
            connected: false,
            capacity,
            offset,
            next_seq: 0,
        }
    }

    /// Apply one event.
    pub fn apply(&mut self, event: IngestionEvent) {
        // ---
        match event {
            IngestionEvent::Status { connected } => {
                if self.connected != connected {
                    tracing::info!(connected, "Bus connection status changed");
                }
                self.connected = connected;
            }
            IngestionEvent::Sensor {
                payload,
                received_at,
            } => {
                let reading = Reading::new(self.next_seq, payload, received_at, &self.offset);
                self.next_seq += 1;

                self.latest = Some(reading.clone());
                self.readings.push_back(reading);
                while self.readings.len() > self.capacity {
                    self.readings.pop_front();
                }
            }
        }
    }

    /// Apply a batch of events in order, returning how many were sensor readings.
    pub fn apply_all<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = IngestionEvent>,
    {
        // ---
        let mut readings = 0;
        for event in events {
            if matches!(event, IngestionEvent::Sensor { .. }) {
                readings += 1;
            }
            self.apply(event);
        }
        readings
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Most recent reading, even if it has since been evicted.
    pub fn snapshot_last(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    /// Up to `k` most recent readings, oldest first.
    pub fn snapshot_recent(&self, k: usize) -> Vec<&Reading> {
        // ---
        let skip = self.readings.len().saturating_sub(k);
        self.readings.iter().skip(skip).collect()
    }

    /// Every buffered reading, oldest first.
    pub fn readings(&self) -> vec_deque::Iter<'_, Reading> {
        self.readings.iter()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total readings ever applied, including evicted ones.
    pub fn total_ingested(&self) -> u64 {
        self.next_seq
    }
}
