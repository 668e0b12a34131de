//! Render-loop owner.
//!
//! [`Dashboard`] pairs the consumer end of the ingestion channel with the
//! [`TelemetryStore`] it feeds. Every refresh, whether triggered by a page
//! view, an API call or the background ticker, is the same synchronous
//! drain-then-apply step under one lock, so the store has exactly one
//! writer at a time and events are applied in drain order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::ingest::IngestReceiver;
use crate::store::TelemetryStore;
use crate::Config;

// ---

/// Handle shared by the HTTP handlers and the ticker.
pub type SharedDashboard = Arc<Mutex<Dashboard>>;

#[derive(Debug)]
pub struct Dashboard {
    // ---
    receiver: IngestReceiver,
    store: TelemetryStore,
}

impl Dashboard {
    // ---
    pub fn new(cfg: &Config, receiver: IngestReceiver) -> Self {
        // ---
        Dashboard {
            receiver,
            store: TelemetryStore::new(cfg.buffer_capacity, cfg.display_offset),
        }
    }

    pub fn shared(self) -> SharedDashboard {
        Arc::new(Mutex::new(self))
    }

    /// Drain every pending event and apply it in order.
    ///
    /// Returns the number of events applied.
    pub fn refresh(&mut self) -> usize {
        // ---
        let events = self.receiver.drain_all();
        let drained = events.len();
        if drained == 0 {
            return 0;
        }

        let readings = self.store.apply_all(events);
        tracing::debug!(
            drained,
            readings,
            buffered = self.store.len(),
            "Applied ingestion events"
        );
        drained
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    /// Events waiting for the next refresh.
    pub fn pending(&self) -> usize {
        self.receiver.pending()
    }
}

/// Periodically refresh the dashboard so the channel does not grow without
/// bound while nobody is viewing the page.
pub fn spawn_drain_ticker(dashboard: SharedDashboard, interval: Duration) -> JoinHandle<()> {
    // ---
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            dashboard.lock().await.refresh();
        }
    })
}
