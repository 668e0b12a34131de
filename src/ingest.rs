//! Ingestion channel between the bus thread and the render context.
//!
//! The producer side ([`IngestSender`]) is cloneable and handed to the MQTT
//! receive loop. The consumer side ([`IngestReceiver`]) is owned by the
//! dashboard and drained once per refresh. The queue is unbounded: a push
//! never blocks the network thread and a drain never waits for new data.

use crossbeam_channel::{Receiver, Sender};

use crate::models::IngestionEvent;

// ---

/// Create a connected sender/receiver pair.
pub fn channel() -> (IngestSender, IngestReceiver) {
    // ---
    let (tx, rx) = crossbeam_channel::unbounded();
    (IngestSender { tx }, IngestReceiver { rx })
}

/// Producer handle, safe to clone across threads.
#[derive(Debug, Clone)]
pub struct IngestSender {
    tx: Sender<IngestionEvent>,
}

impl IngestSender {
    // ---
    /// Append an event to the tail of the queue.
    ///
    /// Only fails once the receiver has been dropped, which happens at
    /// shutdown; the event is discarded then.
    pub fn push(&self, event: IngestionEvent) {
        // ---
        if let Err(e) = self.tx.send(event) {
            tracing::trace!("Ingestion receiver gone, dropping {:?}", e.into_inner());
        }
    }
}

/// Consumer handle, owned by the render context.
#[derive(Debug)]
pub struct IngestReceiver {
    rx: Receiver<IngestionEvent>,
}

impl IngestReceiver {
    // ---
    /// Remove and return everything queued when the call starts, oldest first.
    ///
    /// Returns immediately with an empty vector when the queue is empty.
    /// Events pushed while the drain is in progress are left for the next
    /// call, so a busy producer cannot stretch a single drain.
    pub fn drain_all(&self) -> Vec<IngestionEvent> {
        // ---
        let queued = self.rx.len();
        self.rx.try_iter().take(queued).collect()
    }

    /// Number of events waiting to be drained.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::thread;

    fn sensor(producer: usize, n: usize) -> IngestionEvent {
        // ---
        let body = format!(r#"{{"producer": {producer}, "n": {n}}}"#);
        IngestionEvent::sensor_from_bytes(body.as_bytes(), Utc::now())
    }

    #[test]
    fn test_drain_empty_returns_immediately() {
        // ---
        let (_tx, rx) = channel();
        assert!(rx.drain_all().is_empty());
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn test_drain_preserves_fifo_order() {
        // ---
        let (tx, rx) = channel();
        tx.push(IngestionEvent::status(true));
        tx.push(sensor(0, 1));
        tx.push(IngestionEvent::status(false));
        assert_eq!(rx.pending(), 3);

        let drained = rx.drain_all();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0], IngestionEvent::status(true));
        assert!(matches!(drained[1], IngestionEvent::Sensor { .. }));
        assert_eq!(drained[2], IngestionEvent::status(false));

        // Everything was consumed exactly once.
        assert!(rx.drain_all().is_empty());
    }

    #[test]
    fn test_drain_takes_queued_snapshot_size() {
        // ---
        let (tx, rx) = channel();
        for n in 0..3 {
            tx.push(sensor(0, n));
        }
        let drained = rx.drain_all();
        tx.push(sensor(0, 3));

        assert_eq!(drained.len(), 3);
        assert_eq!(rx.drain_all().len(), 1);
    }

    #[test]
    fn test_push_after_receiver_dropped_is_silent() {
        // ---
        let (tx, rx) = channel();
        drop(rx);
        tx.push(IngestionEvent::status(true));
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        // ---
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 5_000;

        let (tx, rx) = channel();
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for n in 0..PER_PRODUCER {
                        tx.push(sensor(p, n));
                    }
                })
            })
            .collect();

        // Drain concurrently with the producers, then once more at the end.
        let mut seen: Vec<IngestionEvent> = Vec::new();
        while handles.iter().any(|h| !h.is_finished()) {
            seen.extend(rx.drain_all());
        }
        for h in handles {
            h.join().unwrap();
        }
        seen.extend(rx.drain_all());

        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);

        // Per-producer sequence numbers arrive strictly in order, no gaps.
        let mut next: HashMap<u64, u64> = HashMap::new();
        for event in seen {
            let IngestionEvent::Sensor { payload, .. } = event else {
                panic!("unexpected status event");
            };
            let producer = payload["producer"].as_u64().unwrap();
            let n = payload["n"].as_u64().unwrap();
            let expected = next.entry(producer).or_insert(0);
            assert_eq!(n, *expected, "producer {producer} out of order");
            *expected += 1;
        }
        assert_eq!(next.len(), PRODUCERS);
        assert!(next.values().all(|&n| n == PER_PRODUCER as u64));
    }
}
