//! MQTT integration.
//!
//! Two entry points:
//! - [`spawn_subscriber`] runs the blocking receive loop on a dedicated
//!   thread for the lifetime of the process. It never touches the store, it
//!   only pushes typed events into the ingestion channel.
//! - [`publish_command`] is a short-lived connect, publish, disconnect used
//!   for operator control actions. It blocks the caller until the publish is
//!   written or the connection fails.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rumqttc::{
    Client, ConnectReturnCode, ConnectionError, Event, MqttOptions, Outgoing, Packet, QoS,
};
use tracing::{debug, info, warn};

use crate::ingest::IngestSender;
use crate::models::{IngestionEvent, LedCommand};
use crate::Config;

// ---

/// Capacity of the request queue between a sync client and its event loop.
const REQUEST_CAPACITY: usize = 10;

fn mqtt_options(cfg: &Config, role: &str) -> MqttOptions {
    // ---
    let client_id = format!("{}-{}-{}", cfg.client_id_prefix, role, uuid::Uuid::new_v4().simple());
    let mut opts = MqttOptions::new(client_id, cfg.broker_host.clone(), cfg.broker_port);
    opts.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs));
    opts
}

/// Translate one client notification into the event to push, if any.
///
/// A connect ack reports its outcome, every publish becomes a sensor event,
/// and a broker disconnect or connection error reports "not connected".
fn ingestion_event(
    notification: &Result<Event, ConnectionError>,
    received_at: DateTime<Utc>,
) -> Option<IngestionEvent> {
    // ---
    match notification {
        Ok(Event::Incoming(Packet::ConnAck(ack))) => Some(IngestionEvent::status(
            ack.code == ConnectReturnCode::Success,
        )),
        Ok(Event::Incoming(Packet::Publish(publish))) => Some(IngestionEvent::sensor_from_bytes(
            &publish.payload,
            received_at,
        )),
        Ok(Event::Incoming(Packet::Disconnect)) => Some(IngestionEvent::status(false)),
        Ok(_) => None,
        Err(_) => Some(IngestionEvent::status(false)),
    }
}

/// Drops status events that repeat the previous status.
///
/// Sensor events always pass.
#[derive(Debug, Default)]
struct StatusGate {
    last: Option<bool>,
}

impl StatusGate {
    // ---
    fn admit(&mut self, event: &IngestionEvent) -> bool {
        // ---
        match event {
            IngestionEvent::Status { connected } => {
                let changed = self.last != Some(*connected);
                self.last = Some(*connected);
                changed
            }
            IngestionEvent::Sensor { .. } => true,
        }
    }
}

/// Start the subscriber thread.
///
/// On every successful connect the data topic is (re)subscribed and a
/// `Status { connected: true }` event is pushed. Connection errors push
/// `Status { connected: false }` once per outage; the client reconnects on
/// its next poll after `reconnect_delay_secs`.
pub fn spawn_subscriber(cfg: &Config, sender: IngestSender) -> Result<JoinHandle<()>> {
    // ---
    let opts = mqtt_options(cfg, "sub");
    let topic = cfg.topic_data.clone();
    let reconnect_delay = Duration::from_secs(cfg.reconnect_delay_secs);

    info!(
        "Starting MQTT subscriber for '{}' on {}:{}",
        topic, cfg.broker_host, cfg.broker_port
    );

    thread::Builder::new()
        .name("mqtt-subscriber".into())
        .spawn(move || {
            let (client, mut connection) = Client::new(opts, REQUEST_CAPACITY);
            let mut gate = StatusGate::default();

            for notification in connection.iter() {
                match &notification {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) if ack.code == ConnectReturnCode::Success => {
                        info!("Connected to MQTT broker, subscribing to '{}'", topic);
                        if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                            warn!("Failed to subscribe to '{}': {}", topic, e);
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        warn!("MQTT broker refused connection: {:?}", ack.code);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        debug!(
                            "Message on {:?} ({} bytes)",
                            publish.topic,
                            publish.payload.len()
                        );
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => warn!("MQTT broker sent disconnect"),
                    Ok(_) => {}
                    Err(e) => warn!(
                        "MQTT connection error: {}; retrying in {:?}",
                        e, reconnect_delay
                    ),
                }

                if let Some(event) = ingestion_event(&notification, Utc::now()) {
                    if gate.admit(&event) {
                        sender.push(event);
                    }
                }
                if notification.is_err() {
                    thread::sleep(reconnect_delay);
                }
            }
            info!("MQTT subscriber loop exited");
        })
        .context("Failed to spawn MQTT subscriber thread")
}

/// Publish one LED command with a fresh connection.
///
/// Returns once the publish has been handed to the network and the client
/// has disconnected. QoS 0: there is no delivery acknowledgement to wait
/// for, so `Ok` means "written", not "received by the device".
pub fn publish_command(cfg: &Config, command: LedCommand) -> Result<()> {
    // ---
    let (client, mut connection) = Client::new(mqtt_options(cfg, "pub"), REQUEST_CAPACITY);

    client
        .try_publish(cfg.topic_control.as_str(), QoS::AtMostOnce, false, command.payload())
        .with_context(|| format!("Failed to queue {} on '{}'", command.payload(), cfg.topic_control))?;

    let mut published = false;
    for notification in connection.iter() {
        let event = notification.with_context(|| {
            format!(
                "MQTT publish of {} to {}:{} failed",
                command.payload(),
                cfg.broker_host,
                cfg.broker_port
            )
        })?;

        match event {
            Event::Outgoing(Outgoing::Publish(_)) => {
                debug!("Published {} on '{}'", command.payload(), cfg.topic_control);
                published = true;
                client
                    .try_disconnect()
                    .context("Failed to request MQTT disconnect")?;
            }
            Event::Outgoing(Outgoing::Disconnect) => break,
            _ => {}
        }
    }

    if published {
        Ok(())
    } else {
        Err(anyhow!("MQTT connection closed before {} was published", command.payload()))
    }
}
