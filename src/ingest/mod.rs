// Copyright (c) 2026 roomhub
// Licensed under the MIT License. See LICENSE file in the project root.

//! The event subscriber loop: a single long-lived worker consuming bus
//! messages one at a time in delivery order.
//!
//! Link state machine:
//!
//! ```text
//! DISCONNECTED -> CONNECTING -> SUBSCRIBED -> (per message) PROCESSING -> SUBSCRIBED
//!                      ^                |
//!                      '- RECONNECTING <' (transport error, bounded backoff)
//! ```
//!
//! Each message is processed independently; a failure decoding or
//! persisting one message is caught and logged and never terminates the
//! loop. Transport errors trigger reconnection with exponential backoff
//! and only escalate to an operator-visible alarm once the configured
//! retry budget is exceeded.

mod handler;

pub use handler::handle_message;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;
use crate::store::Database;

/// Topic filter for IAQ sensor messages.
pub const IAQ_TOPIC_FILTER: &str = "hotel/room/+/iaq";
/// Topic filter for life-being (occupancy) sensor messages.
pub const LIFE_BEING_TOPIC_FILTER: &str = "hotel/room/+/life_being";

/// Observable state of the bus link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Not yet started, or shut down.
    Disconnected,
    /// Connection attempt in flight.
    Connecting,
    /// Connected with subscriptions active, waiting for messages.
    Subscribed,
    /// Handling one inbound message.
    Processing,
    /// Transport dropped; waiting out the backoff before reconnecting.
    Reconnecting,
}

/// The long-running bus subscriber.
///
/// Explicitly constructed and explicitly owned; its lifecycle is
/// controlled by the process entry point through [`Subscriber::run`] and
/// the shutdown channel. There is no ambient global client.
pub struct Subscriber {
    client: AsyncClient,
    eventloop: EventLoop,
    db: Arc<Database>,
    config: MqttConfig,
    state: LinkState,
    failed_attempts: u32,
}

impl Subscriber {
    /// Build a subscriber and a clonable client handle for publishers
    /// (the command dispatcher and the demo simulator share it).
    pub fn new(config: &MqttConfig, db: Arc<Database>) -> (Self, AsyncClient) {
        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(options, 100);
        let handle = client.clone();
        (
            Self {
                client,
                eventloop,
                db,
                config: config.clone(),
                state: LinkState::Disconnected,
                failed_attempts: 0,
            },
            handle,
        )
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    fn transition(&mut self, next: LinkState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "bus link state");
            self.state = next;
        }
    }

    /// Backoff before the next reconnect attempt: exponential from the
    /// configured base, capped at the configured maximum.
    fn backoff(&self) -> Duration {
        let exponent = self.failed_attempts.saturating_sub(1).min(16);
        let millis = self
            .config
            .reconnect_base_ms
            .saturating_mul(1u64 << exponent)
            .min(self.config.reconnect_max_ms);
        Duration::from_millis(millis)
    }

    /// Run until the shutdown channel fires. Never returns on transport
    /// errors; those feed the reconnect path instead.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(
            broker = %self.config.broker,
            port = self.config.port,
            "starting bus subscriber"
        );
        self.transition(LinkState::Connecting);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("bus subscriber shutting down");
                    let _ = self.client.disconnect().await;
                    self.transition(LinkState::Disconnected);
                    return Ok(());
                }
                event = self.eventloop.poll() => self.step(event).await,
            }
        }
    }

    async fn step(&mut self, event: Result<Event, ConnectionError>) {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(broker = %self.config.broker, "connected to bus");
                self.failed_attempts = 0;
                self.transition(LinkState::Subscribed);
                for filter in [IAQ_TOPIC_FILTER, LIFE_BEING_TOPIC_FILTER] {
                    match self.client.subscribe(filter, QoS::AtLeastOnce).await {
                        Ok(()) => info!(filter, "subscribed"),
                        Err(err) => warn!(filter, "subscribe failed: {err}"),
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(message))) => {
                self.transition(LinkState::Processing);
                if let Err(err) = handle_message(&self.db, &message.topic, &message.payload) {
                    // Bus-path persistence failures have no caller to
                    // respond to; log and move on to the next message.
                    warn!(topic = %message.topic, "message processing failed: {err}");
                }
                self.transition(LinkState::Subscribed);
            }
            Ok(_) => {}
            Err(err) => {
                self.transition(LinkState::Reconnecting);
                self.failed_attempts += 1;
                let wait = self.backoff();
                if self.failed_attempts > self.config.retry_budget {
                    error!(
                        attempts = self.failed_attempts,
                        "bus unreachable beyond retry budget: {err}"
                    );
                } else {
                    warn!(
                        attempts = self.failed_attempts,
                        "bus connection lost, retrying in {wait:?}: {err}"
                    );
                }
                tokio::time::sleep(wait).await;
                self.transition(LinkState::Connecting);
            }
        }
    }
}
