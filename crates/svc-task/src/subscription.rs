//! # Subscription Manager
//!
//! Opens one bus subscription per topic and keeps it for the life of the
//! process.
//!
//! ```text
//! subscribe(topic)
//!   1. read bus type + client config path      (shared config, read lock)
//!   2. factory.communicator(type, path, topic)  ──Err──→ log, SubscribeError
//!   3. communicator.accept(handler)             ──Err──→ log, SubscribeError
//!   4. keep (communicator, handle) until close()
//! ```
//!
//! The topic is reserved before the first await, so concurrent calls for the
//! same topic open at most one bus registration. Failures are reported once
//! and not retried; restarting the service is the supervisor's job.

use crate::config::SharedConfig;
use crate::domain::SubscribeError;
use odim_telemetry::TASK_SUBSCRIPTIONS_ACTIVE;
use parking_lot::Mutex;
use shared_bus::{AcceptHandle, Communicator, CommunicatorFactory, MessageHandler};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

struct Subscription {
    communicator: Arc<dyn Communicator>,
    handle: AcceptHandle,
}

enum Slot {
    /// A `subscribe` call is connecting.
    Pending,
    Active(Subscription),
}

type Slots = Mutex<HashMap<String, Slot>>;

/// Removes a pending reservation unless the subscription completed.
///
/// Covers the error returns and a `subscribe` future dropped mid-await.
struct Reservation<'a> {
    slots: &'a Slots,
    topic: &'a str,
    armed: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slots = self.slots.lock();
        if matches!(slots.get(self.topic), Some(Slot::Pending)) {
            slots.remove(self.topic);
        }
    }
}

/// Owns the bus subscriptions of the task service.
pub struct SubscriptionManager {
    config: SharedConfig,
    factory: Arc<dyn CommunicatorFactory>,
    handler: Arc<dyn MessageHandler>,
    subscriptions: Slots,
}

impl SubscriptionManager {
    pub fn new(
        config: SharedConfig,
        factory: Arc<dyn CommunicatorFactory>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            config,
            factory,
            handler,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Register the handler on `topic`.
    ///
    /// Subscribing to a topic that is already subscribed, or that another
    /// call is subscribing to right now, does nothing.
    ///
    /// # Errors
    ///
    /// `SubscribeError` when the topic is empty or the bus refuses the
    /// connection or registration. The error has already been logged.
    pub async fn subscribe(&self, topic: &str) -> Result<(), SubscribeError> {
        if topic.trim().is_empty() {
            error!("Refusing to subscribe to an empty topic name");
            return Err(SubscribeError::EmptyTopic);
        }
        let mut reservation = {
            let mut slots = self.subscriptions.lock();
            if slots.contains_key(topic) {
                debug!(topic = %topic, "Already subscribed");
                return Ok(());
            }
            slots.insert(topic.to_string(), Slot::Pending);
            Reservation {
                slots: &self.subscriptions,
                topic,
                armed: true,
            }
        };

        let (bus_type, config_path) = {
            let config = self.config.read();
            (
                config.message_bus.bus_type,
                config.message_bus.config_file_path.clone(),
            )
        };

        let communicator = self
            .factory
            .communicator(bus_type, &config_path, topic)
            .map_err(|source| {
                error!(
                    topic = %topic,
                    bus_type = %bus_type,
                    error = %source,
                    "Unable to connect to message bus"
                );
                SubscribeError::Bus {
                    topic: topic.to_string(),
                    source,
                }
            })?;

        let handle = communicator
            .accept(Arc::clone(&self.handler))
            .await
            .map_err(|source| {
                error!(topic = %topic, error = %source, "Unable to register task event consumer");
                SubscribeError::Bus {
                    topic: topic.to_string(),
                    source,
                }
            })?;

        let subscription = Subscription {
            communicator,
            handle,
        };
        let orphaned = {
            let mut slots = self.subscriptions.lock();
            if matches!(slots.get(topic), Some(Slot::Pending)) {
                slots.insert(topic.to_string(), Slot::Active(subscription));
                None
            } else {
                Some(subscription)
            }
        };
        reservation.armed = false;

        if let Some(subscription) = orphaned {
            // Closed while connecting.
            subscription.communicator.close().await;
            subscription.handle.shutdown().await;
            debug!(topic = %topic, "Manager closed during subscribe");
            return Ok(());
        }
        TASK_SUBSCRIPTIONS_ACTIVE.inc();

        info!(topic = %topic, bus_type = %bus_type, "Subscribed to task events");
        Ok(())
    }

    #[must_use]
    pub fn is_subscribed(&self, topic: &str) -> bool {
        matches!(self.subscriptions.lock().get(topic), Some(Slot::Active(_)))
    }

    /// Topics with a live subscription, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<_> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Active(_)))
            .map(|(topic, _)| topic.clone())
            .collect();
        topics.sort();
        topics
    }

    /// Close every subscription, letting queued messages finish first.
    pub async fn close(&self) {
        let subscriptions: Vec<_> = self
            .subscriptions
            .lock()
            .drain()
            .filter_map(|(topic, slot)| match slot {
                Slot::Active(subscription) => Some((topic, subscription)),
                Slot::Pending => None,
            })
            .collect();
        for (topic, subscription) in subscriptions {
            subscription.communicator.close().await;
            subscription.handle.shutdown().await;
            TASK_SUBSCRIPTIONS_ACTIVE.dec();
            info!(topic = %topic, "Task event subscription closed");
        }
    }
}
