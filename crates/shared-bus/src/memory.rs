//! # In-Memory Message Bus
//!
//! In-process implementation of the communicator seam, used by tests and by
//! single-node deployments. Kafka and Redis Streams clients plug in through
//! the same `CommunicatorFactory` trait.
//!
//! ## Delivery model
//!
//! Each `accept` gets its own bounded channel and one delivery task that
//! awaits the handler per message. `distribute` waits for room in every
//! subscriber channel, so a slow handler slows the publisher down instead of
//! losing messages.

use crate::communicator::{AcceptHandle, BusError, Communicator, CommunicatorFactory, MessageHandler};
use crate::message::{BusMessage, MessageBusType};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Clone)]
struct Subscriber {
    id: u64,
    sender: mpsc::Sender<BusMessage>,
}

/// Registered subscribers by topic.
#[derive(Default)]
struct TopicRegistry {
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl TopicRegistry {
    fn register(&self, topic: &str, sender: mpsc::Sender<BusMessage>) -> Result<u64, BusError> {
        let mut subs = self.subscribers.write().map_err(|_| BusError::Connection {
            topic: topic.to_string(),
            reason: "subscriber registry is poisoned".to_string(),
        })?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        subs.entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, sender });
        Ok(id)
    }

    fn release(&self, topic: &str, id: u64) {
        let Ok(mut subs) = self.subscribers.write() else {
            return;
        };
        let Some(list) = subs.get_mut(topic) else {
            return;
        };
        list.retain(|sub| sub.id != id);
        if list.is_empty() {
            subs.remove(topic);
        }
        debug!(topic = %topic, subscription = id, "Subscription released");
    }

    fn subscribers(&self, topic: &str) -> Vec<Subscriber> {
        self.subscribers
            .read()
            .ok()
            .and_then(|subs| subs.get(topic).cloned())
            .unwrap_or_default()
    }

    fn count(&self, topic: &str) -> usize {
        self.subscribers
            .read()
            .map(|subs| subs.get(topic).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

/// In-process message bus.
pub struct InMemoryMessageBus {
    registry: Arc<TopicRegistry>,

    /// Per-subscriber channel capacity.
    capacity: usize,

    /// Total messages distributed across all topics.
    messages_distributed: Arc<AtomicU64>,
}

impl InMemoryMessageBus {
    /// Create a bus with the default per-subscriber capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with a specific per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(TopicRegistry::default()),
            capacity: capacity.max(1),
            messages_distributed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open a communicator for `topic`.
    #[must_use]
    pub fn communicator_for(&self, topic: &str) -> Arc<InMemoryCommunicator> {
        Arc::new(InMemoryCommunicator {
            topic: topic.to_string(),
            registry: Arc::clone(&self.registry),
            capacity: self.capacity,
            closed: AtomicBool::new(false),
            accepted: Mutex::new(Vec::new()),
            distributed: Arc::clone(&self.messages_distributed),
        })
    }

    /// Number of live subscriptions on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry.count(topic)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn messages_distributed(&self) -> u64 {
        self.messages_distributed.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommunicatorFactory for InMemoryMessageBus {
    fn communicator(
        &self,
        bus_type: MessageBusType,
        _config_path: &Path,
        topic: &str,
    ) -> Result<Arc<dyn Communicator>, BusError> {
        if bus_type != MessageBusType::InMemory {
            return Err(BusError::UnsupportedBusType(bus_type));
        }
        if topic.trim().is_empty() {
            return Err(BusError::Connection {
                topic: topic.to_string(),
                reason: "topic name is empty".to_string(),
            });
        }
        Ok(self.communicator_for(topic))
    }
}

/// Communicator bound to one topic of an [`InMemoryMessageBus`].
pub struct InMemoryCommunicator {
    topic: String,
    registry: Arc<TopicRegistry>,
    capacity: usize,
    closed: AtomicBool,
    /// Subscriptions opened through this communicator, released on close.
    accepted: Mutex<Vec<u64>>,
    distributed: Arc<AtomicU64>,
}

impl InMemoryCommunicator {
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Communicator for InMemoryCommunicator {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn accept(&self, handler: Arc<dyn MessageHandler>) -> Result<AcceptHandle, BusError> {
        if self.is_closed() {
            return Err(BusError::Closed(self.topic.clone()));
        }

        let (sender, mut receiver) = mpsc::channel(self.capacity);
        let id = self.registry.register(&self.topic, sender)?;
        if let Ok(mut accepted) = self.accepted.lock() {
            accepted.push(id);
        }

        let topic = self.topic.clone();
        let task = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                handler.handle(message).await;
            }
            debug!(topic = %topic, subscription = id, "Delivery loop ended");
        });

        debug!(topic = %self.topic, subscription = id, "Handler registered");

        let registry = Arc::clone(&self.registry);
        let topic = self.topic.clone();
        Ok(AcceptHandle::new(self.topic.clone(), task, move || {
            registry.release(&topic, id);
        }))
    }

    async fn distribute(&self, message: BusMessage) -> Result<usize, BusError> {
        if self.is_closed() {
            return Err(BusError::Closed(self.topic.clone()));
        }

        self.distributed.fetch_add(1, Ordering::Relaxed);

        let subscribers = self.registry.subscribers(&self.topic);
        if subscribers.is_empty() {
            warn!(topic = %self.topic, "Message dropped (no subscribers)");
            return Ok(0);
        }

        let mut delivered = 0;
        for subscriber in subscribers {
            // Waits while the subscriber's channel is full.
            if subscriber.sender.send(message.clone()).await.is_ok() {
                delivered += 1;
            } else {
                debug!(
                    topic = %self.topic,
                    subscription = subscriber.id,
                    "Subscriber gone, releasing"
                );
                self.registry.release(&self.topic, subscriber.id);
            }
        }

        debug!(topic = %self.topic, receivers = delivered, "Message distributed");
        Ok(delivered)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let ids = self
            .accepted
            .lock()
            .map(|mut accepted| std::mem::take(&mut *accepted))
            .unwrap_or_default();
        for id in ids {
            self.registry.release(&self.topic, id);
        }
        debug!(topic = %self.topic, "Communicator closed");
    }
}
