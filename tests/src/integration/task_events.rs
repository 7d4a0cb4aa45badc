//! # Task Event Flow
//!
//! Drives svc-task end to end over the in-memory bus:
//!
//! ```text
//! publisher ──distribute──→ InMemoryMessageBus ──→ TaskEventConsumer
//!                                                        │ decode
//!                                                        ▼
//!                                                  dispatch queue ──→ workers ──→ processor
//! ```

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use shared_bus::{BusMessage, Communicator, InMemoryMessageBus, MessageBusType};
    use shared_types::{Events, TaskEvent};
    use svc_task::config::{MessageBusConf, ServiceConfig, SharedConfig};
    use svc_task::{
        bounded, spawn_workers, DecodeError, DropObserver, DropStage, ProcessError,
        SubscriptionManager, TaskEventConsumer, TaskEventProcessor,
    };

    const TOPIC: &str = "odim-task-events";

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    /// Forwards processed events to the test, optionally slowly.
    struct ForwardingProcessor {
        delay: Duration,
        events: mpsc::UnboundedSender<TaskEvent>,
    }

    #[async_trait]
    impl TaskEventProcessor for ForwardingProcessor {
        async fn process(&self, event: TaskEvent) -> Result<(), ProcessError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.events
                .send(event)
                .map_err(|e| ProcessError(e.to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        stages: Mutex<Vec<DropStage>>,
    }

    impl DropObserver for RecordingObserver {
        fn on_drop(&self, stage: DropStage, _error: &DecodeError) {
            self.stages.lock().push(stage);
        }
    }

    struct Pipeline {
        bus: Arc<InMemoryMessageBus>,
        publisher: Arc<dyn Communicator>,
        manager: SubscriptionManager,
        observer: Arc<RecordingObserver>,
        processed: mpsc::UnboundedReceiver<TaskEvent>,
        workers: Vec<tokio::task::JoinHandle<u64>>,
    }

    async fn start_pipeline(queue_size: usize, workers: usize, delay: Duration) -> Pipeline {
        let config = SharedConfig::new(ServiceConfig {
            message_bus: MessageBusConf {
                bus_type: MessageBusType::InMemory,
                task_events_topic: TOPIC.to_string(),
                ..MessageBusConf::default()
            },
            ..ServiceConfig::default()
        });

        let bus = Arc::new(InMemoryMessageBus::with_capacity(1));
        let observer = Arc::new(RecordingObserver::default());
        let (sender, receiver) = bounded(queue_size);
        let consumer = Arc::new(TaskEventConsumer::new(sender, observer.clone()));

        let manager = SubscriptionManager::new(config, bus.clone(), consumer);
        manager.subscribe(TOPIC).await.unwrap();

        let (events, processed) = mpsc::unbounded_channel();
        let workers = spawn_workers(
            workers,
            Arc::new(receiver),
            Arc::new(ForwardingProcessor { delay, events }),
        );

        Pipeline {
            publisher: bus.communicator_for(TOPIC),
            bus,
            manager,
            observer,
            processed,
            workers,
        }
    }

    fn task_message(task_id: &str, status: &str) -> BusMessage {
        let events = Events::wrap(&TaskEvent::new(task_id, status)).unwrap();
        BusMessage::json(&events).unwrap()
    }

    async fn next_processed(pipeline: &mut Pipeline) -> TaskEvent {
        timeout(Duration::from_secs(2), pipeline.processed.recv())
            .await
            .expect("timed out waiting for a processed event")
            .expect("processor channel closed")
    }

    // =========================================================================
    // INTEGRATION TESTS
    // =========================================================================

    #[tokio::test]
    async fn test_well_formed_event_is_processed_once() {
        let mut pipeline = start_pipeline(8, 2, Duration::ZERO).await;

        pipeline
            .publisher
            .distribute(BusMessage::Value(json!({
                "Request": "{\"TaskID\":\"T1\",\"Status\":\"Completed\"}"
            })))
            .await
            .unwrap();

        let event = next_processed(&mut pipeline).await;
        assert_eq!(event.task_id, "T1");
        assert_eq!(event.status, "Completed");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(pipeline.processed.try_recv().is_err());
        assert!(pipeline.observer.stages.lock().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_events_never_reach_workers() {
        let mut pipeline = start_pipeline(8, 1, Duration::ZERO).await;

        pipeline
            .publisher
            .distribute(BusMessage::Value(json!({ "Request": "not-json" })))
            .await
            .unwrap();
        pipeline
            .publisher
            .distribute(BusMessage::Bytes(b"\x00\x01".to_vec()))
            .await
            .unwrap();
        // A valid event afterwards proves the subscription survived.
        pipeline
            .publisher
            .distribute(task_message("T2", "Running"))
            .await
            .unwrap();

        assert_eq!(next_processed(&mut pipeline).await.task_id, "T2");
        assert_eq!(
            *pipeline.observer.stages.lock(),
            vec![DropStage::Inner, DropStage::Outer]
        );
    }

    #[tokio::test]
    async fn test_backpressure_keeps_every_event_in_order() {
        let mut pipeline = start_pipeline(1, 1, Duration::from_millis(2)).await;

        let publisher = Arc::clone(&pipeline.publisher);
        let producer = tokio::spawn(async move {
            for n in 0..40 {
                publisher
                    .distribute(task_message(&format!("T{n}"), "Running"))
                    .await
                    .unwrap();
            }
        });

        for n in 0..40 {
            assert_eq!(next_processed(&mut pipeline).await.task_id, format!("T{n}"));
        }
        timeout(Duration::from_secs(2), producer)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_and_stops_workers() {
        let mut pipeline = start_pipeline(16, 3, Duration::ZERO).await;

        for n in 0..12 {
            pipeline
                .publisher
                .distribute(task_message(&format!("T{n}"), "Completed"))
                .await
                .unwrap();
        }
        for _ in 0..12 {
            next_processed(&mut pipeline).await;
        }

        pipeline.manager.close().await;
        assert_eq!(pipeline.bus.subscriber_count(TOPIC), 0);
        drop(pipeline.manager);

        let mut handled = 0;
        for worker in pipeline.workers {
            handled += timeout(Duration::from_secs(2), worker)
                .await
                .expect("worker did not stop")
                .unwrap();
        }
        assert_eq!(handled, 12);
    }

    #[tokio::test]
    async fn test_subscribes_to_topic_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "MessageBusConf": {
                    "MessageBusType": "InMemory",
                    "OdimTaskEventsQueue": "tasks-from-file"
                },
                "TaskQueueConf": { "QueueSize": 4, "Workers": 1 }
            }"#,
        )
        .unwrap();

        let config = ServiceConfig::load(file.path()).unwrap();
        let topic = config.message_bus.task_events_topic.clone();
        let bus = Arc::new(InMemoryMessageBus::new());
        let (sender, receiver) = bounded(config.task_queue.queue_size);
        let manager = SubscriptionManager::new(
            SharedConfig::new(config),
            bus.clone(),
            Arc::new(TaskEventConsumer::new(
                sender,
                Arc::new(RecordingObserver::default()),
            )),
        );

        manager.subscribe(&topic).await.unwrap();
        bus.communicator_for("tasks-from-file")
            .distribute(task_message("T5", "OK"))
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.task_id, "T5");
    }
}
