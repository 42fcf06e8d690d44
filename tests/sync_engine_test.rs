//! End-to-end tests for the live synchronisation router and handler

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{init_tracing, FlakyMappingStore, ScriptedAdapter, ScriptedSupport};

use cutover_broker::{InProcessBroker, RetryDispatcher};
use cutover_config::{BrokerConfig, SyncConfig};
use cutover_core::{ChangeEvent, ChangeEventType, LegacyKey, MappingRecord, MappingType, TargetKey};
use cutover_interfaces::CapturingRecorder;
use cutover_mapping::InMemoryMappingStore;
use cutover_sync::{FeatureSwitches, Reconciler, SyncEventRouter, SyncHandler, SyncMessage};

const QUEUE: &str = "sync-alerts";
const WRITER: &str = "CUTOVER_SYNC";

struct SyncHarness {
    adapter: Arc<ScriptedAdapter>,
    store: Arc<InMemoryMappingStore>,
    mappings: Arc<FlakyMappingStore>,
    broker: Arc<InProcessBroker>,
    recorder: Arc<CapturingRecorder>,
    router: SyncEventRouter,
}

impl SyncHarness {
    fn new(entities: &[(&str, serde_json::Value)], config: SyncConfig) -> Self {
        init_tracing();

        let adapter = Arc::new(ScriptedAdapter::new(entities));
        let store = Arc::new(InMemoryMappingStore::new());
        let mappings = Arc::new(FlakyMappingStore::new(store.clone()));
        let broker = Arc::new(InProcessBroker::new(&BrokerConfig {
            max_receive_count: 3,
            redelivery_initial_delay: std::time::Duration::ZERO,
            ..BrokerConfig::default()
        }));
        let recorder = Arc::new(CapturingRecorder::new());

        let handler = Arc::new(SyncHandler::new(
            adapter.clone(),
            mappings.clone(),
            RetryDispatcher::new(broker.clone(), QUEUE),
            recorder.clone(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            "alerts",
            Arc::new(ScriptedSupport::new(&[])),
            recorder.clone(),
        ));
        let router = SyncEventRouter::new(
            "alerts",
            handler,
            reconciler,
            FeatureSwitches::from_config(&config),
            config.writer_identity.clone(),
        );

        Self {
            adapter,
            store,
            mappings,
            broker,
            recorder,
            router,
        }
    }

    async fn deliver(&self, event: ChangeEvent) {
        self.broker
            .publish(QUEUE, &SyncMessage::Notification { event })
            .await
            .unwrap();
        self.broker.drain(QUEUE, &self.router).await;
    }
}

fn live_event(event_type: ChangeEventType, key: &str) -> ChangeEvent {
    ChangeEvent::new(event_type, "alerts", "OMS_OWNER", serde_json::json!({"key": key}))
}

#[tokio::test]
async fn test_insert_creates_target_and_mapping() {
    let harness = SyncHarness::new(
        &[("a1", serde_json::json!({"text": "fresh"}))],
        SyncConfig::default(),
    );

    harness.deliver(live_event(ChangeEventType::Inserted, "a1")).await;

    assert_eq!(harness.adapter.created_count(), 1);
    let records = harness.store.all().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].mapping_type, MappingType::LegacyCreated);
    // Sync-created mappings carry no run label
    assert_eq!(records[0].label, None);
}

#[tokio::test]
async fn test_update_of_mapped_record_has_no_mapping_churn() {
    let harness = SyncHarness::new(
        &[("a1", serde_json::json!({"text": "changed"}))],
        SyncConfig::default(),
    );
    harness
        .store
        .seed(MappingRecord::new(
            "alerts",
            LegacyKey::new("a1"),
            TargetKey::new("t-existing"),
            MappingType::Migrated,
        ))
        .await;

    harness.deliver(live_event(ChangeEventType::Updated, "a1")).await;

    assert_eq!(harness.adapter.created_count(), 0);
    assert_eq!(harness.adapter.updated_count(), 1);
    let (target, _) = harness.adapter.updated.lock().unwrap()[0].clone();
    assert_eq!(target, TargetKey::new("t-existing"));
    assert_eq!(harness.store.len().await, 1);
}

#[tokio::test]
async fn test_self_write_produces_zero_target_calls() {
    let harness = SyncHarness::new(
        &[("a1", serde_json::json!({"text": "echo"}))],
        SyncConfig::default(),
    );

    let mut event = live_event(ChangeEventType::Updated, "a1");
    event.audit_originator = WRITER.to_string();
    harness.deliver(event).await;

    assert_eq!(harness.adapter.fetches.load(Ordering::SeqCst), 0);
    assert_eq!(harness.adapter.created_count(), 0);
    assert_eq!(harness.adapter.updated_count(), 0);
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn test_disabled_event_is_dropped_not_queued() {
    let harness = SyncHarness::new(
        &[("a1", serde_json::json!({"text": "gated"}))],
        SyncConfig {
            disabled_events: vec!["alerts.updated".to_string()],
            ..SyncConfig::default()
        },
    );

    harness.deliver(live_event(ChangeEventType::Updated, "a1")).await;

    assert_eq!(harness.adapter.created_count(), 0);
    assert!(harness.broker.is_idle(QUEUE).await);
    assert_eq!(harness.broker.dead_letter_count(QUEUE).await, 0);
}

#[tokio::test]
async fn test_detail_added_follows_the_upsert_path() {
    let harness = SyncHarness::new(
        &[("a1", serde_json::json!({"text": "parent", "details": [1]}))],
        SyncConfig::default(),
    );

    harness.deliver(live_event(ChangeEventType::DetailAdded, "a1")).await;

    assert_eq!(harness.adapter.created_count(), 1);
    assert_eq!(harness.store.len().await, 1);
}

#[tokio::test]
async fn test_delete_removes_target_entity_and_mapping() {
    let harness = SyncHarness::new(&[], SyncConfig::default());
    harness
        .store
        .seed(MappingRecord::new(
            "alerts",
            LegacyKey::new("a1"),
            TargetKey::new("t-1"),
            MappingType::LegacyCreated,
        ))
        .await;

    harness.deliver(live_event(ChangeEventType::Deleted, "a1")).await;

    assert_eq!(harness.adapter.deleted.lock().unwrap().len(), 1);
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn test_mapping_outage_retries_through_the_queue() {
    let harness = SyncHarness::new(
        &[("a1", serde_json::json!({"text": "fresh"}))],
        SyncConfig::default(),
    );
    harness.mappings.create_failures.store(1, Ordering::SeqCst);

    harness.deliver(live_event(ChangeEventType::Inserted, "a1")).await;

    // One target entity, and the retried mapping matches it
    assert_eq!(harness.adapter.created_count(), 1);
    let records = harness.store.all().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target_key, TargetKey::new("t-1"));
    assert_eq!(records[0].mapping_type, MappingType::LegacyCreated);
    assert!(harness.broker.is_idle(QUEUE).await);
}

#[tokio::test]
async fn test_duplicate_sync_mapping_is_recorded_not_failed() {
    let harness = SyncHarness::new(
        &[("a1", serde_json::json!({"text": "raced"}))],
        SyncConfig::default(),
    );
    // Another writer correlated this record between our lookup and create
    harness
        .store
        .seed(MappingRecord::new(
            "alerts",
            LegacyKey::new("a1"),
            TargetKey::new("t-winner"),
            MappingType::TargetCreated,
        ))
        .await;
    harness.mappings.hide("a1");

    harness.deliver(live_event(ChangeEventType::Inserted, "a1")).await;

    let names = harness.recorder.event_names();
    assert!(names.contains(&"alerts-sync-duplicate".to_string()));
    assert_eq!(harness.broker.dead_letter_count(QUEUE).await, 0);

    // The winner keeps the correlation
    let records = harness.store.all().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target_key, TargetKey::new("t-winner"));
}

#[tokio::test]
async fn test_vanished_record_is_absorbed() {
    let harness = SyncHarness::new(&[], SyncConfig::default());

    harness.deliver(live_event(ChangeEventType::Updated, "a1")).await;

    assert_eq!(harness.adapter.created_count(), 0);
    assert!(harness.broker.is_idle(QUEUE).await);
    assert_eq!(harness.broker.dead_letter_count(QUEUE).await, 0);
}
