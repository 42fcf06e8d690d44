//! Shared fixtures for the end-to-end engine tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use cutover_broker::InProcessBroker;
use cutover_config::{BrokerConfig, LoggingConfig, MigrationConfig};
use cutover_core::{LegacyKey, MappingRecord, RunId, TargetKey};
use cutover_interfaces::{
    CapturingRecorder, DomainAdapter, LegacyError, MappingOutcome, MappingStore, Page,
    ReconcileSupport, StoreError, TargetError, TransformError,
};
use cutover_mapping::InMemoryMappingStore;
use cutover_migration::MigrationService;
use cutover_storage::InMemoryRunRepository;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let config = LoggingConfig::default();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(config.env_filter()))
            .with_test_writer()
            .try_init();
    });
}

/// Legacy + Target stand-in with scripted data and failure injection
pub struct ScriptedAdapter {
    entities: Mutex<HashMap<LegacyKey, JsonValue>>,
    pub created: Mutex<Vec<(TargetKey, JsonValue)>>,
    pub updated: Mutex<Vec<(TargetKey, JsonValue)>>,
    pub deleted: Mutex<Vec<TargetKey>>,
    pub fetches: AtomicU32,
    /// Remaining create_target calls that fail with a transient error
    pub create_failures: AtomicU32,
    /// Keys whose transform fails hard
    pub untransformable: Mutex<Vec<LegacyKey>>,
    next_target_id: AtomicU32,
}

impl ScriptedAdapter {
    pub fn new(entities: &[(&str, JsonValue)]) -> Self {
        Self {
            entities: Mutex::new(
                entities
                    .iter()
                    .map(|(key, value)| (LegacyKey::new(*key), value.clone()))
                    .collect(),
            ),
            created: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            fetches: AtomicU32::new(0),
            create_failures: AtomicU32::new(0),
            untransformable: Mutex::new(Vec::new()),
            next_target_id: AtomicU32::new(1),
        }
    }

    pub fn fail_transform(&self, key: &str) {
        self.untransformable.lock().unwrap().push(LegacyKey::new(key));
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn updated_count(&self) -> usize {
        self.updated.lock().unwrap().len()
    }

    pub fn remove_entity(&self, key: &str) {
        self.entities.lock().unwrap().remove(&LegacyKey::new(key));
    }

    fn sorted_keys(&self) -> Vec<LegacyKey> {
        let mut keys: Vec<LegacyKey> = self.entities.lock().unwrap().keys().cloned().collect();
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        keys
    }
}

#[async_trait]
impl DomainAdapter for ScriptedAdapter {
    fn domain(&self) -> &str {
        "alerts"
    }

    async fn ids(
        &self,
        _filter: &JsonValue,
        page_number: u32,
        page_size: u32,
    ) -> Result<Page<LegacyKey>, LegacyError> {
        let keys = self.sorted_keys();
        let start = (page_number as usize) * (page_size as usize);
        let items = keys
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();
        Ok(Page::new(items, page_number))
    }

    async fn estimated_count(&self, _filter: &JsonValue) -> Result<u64, LegacyError> {
        Ok(self.entities.lock().unwrap().len() as u64)
    }

    async fn fetch(&self, key: &LegacyKey) -> Result<Option<JsonValue>, LegacyError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.entities.lock().unwrap().get(key).cloned())
    }

    fn transform(&self, key: &LegacyKey, legacy: JsonValue) -> Result<JsonValue, TransformError> {
        if self.untransformable.lock().unwrap().contains(key) {
            return Err(TransformError {
                key: key.to_string(),
                message: "injected transform failure".to_string(),
            });
        }
        Ok(serde_json::json!({"key": key.as_str(), "entity": legacy}))
    }

    async fn create_target(&self, entity: &JsonValue) -> Result<TargetKey, TargetError> {
        if self.create_failures.load(Ordering::SeqCst) > 0 {
            self.create_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(TargetError::Connection("injected outage".to_string()));
        }
        let id = self.next_target_id.fetch_add(1, Ordering::SeqCst);
        let target_key = TargetKey::new(format!("t-{}", id));
        self.created.lock().unwrap().push((target_key.clone(), entity.clone()));
        Ok(target_key)
    }

    async fn update_target(&self, key: &TargetKey, entity: &JsonValue) -> Result<(), TargetError> {
        self.updated.lock().unwrap().push((key.clone(), entity.clone()));
        Ok(())
    }

    async fn delete_target(&self, key: &TargetKey) -> Result<(), TargetError> {
        self.deleted.lock().unwrap().push(key.clone());
        Ok(())
    }
}

/// Mapping store decorator with injectable faults
pub struct FlakyMappingStore {
    pub inner: Arc<InMemoryMappingStore>,
    /// Remaining create_mapping calls that fail with a 503
    pub create_failures: AtomicU32,
    /// Keys whose lookups report "not found" (stale-read simulation)
    pub hidden_keys: Mutex<Vec<LegacyKey>>,
}

impl FlakyMappingStore {
    pub fn new(inner: Arc<InMemoryMappingStore>) -> Self {
        Self {
            inner,
            create_failures: AtomicU32::new(0),
            hidden_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn hide(&self, key: &str) {
        self.hidden_keys.lock().unwrap().push(LegacyKey::new(key));
    }
}

#[async_trait]
impl MappingStore for FlakyMappingStore {
    async fn create_mapping(&self, record: MappingRecord) -> Result<MappingOutcome, StoreError> {
        if self.create_failures.load(Ordering::SeqCst) > 0 {
            self.create_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::Upstream {
                status: 503,
                message: "injected outage".to_string(),
            });
        }
        self.inner.create_mapping(record).await
    }

    async fn find_by_legacy_key(
        &self,
        domain: &str,
        key: &LegacyKey,
    ) -> Result<Option<MappingRecord>, StoreError> {
        if self.hidden_keys.lock().unwrap().contains(key) {
            return Ok(None);
        }
        self.inner.find_by_legacy_key(domain, key).await
    }

    async fn count_by_label(&self, label: RunId) -> Result<u64, StoreError> {
        self.inner.count_by_label(label).await
    }

    async fn delete_by_legacy_key(&self, domain: &str, key: &LegacyKey) -> Result<(), StoreError> {
        self.inner.delete_by_legacy_key(domain, key).await
    }
}

/// Reconcile support stand-in with scripted person views
pub struct ScriptedSupport {
    views: Mutex<HashMap<LegacyKey, JsonValue>>,
    pub pushed: Mutex<Vec<(LegacyKey, JsonValue)>>,
    pub synced_back: Mutex<Vec<(LegacyKey, JsonValue)>>,
    pub merges: Mutex<Vec<(LegacyKey, LegacyKey)>>,
    pub fail_merges: AtomicU32,
}

impl ScriptedSupport {
    pub fn new(views: &[(&str, JsonValue)]) -> Self {
        Self {
            views: Mutex::new(
                views
                    .iter()
                    .map(|(key, value)| (LegacyKey::new(*key), value.clone()))
                    .collect(),
            ),
            pushed: Mutex::new(Vec::new()),
            synced_back: Mutex::new(Vec::new()),
            merges: Mutex::new(Vec::new()),
            fail_merges: AtomicU32::new(0),
        }
    }

    pub fn pushed_for(&self, key: &str) -> usize {
        let key = LegacyKey::new(key);
        self.pushed.lock().unwrap().iter().filter(|(k, _)| *k == key).count()
    }
}

#[async_trait]
impl ReconcileSupport for ScriptedSupport {
    async fn merge_target(
        &self,
        losing: &LegacyKey,
        surviving: &LegacyKey,
    ) -> Result<(), TargetError> {
        if self.fail_merges.load(Ordering::SeqCst) > 0 {
            self.fail_merges.fetch_sub(1, Ordering::SeqCst);
            return Err(TargetError::Upstream {
                status: 502,
                message: "injected outage".to_string(),
            });
        }
        self.merges.lock().unwrap().push((losing.clone(), surviving.clone()));
        Ok(())
    }

    async fn latest_view(&self, person: &LegacyKey) -> Result<Option<JsonValue>, LegacyError> {
        Ok(self.views.lock().unwrap().get(person).cloned())
    }

    async fn push_view(&self, person: &LegacyKey, view: &JsonValue) -> Result<(), TargetError> {
        self.pushed.lock().unwrap().push((person.clone(), view.clone()));
        Ok(())
    }

    async fn sync_back(&self, person: &LegacyKey, view: &JsonValue) -> Result<(), LegacyError> {
        self.synced_back.lock().unwrap().push((person.clone(), view.clone()));
        Ok(())
    }
}

/// A fully wired migration engine over in-memory collaborators
pub struct Harness {
    pub adapter: Arc<ScriptedAdapter>,
    pub runs: Arc<InMemoryRunRepository>,
    pub store: Arc<InMemoryMappingStore>,
    pub mappings: Arc<FlakyMappingStore>,
    pub broker: Arc<InProcessBroker>,
    pub recorder: Arc<CapturingRecorder>,
    pub service: MigrationService,
}

impl Harness {
    pub fn new(entities: &[(&str, JsonValue)]) -> Self {
        init_tracing();

        let adapter = Arc::new(ScriptedAdapter::new(entities));
        let runs = Arc::new(InMemoryRunRepository::new());
        let store = Arc::new(InMemoryMappingStore::new());
        let mappings = Arc::new(FlakyMappingStore::new(store.clone()));
        let broker = Arc::new(InProcessBroker::new(&BrokerConfig {
            max_receive_count: 3,
            redelivery_initial_delay: std::time::Duration::ZERO,
            ..BrokerConfig::default()
        }));
        let recorder = Arc::new(CapturingRecorder::new());

        // Page size of one exercises next-page chaining on every run
        let config = MigrationConfig {
            page_size: 1,
            complete_check_delay: std::time::Duration::from_millis(100),
            complete_check_retry: std::time::Duration::from_millis(50),
            complete_check_count: 3,
            ..MigrationConfig::default()
        };

        let service = MigrationService::new(
            adapter.clone(),
            runs.clone(),
            mappings.clone(),
            broker.clone(),
            recorder.clone(),
            config,
        );

        Self {
            adapter,
            runs,
            store,
            mappings,
            broker,
            recorder,
            service,
        }
    }

    /// Process every queued message serially
    pub async fn drain(&self) -> usize {
        let worker = self.service.worker();
        self.broker.drain(self.service.queue(), worker.as_ref()).await
    }

    /// Wait (in paused test time) for the run to reach a terminal status
    pub async fn wait_terminal(&self, run_id: RunId) -> cutover_core::MigrationRun {
        for _ in 0..500 {
            let run = self.service.get_run(run_id).await.unwrap();
            if run.is_terminal() {
                return run;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("run never reached a terminal status");
    }
}
