#![allow(dead_code)]

use async_trait::async_trait;
use devlink_connection::{Connection, ConnectionError, ConnectionManager, Dialer};
use devlink_controller::{Action, ClusterValidator, NodeBinder, Reconciler};
use devlink_storage::{
    InMemoryStore, Object, ResourceKind, ResourceStore, StorageError, StoreExt, WatchEvent,
};
use devlink_telemetry::{LimbMetrics, RecentEvents};
use domain::{
    AdaptorRef, Device, DeviceLink, DeviceLinkSpec, DeviceType, ModelRef, ModelSchema,
    ModelVersion, NamespacedName, Node, ReferenceData,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub const NODE: &str = "edge-1";
pub const ADAPTOR: &str = "dummy";
pub const NAMESPACE: &str = "default";

pub fn model() -> ModelRef {
    ModelRef::new("devices.example.io", "v1", "DummyDevice")
}

pub fn link(name: &str) -> DeviceLink {
    DeviceLink::new(
        NAMESPACE,
        name,
        DeviceLinkSpec {
            adaptor: AdaptorRef {
                node: NODE.to_string(),
                name: ADAPTOR.to_string(),
            },
            model: model(),
            ..DeviceLinkSpec::default()
        },
    )
}

pub fn key(name: &str) -> NamespacedName {
    NamespacedName::new(NAMESPACE, name)
}

pub fn served(version: &str) -> ModelVersion {
    ModelVersion {
        name: version.to_string(),
        served: true,
        storage: true,
    }
}

/// 注入故障的存储包装。
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryStore,
    pub fail_status_updates: AtomicBool,
    pub fail_node_reads: AtomicBool,
    pub reject_device_updates: AtomicBool,
}

fn injected() -> StorageError {
    StorageError::Unavailable("injected failure".to_string())
}

#[async_trait]
impl ResourceStore for FaultyStore {
    async fn get(&self, kind: &ResourceKind, key: &NamespacedName) -> Result<Object, StorageError> {
        if *kind == ResourceKind::Node && self.fail_node_reads.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.get(kind, key).await
    }

    async fn list(&self, kind: &ResourceKind) -> Result<Vec<Object>, StorageError> {
        self.inner.list(kind).await
    }

    async fn create(&self, object: Object) -> Result<Object, StorageError> {
        self.inner.create(object).await
    }

    async fn update(&self, object: Object) -> Result<Object, StorageError> {
        if matches!(object, Object::Device(_)) && self.reject_device_updates.load(Ordering::SeqCst)
        {
            return Err(StorageError::invalid(
                &object.kind(),
                &object.key(),
                "spec.rate must be below 10",
            ));
        }
        self.inner.update(object).await
    }

    async fn update_status(&self, object: Object) -> Result<Object, StorageError> {
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.update_status(object).await
    }

    async fn delete(&self, kind: &ResourceKind, key: &NamespacedName) -> Result<(), StorageError> {
        self.inner.delete(kind, key).await
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.inner.watch()
    }
}

/// 记录发送内容的拨号器。
#[derive(Default)]
pub struct Recorder {
    pub sends: Mutex<Vec<(NamespacedName, serde_json::Value, ReferenceData)>>,
    pub closes: AtomicUsize,
    pub fail_send: AtomicBool,
}

impl Recorder {
    pub fn send_count(&self) -> usize {
        self.sends.lock().expect("lock").len()
    }

    pub fn last_device(&self) -> serde_json::Value {
        self.sends
            .lock()
            .expect("lock")
            .last()
            .map(|(_, device, _)| device.clone())
            .expect("at least one send")
    }
}

pub struct RecordingDialer(pub Arc<Recorder>);

struct RecordingConnection {
    key: NamespacedName,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl Dialer for RecordingDialer {
    async fn dial(&self, key: &NamespacedName) -> Result<Arc<dyn Connection>, ConnectionError> {
        Ok(Arc::new(RecordingConnection {
            key: key.clone(),
            recorder: self.0.clone(),
        }))
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn send(
        &self,
        _model: &ModelRef,
        device: &[u8],
        references: &ReferenceData,
    ) -> Result<(), ConnectionError> {
        if self.recorder.fail_send.load(Ordering::SeqCst) {
            return Err(ConnectionError::Send("device unreachable".to_string()));
        }
        let device = serde_json::from_slice(device).expect("device json");
        self.recorder
            .sends
            .lock()
            .expect("lock")
            .push((self.key.clone(), device, references.clone()));
        Ok(())
    }

    async fn close(&self) {
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// 两个调谐循环共享同一个存储，按测试需要手动驱动。
pub struct Harness {
    pub store: Arc<FaultyStore>,
    pub connections: Arc<ConnectionManager>,
    pub metrics: Arc<LimbMetrics>,
    pub events: Arc<RecentEvents>,
    pub recorder: Arc<Recorder>,
    pub validator: ClusterValidator,
    pub binder: NodeBinder,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(FaultyStore::default());
        let dyn_store: Arc<dyn ResourceStore> = store.clone();
        let metrics = Arc::new(LimbMetrics::new());
        let connections = Arc::new(ConnectionManager::new(metrics.clone()));
        let recorder = Arc::new(Recorder::default());
        connections
            .register_adaptor(ADAPTOR, Arc::new(RecordingDialer(recorder.clone())))
            .await;
        let events = Arc::new(RecentEvents::new(32));
        let validator = ClusterValidator::new(dyn_store.clone());
        let binder = NodeBinder::new(
            NODE,
            dyn_store,
            connections.clone(),
            events.clone(),
            Duration::from_secs(10),
        );
        Self {
            store,
            connections,
            metrics,
            events,
            recorder,
            validator,
            binder,
        }
    }

    /// 节点与服务 v1 的模型 schema。
    pub async fn with_cluster() -> Self {
        let harness = Self::new().await;
        harness.add_node(NODE).await;
        harness
            .store
            .create_as(ModelSchema::for_model(&model(), vec![served("v1")]))
            .await
            .expect("schema");
        harness
    }

    pub async fn add_node(&self, name: &str) {
        self.store.create_as(Node::new(name)).await.expect("node");
    }

    pub async fn create_link(&self, link: DeviceLink) -> DeviceLink {
        self.store.create_as(link).await.expect("create link")
    }

    pub async fn link(&self, name: &str) -> DeviceLink {
        self.store
            .get_as(&ResourceKind::DeviceLink, &key(name))
            .await
            .expect("link")
    }

    pub async fn device(&self, name: &str) -> Option<Device> {
        self.store
            .get_as(&ResourceKind::Device(DeviceType::of_model(&model())), &key(name))
            .await
            .ok()
    }

    pub async fn brain(&self, name: &str) -> Action {
        self.validator.reconcile(&key(name)).await
    }

    pub async fn limb(&self, name: &str) -> Action {
        self.binder.reconcile(&key(name)).await
    }

    /// brain 一轮，limb 两轮（第一轮只加 finalizer）。
    pub async fn converge(&self, name: &str) -> Action {
        assert_eq!(self.brain(name).await, Action::Done);
        assert_eq!(self.limb(name).await, Action::Done);
        self.limb(name).await
    }
}
