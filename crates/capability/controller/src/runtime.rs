//! 控制器运行时：watch → 触发器 → 工作队列 → worker 池 → 调谐器。
//!
//! - 启动时先订阅 watch 再全量同步，保证不漏事件
//! - watch 落后（Lagged）时重新全量同步
//! - 每次调谐受超时与取消信号约束；中止的调谐按退避重入队

use crate::queue::WorkQueue;
use async_trait::async_trait;
use devlink_storage::{ResourceKind, ResourceStore, WatchEvent};
use domain::NamespacedName;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 调谐结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// 本轮完成，清零退避。
    Done,
    /// 按退避重入队。
    Requeue,
    /// 固定延迟后重入队。
    RequeueAfter(Duration),
}

/// 单个键的调谐逻辑。错误在内部转为 [`Action`]，不向运行时返回。
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn reconcile(&self, key: &NamespacedName) -> Action;
}

/// 把存储事件映射为需要调谐的 DeviceLink 键（谓词过滤也在这里完成）。
#[async_trait]
pub trait Trigger: Send + Sync {
    async fn keys_for(&self, event: &WatchEvent) -> Vec<NamespacedName>;
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub name: String,
    pub workers: usize,
    pub reconcile_timeout: Duration,
    pub requeue_base: Duration,
    pub requeue_max: Duration,
}

impl ControllerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workers: 1,
            reconcile_timeout: Duration::from_secs(30),
            requeue_base: Duration::from_millis(5),
            requeue_max: Duration::from_secs(60),
        }
    }
}

pub struct Controller {
    config: ControllerConfig,
    store: Arc<dyn ResourceStore>,
    reconciler: Arc<dyn Reconciler>,
    trigger: Arc<dyn Trigger>,
    queue: Arc<WorkQueue<NamespacedName>>,
}

impl Controller {
    pub fn new(
        config: ControllerConfig,
        store: Arc<dyn ResourceStore>,
        reconciler: Arc<dyn Reconciler>,
        trigger: Arc<dyn Trigger>,
    ) -> Self {
        let queue = Arc::new(WorkQueue::new(config.requeue_base, config.requeue_max));
        Self {
            config,
            store,
            reconciler,
            trigger,
            queue,
        }
    }

    /// 工作队列句柄，供外部事件源（如适配器注册表）直接入队。
    pub fn queue(&self) -> Arc<WorkQueue<NamespacedName>> {
        self.queue.clone()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// 运行直到取消。
    pub async fn run(self, cancel: CancellationToken) {
        let mut watch = self.store.watch();
        self.resync().await;

        let mut workers = JoinSet::new();
        for index in 0..self.config.workers.max(1) {
            workers.spawn(worker_loop(
                self.config.clone(),
                index,
                self.queue.clone(),
                self.reconciler.clone(),
                cancel.clone(),
            ));
        }
        info!(
            target: "devlink.runtime",
            controller = %self.config.name,
            workers = self.config.workers.max(1),
            "controller started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = watch.recv() => match received {
                    Ok(event) => self.dispatch(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            target: "devlink.runtime",
                            controller = %self.config.name,
                            skipped,
                            "watch lagged, resyncing"
                        );
                        self.resync().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        self.queue.shutdown();
        while workers.join_next().await.is_some() {}
        info!(target: "devlink.runtime", controller = %self.config.name, "controller stopped");
    }

    async fn dispatch(&self, event: &WatchEvent) {
        for key in self.trigger.keys_for(event).await {
            debug!(
                target: "devlink.runtime",
                controller = %self.config.name,
                link = %key,
                "enqueue"
            );
            self.queue.add(key);
        }
    }

    /// 以合成的 Added 事件重放全部 DeviceLink。
    async fn resync(&self) {
        match self.store.list(&ResourceKind::DeviceLink).await {
            Ok(objects) => {
                for object in objects {
                    self.dispatch(&WatchEvent::synthetic(object)).await;
                }
            }
            Err(err) => {
                warn!(
                    target: "devlink.runtime",
                    controller = %self.config.name,
                    error = %err,
                    "resync list failed"
                );
            }
        }
    }
}

async fn worker_loop(
    config: ControllerConfig,
    index: usize,
    queue: Arc<WorkQueue<NamespacedName>>,
    reconciler: Arc<dyn Reconciler>,
    cancel: CancellationToken,
) {
    while let Some(key) = queue.get().await {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            result = tokio::time::timeout(config.reconcile_timeout, reconciler.reconcile(&key)) => Some(result),
        };
        match outcome {
            Some(Ok(Action::Done)) => queue.forget(&key),
            Some(Ok(Action::Requeue)) => queue.add_rate_limited(key.clone()),
            Some(Ok(Action::RequeueAfter(delay))) => {
                queue.forget(&key);
                queue.add_after(key.clone(), delay);
            }
            Some(Err(_)) => {
                warn!(
                    target: "devlink.runtime",
                    controller = %config.name,
                    worker = index,
                    link = %key,
                    timeout_ms = config.reconcile_timeout.as_millis() as u64,
                    "reconcile timed out"
                );
                queue.add_rate_limited(key.clone());
            }
            None => {
                queue.done(&key);
                break;
            }
        }
        queue.done(&key);
    }
}
