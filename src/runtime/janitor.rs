//! 后台清扫任务
//!
//! 按固定周期清除过期文件，并回收长期空闲的限流记录。
//! 与请求流量无关：即使没有任何下载，过期对象也会被回收。

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::cache::RateLimiter;
use crate::storage::{ObjectStore, SweepReport};

/// 清扫任务句柄，随服务生命周期启动和停止
pub struct JanitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JanitorHandle {
    /// 通知任务退出并等待其结束
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(target: "janitor", %e, "janitor task ended abnormally");
        }
    }
}

/// 启动清扫任务
pub fn spawn_janitor(
    store: Arc<ObjectStore>,
    limiter: Arc<RateLimiter>,
    period: Duration,
) -> JanitorHandle {
    let (shutdown, mut stop) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!(
            target: "janitor",
            interval_secs = period.as_secs(),
            "starting janitor background task"
        );

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_cycle(&store, &limiter).await;
                }
                _ = stop.changed() => break,
            }
        }

        info!(target: "janitor", "janitor stopped");
    });

    JanitorHandle { shutdown, task }
}

/// 执行一轮清扫
pub async fn run_cycle(store: &ObjectStore, limiter: &RateLimiter) -> SweepReport {
    let report = store.sweep(Utc::now()).await;
    let pruned_clients = limiter.prune_idle(Instant::now());

    if report.removed > 0 || report.failed > 0 {
        info!(
            target: "janitor",
            removed = report.removed,
            missing_on_disk = report.missing_on_disk,
            failed = report.failed,
            "expired files swept"
        );
    } else {
        debug!(target: "janitor", "no expired files in this cycle");
    }

    if pruned_clients > 0 {
        debug!(target: "janitor", pruned_clients, "pruned idle rate-limit entries");
    }

    report
}
