use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::RateLimiter;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::runtime::janitor::{JanitorHandle, spawn_janitor};
use crate::storage::ObjectStore;

pub struct StartupContext {
    pub store: Arc<ObjectStore>,
    pub limiter: Arc<RateLimiter>,
    pub janitor: JanitorHandle,
}

/// 准备服务器启动的上下文
/// 包括文件存储、限流器和后台清扫任务
pub async fn prepare_server_startup(config: &AppConfig) -> Result<StartupContext> {
    let settings = config.store_settings();
    debug!(
        "Store settings: dir={}, ttl={}s, code_length={}, max_file_size={}",
        settings.upload_dir.display(),
        settings.ttl.as_secs(),
        settings.code_length,
        settings.max_file_size
    );

    let store = Arc::new(ObjectStore::open(settings).await?);
    warn!("Object store initialized at {}", config.relay.upload_dir);

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit_window(),
    ));
    warn!(
        "Rate limiter initialized: {} requests per {}s per client",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );

    let janitor = spawn_janitor(store.clone(), limiter.clone(), config.sweep_interval());

    Ok(StartupContext {
        store,
        limiter,
        janitor,
    })
}
