use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use super::AppConfig;
use crate::storage::StoreSettings;

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// 50 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

impl AppConfig {
    /// 加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // 内置默认值
            .set_default("app.environment", "development")?
            .set_default("app.log_level", "info")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.workers", 0)?
            .set_default("server.max_workers", 8)?
            .set_default("server.trust_proxy_headers", false)?
            .set_default("server.timeouts.client_request", 60_000)?
            .set_default("server.timeouts.client_disconnect", 5_000)?
            .set_default("server.timeouts.keep_alive", 75)?
            .set_default("relay.upload_dir", "uploads")?
            .set_default("relay.max_file_size", DEFAULT_MAX_FILE_SIZE)?
            .set_default("relay.ttl_secs", 60)?
            .set_default("relay.code_length", 8)?
            .set_default("relay.sweep_interval_secs", 30)?
            .set_default("rate_limit.max_requests", 5)?
            .set_default("rate_limit.window_secs", 60)?
            .set_default("cors.max_age", 3600)?
            // 然后加载默认配置文件
            .add_source(File::with_name("config").required(false))
            // 然后根据环境加载特定配置文件
            .add_source(
                File::with_name(&format!(
                    "config.{}",
                    std::env::var("APP_ENV").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // 最后加载环境变量覆盖
            .add_source(
                Environment::with_prefix("CODEDROP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        // 支持从环境变量加载
        builder = builder
            .set_override_option("app.environment", std::env::var("APP_ENV").ok())?
            .set_override_option("app.log_level", std::env::var("RUST_LOG").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("server.workers", std::env::var("CPU_COUNT").ok())?
            .set_override_option("relay.upload_dir", std::env::var("UPLOAD_DIR").ok())?
            .set_override_option("rate_limit.max_requests", std::env::var("RATE_LIMIT").ok())?;

        let config = builder.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        // 处理工作线程数
        if app_config.server.workers == 0 {
            app_config.server.workers = num_cpus::get().min(app_config.server.max_workers);
        }

        app_config.validate()?;
        Ok(app_config)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        let relay = &self.relay;
        if relay.ttl_secs == 0 {
            return Err(ConfigError::Message("relay.ttl_secs must be positive".into()));
        }
        if relay.sweep_interval_secs == 0 {
            return Err(ConfigError::Message(
                "relay.sweep_interval_secs must be positive".into(),
            ));
        }
        if relay.max_file_size == 0 {
            return Err(ConfigError::Message(
                "relay.max_file_size must be positive".into(),
            ));
        }
        if !(4..=16).contains(&relay.code_length) {
            return Err(ConfigError::Message(format!(
                "relay.code_length must be between 4 and 16, got {}",
                relay.code_length
            )));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Message(
                "rate_limit.max_requests and rate_limit.window_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// 获取全局配置实例
    pub fn get() -> &'static AppConfig {
        APP_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                eprintln!("Failed to load configuration: {e}");
                std::process::exit(1);
            })
        })
    }

    /// 初始化配置 (在应用启动时调用)
    pub fn init() -> Result<(), ConfigError> {
        let config = Self::load()?;
        APP_CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("Configuration already initialized".to_string()))?;
        Ok(())
    }

    /// 检查是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }

    /// 获取服务器绑定地址
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 存储层参数
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            upload_dir: PathBuf::from(&self.relay.upload_dir),
            ttl: Duration::from_secs(self.relay.ttl_secs),
            code_length: self.relay.code_length,
            max_file_size: self.relay.max_file_size,
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.relay.sweep_interval_secs)
    }
}
