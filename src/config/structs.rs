use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub environment: String,
    pub log_level: String,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub max_workers: usize,
    /// 是否信任 X-Forwarded-For / X-Real-IP（仅部署在反向代理后时开启）
    pub trust_proxy_headers: bool,
    pub timeouts: TimeoutConfig,
}

/// 超时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub client_request: u64,
    pub client_disconnect: u64,
    pub keep_alive: u64,
}

/// 中转存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub upload_dir: String,         // 上传目录
    pub max_file_size: u64,         // 单文件最大字节数
    pub ttl_secs: u64,              // 文件存活时间 (秒)
    pub code_length: usize,         // 取件码长度
    pub sweep_interval_secs: u64,   // 过期清理周期 (秒)
}

/// 限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize, // 窗口内允许的最大请求数
    pub window_secs: u64,    // 滑动窗口 (秒)
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub max_age: usize,
}
