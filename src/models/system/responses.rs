use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// 当前存活的文件数
    pub active_files: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
