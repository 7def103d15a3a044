use serde::Deserialize;

/// POST /download 请求体
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub code: String,
}
