use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entities::FileObject;

/// POST /upload 成功响应
#[derive(Debug, Serialize)]
pub struct FileUploadResponse {
    /// 取件码
    pub code: String,
    /// 过期时间（ISO-8601）
    pub expires_at: DateTime<Utc>,
    /// 文件大小(字节)
    pub file_size: u64,
}

/// GET /info/{code} 响应
#[derive(Debug, Serialize)]
pub struct FileInfoResponse {
    pub original_name: String,
    pub file_size: u64,
    pub content_type: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// 剩余秒数
    pub time_remaining: f64,
    pub upload_time: DateTime<Utc>,
    pub hash: String,
}

impl FileInfoResponse {
    pub fn from_object(object: FileObject, now: DateTime<Utc>) -> Self {
        Self {
            time_remaining: object.time_remaining(now),
            original_name: object.original_name,
            file_size: object.size,
            content_type: object.content_type,
            expires_at: object.expires_at,
            upload_time: object.created_at,
            hash: object.digest,
        }
    }
}
