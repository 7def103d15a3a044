use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// 存储中的一个临时文件对象
///
/// 创建后不可变，只有它在存储中的“成员资格”会变化。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileObject {
    // 取件码（主键）
    pub code: String,
    // 落盘路径，由该对象独占
    pub storage_path: PathBuf,
    // 客户端提供的文件名，不可信，仅用于输出
    pub original_name: String,
    // 文件大小（字节）
    pub size: u64,
    // 客户端提供的 MIME 类型，不可信，仅作输出提示
    pub content_type: Option<String>,
    // 上传完成时计算的 SHA-256（十六进制）
    pub digest: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FileObject {
    /// `now` 严格晚于截止时间即视为过期
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// 剩余秒数，过期后为 0
    pub fn time_remaining(&self, now: DateTime<Utc>) -> f64 {
        let millis = self
            .expires_at
            .signed_duration_since(now)
            .num_milliseconds();
        (millis.max(0) as f64) / 1000.0
    }
}

/// 上传完成、尚未分配取件码的文件
#[derive(Debug, Clone)]
pub struct NewFileObject {
    pub storage_path: PathBuf,
    pub original_name: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub digest: String,
}
