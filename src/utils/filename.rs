use std::path::Path;

const SAFE_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-() ";
const FALLBACK_NAME: &str = "download";
const MAX_EXTENSION_LEN: usize = 16;

/// 清洗客户端提供的文件名，用于 Content-Disposition
///
/// 不在白名单内的字符替换为 `_`，去除首尾空白，结果为空时使用默认名。
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if SAFE_CHARS.contains(c) { c } else { '_' })
        .collect();
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// 从原始文件名提取落盘扩展名（含点号），只保留 ASCII 字母数字
pub fn storage_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
