//! 文件完整性校验
//!
//! 按固定大小分块计算 SHA-256，内存中最多只保留一个块。

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// 计算文件的 SHA-256（小写十六进制）
pub async fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// 重新计算摘要并与期望值比较
pub async fn verify_file(path: &Path, expected: &str) -> io::Result<bool> {
    let actual = hash_file(path).await?;
    Ok(actual.eq_ignore_ascii_case(expected))
}
