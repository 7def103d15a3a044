use actix_multipart::{Field, Multipart};
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, http::header};
use futures_util::TryStreamExt;
use futures_util::stream::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::FileService;
use crate::errors::{RelayError, Result};
use crate::models::files::entities::NewFileObject;
use crate::models::files::responses::FileUploadResponse;
use crate::storage::integrity::hash_file;
use crate::storage::removal::discard_file;
use crate::storage::ObjectStore;

// multipart 边界与头部的余量
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub async fn handle_upload(
    service: &FileService,
    req: &HttpRequest,
    mut payload: Multipart,
) -> ActixResult<HttpResponse> {
    let store = service.get_store(req)?;
    let max_size = store.settings().max_file_size;

    // Content-Length 远超上限时不读请求体，直接拒绝
    if let Some(length) = content_length(req)
        && length > max_size.saturating_add(MULTIPART_OVERHEAD)
    {
        return Err(too_large(max_size).into());
    }

    let mut staged: Option<NewFileObject> = None;

    loop {
        let field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                // 后续部分解析失败时，已落盘的文件同样要删除
                if let Some(previous) = staged.take() {
                    discard_quietly(&previous.storage_path).await;
                }
                return Err(RelayError::from(e).into());
            }
        };
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        if name != "file" {
            continue;
        }

        if let Some(previous) = staged.take() {
            discard_quietly(&previous.storage_path).await;
            return Err(RelayError::validation("Only one file can be uploaded at a time").into());
        }

        staged = Some(persist_field(&store, field, max_size).await?);
    }

    let Some(staged) = staged else {
        return Err(RelayError::validation("No file found in upload payload").into());
    };

    let storage_path = staged.storage_path.clone();
    let stored = match store.put(staged).await {
        Ok(stored) => stored,
        Err(e) => {
            // 插入失败不能留下孤立文件
            discard_quietly(&storage_path).await;
            return Err(e.into());
        }
    };

    info!(
        code = %stored.code,
        size = stored.size,
        "Uploaded {} → {}",
        stored.original_name,
        stored.code
    );

    Ok(HttpResponse::Ok().json(FileUploadResponse {
        code: stored.code,
        expires_at: stored.expires_at,
        file_size: stored.size,
    }))
}

/// 将一个 multipart 字段写入新分配的路径并计算摘要
///
/// 任一步失败都会删除已写入的部分。
async fn persist_field(store: &ObjectStore, mut field: Field, max_size: u64) -> Result<NewFileObject> {
    let original_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .filter(|name| !name.is_empty())
        .unwrap_or("file")
        .to_string();
    let content_type = field.content_type().map(|mime| mime.to_string());
    let storage_path = store.allocate_path(&original_name);

    let size = match write_field(&mut field, &storage_path, max_size).await {
        Ok(size) => size,
        Err(e) => {
            discard_quietly(&storage_path).await;
            return Err(e);
        }
    };

    if size == 0 {
        discard_quietly(&storage_path).await;
        return Err(RelayError::validation("Empty file not allowed"));
    }

    let digest = match hash_file(&storage_path).await {
        Ok(digest) => digest,
        Err(e) => {
            discard_quietly(&storage_path).await;
            return Err(e.into());
        }
    };

    Ok(NewFileObject {
        storage_path,
        original_name,
        size,
        content_type,
        digest,
    })
}

async fn write_field(field: &mut Field, path: &Path, max_size: u64) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut total: u64 = 0;

    while let Some(chunk) = field.next().await {
        let data = chunk?;
        total += data.len() as u64;
        // 超限立即中止，不再继续落盘
        if total > max_size {
            return Err(too_large(max_size));
        }
        file.write_all(&data).await?;
    }

    file.flush().await?;
    Ok(total)
}

fn too_large(max_size: u64) -> RelayError {
    RelayError::payload_too_large(format!("Max size is {}MB", max_size / 1024 / 1024))
}

fn content_length(req: &HttpRequest) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

async fn discard_quietly(path: &Path) {
    if let Err(e) = discard_file(path).await {
        warn!(path = %path.display(), %e, "Failed to remove partial upload");
    }
}
