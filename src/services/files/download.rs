use actix_web::http::header::{self, HeaderValue};
use actix_web::web::Bytes;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use futures_util::Stream;
use std::io;
use tokio::io::AsyncReadExt;

use super::FileService;
use crate::errors::RelayError;
use crate::storage::{Download, PendingRemoval};
use crate::utils::{normalize_code, sanitize_filename};

const CHUNK_SIZE: usize = 64 * 1024;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub async fn handle_download(
    service: &FileService,
    request: &HttpRequest,
    code: &str,
) -> ActixResult<HttpResponse> {
    let store = service.get_store(request)?;
    let code = normalize_code(code);

    let Download { object, removal } = store.take_for_download(&code).await?;

    // 打开失败时 removal 被丢弃，文件随之删除
    let file = tokio::fs::File::open(&object.storage_path)
        .await
        .map_err(RelayError::from)?;

    let content_type = object
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content_type))
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                sanitize_filename(&object.original_name)
            ),
        ))
        .insert_header(("X-Content-SHA256", object.digest))
        .no_chunking(object.size)
        .streaming(stream_then_remove(file, removal)))
}

/// 分块读取文件作为响应体；读到末尾时触发删除
///
/// 响应提前结束（客户端断开、读取出错）时由 `PendingRemoval` 的 Drop 负责删除。
fn stream_then_remove(
    file: tokio::fs::File,
    removal: PendingRemoval,
) -> impl Stream<Item = Result<Bytes, io::Error>> + 'static {
    futures_util::stream::unfold(Some((file, removal)), |state| async move {
        let (mut file, removal) = state?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => {
                removal.complete().await;
                None
            }
            Ok(read) => {
                buf.truncate(read);
                Some((Ok(Bytes::from(buf)), Some((file, removal))))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}
