use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 删除落盘文件，文件已不存在时视为成功
///
/// 返回 `true` 表示本次确实删除了文件，`false` 表示文件早已不存在。
pub async fn discard_file(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// 下载完成后的删除钩子
///
/// 持有者在响应体传输结束时调用 [`PendingRemoval::complete`]；
/// 若提前被丢弃（例如客户端断开），`Drop` 会在后台完成删除。
#[derive(Debug)]
pub struct PendingRemoval {
    code: String,
    path: Option<PathBuf>,
}

impl PendingRemoval {
    pub(crate) fn new(code: String, path: PathBuf) -> Self {
        Self {
            code,
            path: Some(path),
        }
    }

    /// 传输结束，立即删除文件
    pub async fn complete(mut self) {
        if let Some(path) = self.path.take() {
            remove_after_download(&self.code, &path).await;
        }
    }
}

impl Drop for PendingRemoval {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let code = std::mem::take(&mut self.code);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    remove_after_download(&code, &path).await;
                });
            }
            Err(_) => match std::fs::remove_file(&path) {
                Ok(()) => info!(code = %code, "File deleted after download"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(code = %code, path = %path.display(), %err, "Cleanup error"),
            },
        }
    }
}

async fn remove_after_download(code: &str, path: &Path) {
    match discard_file(path).await {
        Ok(true) => info!(code = %code, "File deleted after download"),
        Ok(false) => debug!(code = %code, "File already absent after download"),
        Err(err) => warn!(code = %code, path = %path.display(), %err, "Cleanup error"),
    }
}
