use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::integrity::verify_file;
use super::removal::{PendingRemoval, discard_file};
use crate::errors::{RelayError, Result};
use crate::models::files::entities::{FileObject, NewFileObject};
use crate::utils::{generate_code, is_well_formed_code, storage_extension};

const MAX_CODE_GENERATION_ATTEMPTS: usize = 64;

/// 存储层参数
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub upload_dir: PathBuf,
    pub ttl: Duration,
    pub code_length: usize,
    pub max_file_size: u64,
}

/// 一次成功的下载：对象已从存储中摘除，文件在传输结束后删除
#[derive(Debug)]
pub struct Download {
    pub object: FileObject,
    pub removal: PendingRemoval,
}

/// 一次清扫的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub missing_on_disk: usize,
    pub failed: usize,
}

/// 取件码 → 临时文件对象
///
/// 所有改动（插入、读后删除、清扫）都在同一把写锁下进行；
/// 元数据查询只持有读锁。文件删除在锁外执行且幂等。
pub struct ObjectStore {
    entries: RwLock<HashMap<String, FileObject>>,
    // 清扫时删除失败的文件，下次清扫重试
    stray_files: Mutex<Vec<PathBuf>>,
    settings: StoreSettings,
    ttl: chrono::Duration,
}

impl ObjectStore {
    /// 打开存储：创建上传目录并清除上一进程遗留的文件
    ///
    /// 状态只保存在内存中，目录里已有的文件都不可能再被取回。
    pub async fn open(settings: StoreSettings) -> Result<Self> {
        let ttl = chrono::Duration::from_std(settings.ttl)
            .map_err(|e| RelayError::internal(format!("TTL out of range: {e}")))?;

        tokio::fs::create_dir_all(&settings.upload_dir).await?;
        let purged = purge_directory(&settings.upload_dir).await?;
        if purged > 0 {
            warn!(
                purged,
                dir = %settings.upload_dir.display(),
                "Removed orphaned files from upload directory"
            );
        }

        Ok(Self {
            entries: RwLock::new(HashMap::new()),
            stray_files: Mutex::new(Vec::new()),
            settings,
            ttl,
        })
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// 为新上传分配一个独占的落盘路径
    pub fn allocate_path(&self, original_name: &str) -> PathBuf {
        let stored_name = format!("{}{}", Uuid::new_v4(), storage_extension(original_name));
        self.settings.upload_dir.join(stored_name)
    }

    pub async fn put(&self, object: NewFileObject) -> Result<FileObject> {
        self.put_at(object, Utc::now()).await
    }

    /// 分配唯一取件码并插入
    ///
    /// 取件码冲突时重新生成；超过重试上限只可能是码空间耗尽。
    pub async fn put_at(&self, object: NewFileObject, now: DateTime<Utc>) -> Result<FileObject> {
        let mut entries = self.entries.write().await;

        let mut code = None;
        for _ in 0..MAX_CODE_GENERATION_ATTEMPTS {
            let candidate = generate_code(self.settings.code_length);
            if !entries.contains_key(&candidate) {
                code = Some(candidate);
                break;
            }
            debug!(code = %candidate, "Code collision, regenerating");
        }
        let code = code.ok_or_else(|| {
            RelayError::internal(format!(
                "No free code after {MAX_CODE_GENERATION_ATTEMPTS} attempts"
            ))
        })?;

        let stored = FileObject {
            code: code.clone(),
            storage_path: object.storage_path,
            original_name: object.original_name,
            size: object.size,
            content_type: object.content_type,
            digest: object.digest,
            created_at: now,
            expires_at: now + self.ttl,
        };
        entries.insert(code, stored.clone());

        Ok(stored)
    }

    pub async fn get(&self, code: &str) -> Result<FileObject> {
        self.get_at(code, Utc::now()).await
    }

    /// 查询元数据，不移除对象
    ///
    /// 过期对象在访问时即被删除（惰性淘汰），不等待清扫任务。
    pub async fn get_at(&self, code: &str, now: DateTime<Utc>) -> Result<FileObject> {
        if !is_well_formed_code(code, self.settings.code_length) {
            return Err(not_found());
        }

        {
            let entries = self.entries.read().await;
            match entries.get(code) {
                None => return Err(not_found()),
                Some(object) if !object.is_expired(now) => return Ok(object.clone()),
                Some(_) => {}
            }
        }

        self.evict_expired(code, now).await;
        Err(expired())
    }

    pub async fn take_for_download(&self, code: &str) -> Result<Download> {
        self.take_for_download_at(code, Utc::now()).await
    }

    /// 取出对象用于下载
    ///
    /// 对象在写锁内从表中摘除，并发的第二个请求只会得到 NotFound。
    /// 摘除后重新计算摘要；不一致则删除文件并返回 IntegrityFailed。
    pub async fn take_for_download_at(&self, code: &str, now: DateTime<Utc>) -> Result<Download> {
        if !is_well_formed_code(code, self.settings.code_length) {
            return Err(not_found());
        }

        let object = {
            let mut entries = self.entries.write().await;
            let is_expired = entries.get(code).map(|object| object.is_expired(now));
            match (is_expired, entries.remove(code)) {
                (Some(false), Some(object)) => object,
                (Some(true), Some(object)) => {
                    drop(entries);
                    self.discard(&object).await;
                    return Err(expired());
                }
                _ => return Err(not_found()),
            }
        };

        match verify_file(&object.storage_path, &object.digest).await {
            Ok(true) => {
                let removal = PendingRemoval::new(object.code.clone(), object.storage_path.clone());
                Ok(Download { object, removal })
            }
            Ok(false) => {
                warn!(code = %object.code, "File integrity check failed, purging");
                self.discard(&object).await;
                Err(RelayError::integrity_failed("File integrity check failed"))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(code = %object.code, "Backing file missing, dropping entry");
                Err(RelayError::not_found("File not found"))
            }
            Err(err) => {
                self.discard(&object).await;
                Err(err.into())
            }
        }
    }

    /// 删除对象及其文件；对象不存在时返回 `false`
    pub async fn remove(&self, code: &str) -> bool {
        let object = self.entries.write().await.remove(code);
        match object {
            Some(object) => {
                self.discard(&object).await;
                true
            }
            None => false,
        }
    }

    /// 移除所有已过期的对象并删除其文件
    ///
    /// 单个文件删除失败只记录日志，不影响其余条目。
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        self.retry_stray_files(&mut report).await;

        let mut evicted = Vec::new();
        {
            let mut entries = self.entries.write().await;
            entries.retain(|_, object| {
                if object.is_expired(now) {
                    evicted.push(object.clone());
                    false
                } else {
                    true
                }
            });
        }

        for object in evicted {
            match discard_file(&object.storage_path).await {
                Ok(true) => {
                    report.removed += 1;
                    info!(code = %object.code, "Expired file removed");
                }
                Ok(false) => {
                    report.removed += 1;
                    report.missing_on_disk += 1;
                    debug!(code = %object.code, "Expired file already absent on disk");
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        code = %object.code,
                        path = %object.storage_path.display(),
                        %err,
                        "Failed to remove expired file; will retry on next sweep"
                    );
                    self.stray_files.lock().await.push(object.storage_path);
                }
            }
        }

        report
    }

    /// 当前存活（尚未被移除）的对象数
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn evict_expired(&self, code: &str, now: DateTime<Utc>) {
        let object = {
            let mut entries = self.entries.write().await;
            let is_expired = entries.get(code).is_some_and(|object| object.is_expired(now));
            if is_expired {
                entries.remove(code)
            } else {
                None
            }
        };
        if let Some(object) = object {
            debug!(code = %object.code, "Evicted expired file on access");
            self.discard(&object).await;
        }
    }

    async fn discard(&self, object: &FileObject) {
        if let Err(err) = discard_file(&object.storage_path).await {
            warn!(
                code = %object.code,
                path = %object.storage_path.display(),
                %err,
                "Failed to remove file; queued for next sweep"
            );
            self.stray_files
                .lock()
                .await
                .push(object.storage_path.clone());
        }
    }

    async fn retry_stray_files(&self, report: &mut SweepReport) {
        let pending = std::mem::take(&mut *self.stray_files.lock().await);
        for path in pending {
            if let Err(err) = discard_file(&path).await {
                report.failed += 1;
                warn!(path = %path.display(), %err, "Retry of file removal failed");
                self.stray_files.lock().await.push(path);
            }
        }
    }
}

fn not_found() -> RelayError {
    RelayError::not_found("Invalid or expired code")
}

fn expired() -> RelayError {
    RelayError::expired("Code expired")
}

async fn purge_directory(dir: &Path) -> Result<usize> {
    let mut purged = 0;
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        if entry.file_type().await?.is_file() && discard_file(&entry.path()).await? {
            purged += 1;
        }
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::integrity::hash_file;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn open_store(dir: &Path, code_length: usize) -> ObjectStore {
        ObjectStore::open(StoreSettings {
            upload_dir: dir.to_path_buf(),
            ttl: Duration::from_secs(60),
            code_length,
            max_file_size: 1024,
        })
        .await
        .unwrap()
    }

    async fn stage(store: &ObjectStore, name: &str, data: &[u8]) -> NewFileObject {
        let path = store.allocate_path(name);
        tokio::fs::write(&path, data).await.unwrap();
        NewFileObject {
            digest: hash_file(&path).await.unwrap(),
            storage_path: path,
            original_name: name.to_string(),
            size: data.len() as u64,
            content_type: Some("text/plain".to_string()),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;

        let staged = stage(&store, "hello.txt", b"0123456789").await;
        let stored = store.put(staged).await.unwrap();

        assert!(is_well_formed_code(&stored.code, 8));
        assert_eq!(stored.expires_at - stored.created_at, chrono::Duration::seconds(60));
        assert_eq!(store.get(&stored.code).await.unwrap(), stored);
        // get 不移除对象
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_codes_are_unique_under_collisions() {
        let dir = tempfile::tempdir().unwrap();
        // 单字符码空间只有 32 个，插入 10 个必然经历冲突重试
        let store = open_store(dir.path(), 1).await;

        let mut codes = HashSet::new();
        for i in 0..10 {
            let staged = stage(&store, &format!("f{i}.txt"), b"x").await;
            codes.insert(store.put(staged).await.unwrap().code);
        }
        assert_eq!(codes.len(), 10);
        assert_eq!(store.len().await, 10);
    }

    #[tokio::test]
    async fn test_expired_get_evicts_and_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;

        let staged = stage(&store, "old.txt", b"stale").await;
        let path = staged.storage_path.clone();
        let created = Utc::now() - chrono::Duration::seconds(120);
        let stored = store.put_at(staged, created).await.unwrap();

        let err = store.get(&stored.code).await.unwrap_err();
        assert!(matches!(err, RelayError::Expired(_)));
        assert!(!path.exists());
        assert!(matches!(
            store.get(&stored.code).await.unwrap_err(),
            RelayError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_expired_take_never_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;

        let staged = stage(&store, "old.txt", b"stale").await;
        let now = Utc::now();
        let stored = store.put_at(staged, now).await.unwrap();

        let later = stored.expires_at + chrono::Duration::milliseconds(1);
        let err = store.take_for_download_at(&stored.code, later).await.unwrap_err();
        assert!(matches!(err, RelayError::Expired(_)));
        assert!(!stored.storage_path.exists());
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;

        let staged = stage(&store, "once.txt", b"only once").await;
        let stored = store.put(staged).await.unwrap();

        let download = store.take_for_download(&stored.code).await.unwrap();
        assert_eq!(download.object, stored);
        // 传输期间文件仍在
        assert!(stored.storage_path.exists());
        assert_eq!(store.len().await, 0);

        let second = store.take_for_download(&stored.code).await.unwrap_err();
        assert!(matches!(second, RelayError::NotFound(_)));

        download.removal.complete().await;
        assert!(!stored.storage_path.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_takes_deliver_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(open_store(dir.path(), 8).await);

        for i in 0..20 {
            let staged = stage(&store, &format!("race{i}.txt"), b"contended").await;
            let stored = store.put(staged).await.unwrap();

            let (a, b) = {
                let (s1, s2) = (store.clone(), store.clone());
                let (c1, c2) = (stored.code.clone(), stored.code.clone());
                tokio::join!(
                    tokio::spawn(async move { s1.take_for_download(&c1).await }),
                    tokio::spawn(async move { s2.take_for_download(&c2).await }),
                )
            };
            let outcomes = [a.unwrap(), b.unwrap()];

            let delivered = outcomes.iter().filter(|r| r.is_ok()).count();
            let lost = outcomes
                .iter()
                .filter(|r| matches!(r, Err(RelayError::NotFound(_))))
                .count();
            assert_eq!((delivered, lost), (1, 1));

            for download in outcomes.into_iter().flatten() {
                download.removal.complete().await;
            }
            assert!(!stored.storage_path.exists());
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;

        let staged = stage(&store, "c.txt", b"pristine").await;
        let stored = store.put(staged).await.unwrap();
        tokio::fs::write(&stored.storage_path, b"corrupted").await.unwrap();

        let err = store.take_for_download(&stored.code).await.unwrap_err();
        assert!(matches!(err, RelayError::IntegrityFailed(_)));
        assert!(!stored.storage_path.exists());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_with_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;

        let staged = stage(&store, "m.txt", b"gone soon").await;
        let stored = store.put(staged).await.unwrap();
        tokio::fs::remove_file(&stored.storage_path).await.unwrap();

        let err = store.take_for_download(&stored.code).await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_malformed_code_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;
        assert!(matches!(
            store.get("short").await.unwrap_err(),
            RelayError::NotFound(_)
        ));
        assert!(matches!(
            store.take_for_download("OOOOOOOO").await.unwrap_err(),
            RelayError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;

        let staged = stage(&store, "r.txt", b"bye").await;
        let stored = store.put(staged).await.unwrap();

        assert!(store.remove(&stored.code).await);
        assert!(!store.remove(&stored.code).await);
        assert!(!stored.storage_path.exists());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;
        let now = Utc::now();

        let old = store
            .put_at(stage(&store, "old.txt", b"old").await, now - chrono::Duration::seconds(90))
            .await
            .unwrap();
        let fresh = store
            .put_at(stage(&store, "new.txt", b"new").await, now)
            .await
            .unwrap();
        let vanished = store
            .put_at(stage(&store, "v.txt", b"v").await, now - chrono::Duration::seconds(90))
            .await
            .unwrap();
        tokio::fs::remove_file(&vanished.storage_path).await.unwrap();

        let report = store.sweep(now).await;
        assert_eq!(
            report,
            SweepReport {
                removed: 2,
                missing_on_disk: 1,
                failed: 0
            }
        );
        assert!(!old.storage_path.exists());
        assert!(fresh.storage_path.exists());
        assert_eq!(store.len().await, 1);
        assert!(store.get_at(&fresh.code, now).await.is_ok());

        // 再次清扫不会重复删除
        assert_eq!(store.sweep(now).await, SweepReport::default());
    }

    #[tokio::test]
    async fn test_open_purges_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let orphan = dir.path().join("leftover.bin");
        tokio::fs::write(&orphan, b"stale").await.unwrap();

        let store = open_store(dir.path(), 8).await;
        assert!(!orphan.exists());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_allocate_path_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), 8).await;

        let first = store.allocate_path("photo.PNG");
        let second = store.allocate_path("photo.PNG");
        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(dir.path()));
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("png"));
    }
}
