//! Retention Policies - 로그 파일 보존 정책
//!
//! 로그 로테이션은 활성화된 모든 retention policy 에게 `delete_files` 를 묻고,
//! 반환된 파일들을 지웁니다. 정책 자체는 파일을 삭제하지 않습니다.

use super::traits::{Capability, CapabilityKind, ManagedComponent};
use crate::config::{RetentionLimit, RetentionPolicyCfg};
use crate::registry::{ActiveSet, ServerRegistry};
use async_trait::async_trait;
use dirsrv_foundation::{Error, Result, UnacceptableReasons};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

// ============================================================================
// FileNamingPolicy - 대상 파일 목록
// ============================================================================

/// 로그 파일 명명 규칙 (보존 대상 파일 나열)
pub trait FileNamingPolicy: Send + Sync {
    /// 최초 파일 이름 (에러 메시지용)
    fn initial_name(&self) -> PathBuf;

    /// 현재 존재하는 대상 파일 목록
    fn list_files(&self) -> Result<Vec<PathBuf>>;
}

/// 디렉토리 + 파일 이름 접두사 기반 명명 규칙
#[derive(Debug, Clone)]
pub struct DirectoryNamingPolicy {
    dir: PathBuf,
    prefix: String,
}

impl DirectoryNamingPolicy {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }
}

impl FileNamingPolicy for DirectoryNamingPolicy {
    fn initial_name(&self) -> PathBuf {
        self.dir.join(&self.prefix)
    }

    fn list_files(&self) -> Result<Vec<PathBuf>> {
        let read_dir = std::fs::read_dir(&self.dir).map_err(|e| {
            Error::Internal(format!(
                "Error listing log files named by {}: {}",
                self.initial_name().display(),
                e
            ))
        })?;

        let mut files = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with(&self.prefix) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

struct FileInfo {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

/// 파일 크기/수정 시각을 읽어 최신 파일이 앞에 오도록 정렬
fn newest_first(paths: Vec<PathBuf>) -> Result<Vec<FileInfo>> {
    let mut files = paths
        .into_iter()
        .map(|path| {
            let meta = std::fs::metadata(&path)?;
            Ok(FileInfo {
                len: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                path,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
    Ok(files)
}

// ============================================================================
// RetentionPolicy - capability 계약
// ============================================================================

/// Retention policy capability
pub trait RetentionPolicy: ManagedComponent<RetentionPolicyCfg> {
    /// 삭제해야 할 파일 목록
    fn delete_files(&self, naming: &dyn FileNamingPolicy) -> Result<Vec<PathBuf>>;
}

/// Retention policy capability descriptor
pub struct RetentionPolicyCapability;

impl Capability for RetentionPolicyCapability {
    type Config = RetentionPolicyCfg;
    type Instance = dyn RetentionPolicy;

    const KIND: CapabilityKind = CapabilityKind::RetentionPolicy;

    fn active_set(registry: &ServerRegistry) -> &ActiveSet<dyn RetentionPolicy> {
        registry.retention_policies()
    }
}

// ============================================================================
// SizeBasedRetentionPolicy
// ============================================================================

/// 전체 크기 상한 기반 정책. 오래된 파일부터 필요한 만큼 삭제.
#[derive(Debug, Default)]
pub struct SizeBasedRetentionPolicy {
    size: u64,
}

impl SizeBasedRetentionPolicy {
    pub const CLASS_NAME: &'static str = "SizeBasedRetentionPolicy";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn size_limit(&self) -> u64 {
        self.size
    }
}

#[async_trait]
impl ManagedComponent<RetentionPolicyCfg> for SizeBasedRetentionPolicy {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    async fn initialize(&mut self, config: &RetentionPolicyCfg) -> Result<()> {
        self.size = config.disk_space_used().ok_or_else(|| {
            Error::Config(format!("{} requires a disk_space_used limit", config.dn))
        })?;
        Ok(())
    }

    fn is_configuration_acceptable(&self, config: &RetentionPolicyCfg, reasons: &mut UnacceptableReasons) -> bool {
        match config.limit {
            Some(RetentionLimit::DiskSpaceUsed(_)) => true,
            Some(other) => {
                reasons.push(format!(
                    "{} only supports a disk_space_used limit but {} was configured",
                    Self::CLASS_NAME,
                    other
                ));
                false
            }
            None => {
                reasons.push(format!("{} requires a disk_space_used limit", Self::CLASS_NAME));
                false
            }
        }
    }
}

impl RetentionPolicy for SizeBasedRetentionPolicy {
    fn delete_files(&self, naming: &dyn FileNamingPolicy) -> Result<Vec<PathBuf>> {
        let files = newest_first(naming.list_files()?)?;
        let total: u64 = files.iter().map(|f| f.len).sum();

        trace!("Total size of files: {}, Max: {}", total, self.size);

        if total <= self.size {
            return Ok(Vec::new());
        }

        let needed = total - self.size;
        let mut freed = 0u64;
        let mut to_delete = Vec::new();
        for file in files.iter().rev() {
            freed += file.len;
            to_delete.push(file.path.clone());
            if freed >= needed {
                break;
            }
        }
        Ok(to_delete)
    }
}

// ============================================================================
// FileNumberRetentionPolicy
// ============================================================================

/// 파일 개수 기반 정책. 최신 N개만 남김.
#[derive(Debug, Default)]
pub struct FileNumberRetentionPolicy {
    keep: u32,
}

impl FileNumberRetentionPolicy {
    pub const CLASS_NAME: &'static str = "FileNumberRetentionPolicy";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManagedComponent<RetentionPolicyCfg> for FileNumberRetentionPolicy {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    async fn initialize(&mut self, config: &RetentionPolicyCfg) -> Result<()> {
        self.keep = config.number_of_files().ok_or_else(|| {
            Error::Config(format!("{} requires a number_of_files limit", config.dn))
        })?;
        Ok(())
    }

    fn is_configuration_acceptable(&self, config: &RetentionPolicyCfg, reasons: &mut UnacceptableReasons) -> bool {
        match config.limit {
            Some(RetentionLimit::NumberOfFiles(_)) => true,
            _ => {
                reasons.push(format!("{} requires a number_of_files limit", Self::CLASS_NAME));
                false
            }
        }
    }
}

impl RetentionPolicy for FileNumberRetentionPolicy {
    fn delete_files(&self, naming: &dyn FileNamingPolicy) -> Result<Vec<PathBuf>> {
        let files = newest_first(naming.list_files()?)?;
        Ok(files
            .into_iter()
            .skip(self.keep as usize)
            .map(|f| f.path)
            .collect())
    }
}

/// 파일 목록을 실제로 삭제 (로그 로테이션 측 헬퍼)
pub fn remove_files(paths: &[PathBuf]) -> Result<usize> {
    let mut removed = 0;
    for path in paths {
        if remove_if_exists(path)? {
            removed += 1;
        }
    }
    Ok(removed)
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsrv_foundation::Dn;
    use std::fs::{self, File};
    use std::time::Duration;

    fn write_log(dir: &Path, name: &str, size: usize, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![b'x'; size]).unwrap();
        let modified = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
        path
    }

    fn cfg(limit: Option<RetentionLimit>) -> RetentionPolicyCfg {
        let cfg = RetentionPolicyCfg::new(
            Dn::parse("cn=Test,cn=Retention Policies,cn=config").unwrap(),
            SizeBasedRetentionPolicy::CLASS_NAME,
        );
        match limit {
            Some(limit) => cfg.with_limit(limit),
            None => cfg,
        }
    }

    #[tokio::test]
    async fn test_size_based_deletes_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let oldest = write_log(dir.path(), "access.1", 40, 300);
        let middle = write_log(dir.path(), "access.2", 40, 200);
        write_log(dir.path(), "access.3", 40, 100);
        write_log(dir.path(), "other.log", 1000, 500);

        let mut policy = SizeBasedRetentionPolicy::new();
        policy.initialize(&cfg(Some(RetentionLimit::DiskSpaceUsed(50)))).await.unwrap();

        let naming = DirectoryNamingPolicy::new(dir.path(), "access");
        let to_delete = policy.delete_files(&naming).unwrap();
        assert_eq!(to_delete, vec![oldest, middle]);
    }

    #[tokio::test]
    async fn test_size_based_under_limit() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "access.1", 10, 10);

        let mut policy = SizeBasedRetentionPolicy::new();
        policy.initialize(&cfg(Some(RetentionLimit::DiskSpaceUsed(100)))).await.unwrap();
        assert!(policy
            .delete_files(&DirectoryNamingPolicy::new(dir.path(), "access"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_size_based_requires_disk_space_limit() {
        let policy = SizeBasedRetentionPolicy::new();

        let mut reasons = UnacceptableReasons::new();
        assert!(!policy.is_configuration_acceptable(&cfg(None), &mut reasons));
        assert!(!policy.is_configuration_acceptable(&cfg(Some(RetentionLimit::NumberOfFiles(3))), &mut reasons));
        assert_eq!(reasons.len(), 2);
    }

    #[tokio::test]
    async fn test_file_number_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let oldest = write_log(dir.path(), "audit.1", 1, 300);
        write_log(dir.path(), "audit.2", 1, 200);
        write_log(dir.path(), "audit.3", 1, 100);

        let mut policy = FileNumberRetentionPolicy::new();
        policy.initialize(&cfg(Some(RetentionLimit::NumberOfFiles(2)))).await.unwrap();

        let to_delete = policy
            .delete_files(&DirectoryNamingPolicy::new(dir.path(), "audit"))
            .unwrap();
        assert_eq!(to_delete, vec![oldest.clone()]);

        assert_eq!(remove_files(&to_delete).unwrap(), 1);
        assert!(!oldest.exists());
    }

    #[test]
    fn test_listing_failure_is_error() {
        let policy = FileNumberRetentionPolicy::new();
        let naming = DirectoryNamingPolicy::new("/definitely/not/here", "x");
        assert!(policy.delete_files(&naming).is_err());
    }
}
