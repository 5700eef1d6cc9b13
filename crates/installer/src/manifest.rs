//! 설치 매니페스트
//!
//! 바이너리 설치 직후 `<base>/kubescape.manifest.json`에 기록됩니다.
//! 다음 setup에서 "설치된 버전"과 "플랫폼 불일치"를 판단하는 근거입니다.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use kubescape_core::types::Platform;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::atomic::write_atomic;
use crate::error::InstallerError;

/// 매니페스트 파일명
pub const MANIFEST_FILE: &str = "kubescape.manifest.json";

/// 설치 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallManifest {
    /// 설치된 버전 태그
    pub version: String,
    /// 바이너리 대상 플랫폼
    pub platform: Platform,
    /// 설치 시각
    pub installed_at: DateTime<Utc>,
}

impl InstallManifest {
    /// 현재 시각으로 매니페스트를 생성합니다.
    pub fn new(version: impl Into<String>, platform: Platform) -> Self {
        Self {
            version: version.into(),
            platform,
            installed_at: Utc::now(),
        }
    }

    /// 매니페스트 경로
    pub fn path(base_directory: &Path) -> PathBuf {
        base_directory.join(MANIFEST_FILE)
    }

    /// 매니페스트를 읽습니다.
    ///
    /// 파일이 없거나 손상되었으면 `None`을 반환합니다 (부분 설치로 간주).
    pub async fn load(base_directory: &Path) -> Option<Self> {
        let path = Self::path(base_directory);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read install manifest");
                return None;
            }
        };

        match serde_json::from_slice(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt install manifest");
                None
            }
        }
    }

    /// 매니페스트를 원자적으로 기록합니다.
    pub async fn store(&self, base_directory: &Path) -> Result<(), InstallerError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| InstallerError::Disk {
            path: Self::path(base_directory).display().to_string(),
            reason: e.to_string(),
        })?;
        write_atomic(base_directory, MANIFEST_FILE, Bytes::from(json), false).await?;
        Ok(())
    }

    /// 매니페스트를 삭제합니다. 없으면 무시합니다.
    pub async fn remove(base_directory: &Path) -> Result<(), InstallerError> {
        let path = Self::path(base_directory);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InstallerError::from_io(&path, e)),
        }
    }
}
