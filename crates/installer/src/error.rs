//! 설치기 에러 타입
//!
//! [`InstallerError`]는 버전 결정, 다운로드, 디스크 쓰기 중 발생하는 에러를 표현합니다.
//! `From<InstallerError> for KubescapeError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use std::io;
use std::path::Path;

use kubescape_core::error::{InstallError, KubescapeError};

/// 설치기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum InstallerError {
    /// 설치할 버전을 결정할 수 없음
    #[error("version resolution failed: {reason}")]
    Resolution {
        /// 실패 사유
        reason: String,
    },

    /// 원격 아티팩트 다운로드 실패
    #[error("failed to fetch {artifact}: {reason}")]
    Fetch {
        /// 아티팩트 이름 (binary, framework:nsa 등)
        artifact: String,
        /// 실패 사유
        reason: String,
    },

    /// 원격에 존재하지 않는 프레임워크
    #[error("framework not found: {0}")]
    FrameworkNotFound(String),

    /// scan 프레임워크가 모두 설치 실패 (스캔 범위를 제한할 수 없음)
    #[error("none of the scan frameworks could be installed: {0}")]
    NoScanFrameworks(String),

    /// 다운로드된 내용이 올바르지 않음
    #[error("invalid artifact {artifact}: {reason}")]
    InvalidArtifact {
        /// 아티팩트 이름
        artifact: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 쓰기 권한 없음
    #[error("permission denied: {path}: {reason}")]
    Permission {
        /// 대상 경로
        path: String,
        /// 원인
        reason: String,
    },

    /// 디스크 쓰기 / rename 실패
    #[error("disk error: {path}: {reason}")]
    Disk {
        /// 대상 경로
        path: String,
        /// 원인
        reason: String,
    },

    /// 설치된 바이너리의 버전을 확인할 수 없음
    #[error("version probe failed for {path}: {reason}")]
    Probe {
        /// 바이너리 경로
        path: String,
        /// 원인
        reason: String,
    },

    /// 호출자 요청으로 취소됨
    #[error("installation cancelled")]
    Cancelled,
}

impl InstallerError {
    /// I/O 에러를 경로 정보와 함께 권한/디스크 에러로 분류합니다.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.display().to_string();
        if err.kind() == io::ErrorKind::PermissionDenied {
            Self::Permission {
                path,
                reason: err.to_string(),
            }
        } else {
            Self::Disk {
                path,
                reason: err.to_string(),
            }
        }
    }

    /// 취소 여부
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<InstallerError> for KubescapeError {
    fn from(err: InstallerError) -> Self {
        match err {
            InstallerError::Resolution { reason } => KubescapeError::Resolution { reason },
            InstallerError::Fetch { artifact, reason } => {
                KubescapeError::Install(InstallError::Fetch { artifact, reason })
            }
            InstallerError::FrameworkNotFound(name) => {
                KubescapeError::Install(InstallError::FrameworkNotFound(name))
            }
            InstallerError::NoScanFrameworks(names) => {
                KubescapeError::Install(InstallError::NoScanFrameworks(names))
            }
            InstallerError::InvalidArtifact { artifact, reason } => {
                KubescapeError::Install(InstallError::InvalidArtifact { artifact, reason })
            }
            InstallerError::Permission { path, reason } => {
                KubescapeError::Install(InstallError::Permission { path, reason })
            }
            InstallerError::Disk { path, reason } => {
                KubescapeError::Install(InstallError::Disk { path, reason })
            }
            InstallerError::Probe { path, reason } => {
                KubescapeError::Install(InstallError::InvalidArtifact {
                    artifact: path,
                    reason,
                })
            }
            InstallerError::Cancelled => KubescapeError::Cancelled,
        }
    }
}
