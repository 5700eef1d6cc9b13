//! 원자적 파일 교체
//!
//! 대상 디렉토리 안에 임시 파일을 만들어 내용을 쓰고 fsync한 뒤 rename합니다.
//! 같은 파일시스템 안의 rename이므로 동시에 읽는 쪽은 이전 파일 또는
//! 완성된 새 파일만 보게 됩니다.

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;

use crate::error::InstallerError;

/// 실행 파일 권한 (unix)
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// `dir/file_name`을 `contents`로 원자적으로 교체합니다.
///
/// `executable`이 참이면 rename 전에 실행 권한을 설정합니다 (unix).
pub async fn write_atomic(
    dir: &Path,
    file_name: &str,
    contents: Bytes,
    executable: bool,
) -> Result<PathBuf, InstallerError> {
    let dir = dir.to_path_buf();
    let target = dir.join(file_name);
    let task_target = target.clone();

    tokio::task::spawn_blocking(move || write_blocking(&dir, &task_target, &contents, executable))
        .await
        .map_err(|e| InstallerError::Disk {
            path: target.display().to_string(),
            reason: format!("spawn_blocking failed: {e}"),
        })??;

    Ok(target)
}

fn write_blocking(
    dir: &Path,
    target: &Path,
    contents: &[u8],
    executable: bool,
) -> Result<(), InstallerError> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| InstallerError::from_io(dir, e))?;
    tmp.write_all(contents)
        .map_err(|e| InstallerError::from_io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| InstallerError::from_io(tmp.path(), e))?;

    if executable {
        set_executable(tmp.path())?;
    }

    tmp.persist(target)
        .map_err(|e| InstallerError::from_io(target, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), InstallerError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(EXECUTABLE_MODE))
        .map_err(|e| InstallerError::from_io(path, e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), InstallerError> {
    Ok(())
}
