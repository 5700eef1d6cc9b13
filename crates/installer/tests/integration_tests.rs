//! 통합 테스트 -- 버전 결정 → 바이너리 설치 → 프레임워크 설치
//!
//! 인메모리 아티팩트 소스를 사용하므로 네트워크가 필요 없습니다.
//! 내려받는 "바이너리"는 `version` 서브커맨드에 응답하는 셸 스크립트이므로
//! 버전 프로브 경로까지 unix에서 실제로 실행됩니다.

#![cfg(unix)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use kubescape_core::config::{InstallConfig, InstallConfigBuilder};
use kubescape_core::types::Platform;
use kubescape_installer::{
    ArtifactInstaller, ArtifactSource, InstallManifest, InstallerError,
};
use tokio_util::sync::CancellationToken;

// In-memory artifact source for integration tests
mod mock {
    use super::*;
    use kubescape_core::ui::ProgressReporter;
    use std::sync::Mutex;

    pub struct MemorySource {
        latest: Mutex<Option<String>>,
        frameworks: Mutex<HashMap<String, Bytes>>,
        binary_delay: Mutex<Option<Duration>>,
        pub binary_fetches: AtomicUsize,
        pub framework_fetches: AtomicUsize,
    }

    impl MemorySource {
        pub fn new(latest: &str) -> Self {
            let mut frameworks = HashMap::new();
            frameworks.insert("nsa".to_owned(), Bytes::from_static(b"{\"name\":\"NSA\"}"));
            frameworks.insert("mitre".to_owned(), Bytes::from_static(b"{\"name\":\"MITRE\"}"));
            Self {
                latest: Mutex::new(Some(latest.to_owned())),
                frameworks: Mutex::new(frameworks),
                binary_delay: Mutex::new(None),
                binary_fetches: AtomicUsize::new(0),
                framework_fetches: AtomicUsize::new(0),
            }
        }

        pub fn go_offline(&self) {
            *self.latest.lock().unwrap() = None;
        }

        pub fn add_framework(&self, name: &str, body: &'static [u8]) {
            self.frameworks
                .lock()
                .unwrap()
                .insert(name.to_owned(), Bytes::from_static(body));
        }

        pub fn remove_framework(&self, name: &str) {
            self.frameworks.lock().unwrap().remove(name);
        }

        pub fn slow_binary(&self, delay: Duration) {
            *self.binary_delay.lock().unwrap() = Some(delay);
        }

        pub fn binary_fetches(&self) -> usize {
            self.binary_fetches.load(Ordering::SeqCst)
        }

        pub fn framework_fetches(&self) -> usize {
            self.framework_fetches.load(Ordering::SeqCst)
        }
    }

    pub fn script_for(version: &str) -> String {
        format!(
            "#!/bin/sh\ncase \"$1\" in\n  version) echo \"Your current version is: {version}\" ;;\n  *) echo '[]' ;;\nesac\n"
        )
    }

    impl ArtifactSource for MemorySource {
        async fn latest_version(&self) -> Result<String, InstallerError> {
            self.latest
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| InstallerError::Fetch {
                    artifact: "latest release".to_owned(),
                    reason: "offline".to_owned(),
                })
        }

        async fn fetch_binary(
            &self,
            version: &str,
            _platform: Platform,
            progress: &ProgressReporter,
        ) -> Result<Bytes, InstallerError> {
            self.binary_fetches.fetch_add(1, Ordering::SeqCst);
            let delay = *self.binary_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            progress.report(1.0);
            Ok(Bytes::from(script_for(version)))
        }

        async fn fetch_framework(&self, name: &str) -> Result<Bytes, InstallerError> {
            self.framework_fetches.fetch_add(1, Ordering::SeqCst);
            self.frameworks
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| InstallerError::FrameworkNotFound(name.to_owned()))
        }
    }
}

use kubescape_core::ui::TracingUi;
use mock::{MemorySource, script_for};

fn config(dir: &Path, version: &str, required: &[&str], scan: &[&str]) -> InstallConfig {
    InstallConfigBuilder::new()
        .version(version)
        .base_directory(dir)
        .frameworks_directory(dir.join("frameworks"))
        .required_frameworks(required)
        .scan_frameworks(scan)
        .build()
        .expect("valid test config")
}

fn installer(source: &Arc<MemorySource>) -> ArtifactInstaller<MemorySource> {
    ArtifactInstaller::new(Arc::clone(source), Platform::Linux)
}

#[tokio::test]
async fn fresh_install_with_pinned_version() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]);

    let state = installer(&source)
        .ensure_installed(&TracingUi, &config, &CancellationToken::new())
        .await
        .expect("install should succeed");

    assert_eq!(state.version, "v2.3.1");
    assert!(!state.is_latest);
    assert!(state.has_framework("nsa"));
    assert_eq!(state.scan_frameworks, vec!["nsa"]);
    assert_eq!(state.binary_path, dir.path().join("kubescape"));
    assert!(state.binary_path.exists());
    assert!(dir.path().join("frameworks/nsa.json").exists());

    let manifest = InstallManifest::load(dir.path()).await.expect("manifest written");
    assert_eq!(manifest.version, "v2.3.1");
    assert_eq!(manifest.platform, Platform::Linux);
    assert_eq!(source.binary_fetches(), 1);
}

#[tokio::test]
async fn latest_request_marks_state_latest() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let config = config(dir.path(), "latest", &["nsa"], &["nsa"]);

    let state = installer(&source)
        .ensure_installed(&TracingUi, &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(state.version, "v3.0.8");
    assert!(state.is_latest);
}

#[tokio::test]
async fn second_install_does_not_refetch() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["nsa", "mitre"]);
    let installer = installer(&source);
    let cancel = CancellationToken::new();

    let first = installer.ensure_installed(&TracingUi, &config, &cancel).await.unwrap();
    let binary_fetches = source.binary_fetches();
    let framework_fetches = source.framework_fetches();

    let second = installer.ensure_installed(&TracingUi, &config, &cancel).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.binary_fetches(), binary_fetches);
    assert_eq!(source.framework_fetches(), framework_fetches);
}

#[tokio::test]
async fn version_change_replaces_binary() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let installer = installer(&source);
    let cancel = CancellationToken::new();

    installer
        .ensure_installed(&TracingUi, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]), &cancel)
        .await
        .unwrap();
    let state = installer
        .ensure_installed(&TracingUi, &config(dir.path(), "latest", &["nsa"], &["nsa"]), &cancel)
        .await
        .unwrap();

    assert_eq!(state.version, "v3.0.8");
    assert_eq!(source.binary_fetches(), 2);
    let on_disk = std::fs::read_to_string(&state.binary_path).unwrap();
    assert_eq!(on_disk, script_for("v3.0.8"));
}

#[tokio::test]
async fn missing_required_framework_fails() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let config = config(dir.path(), "v2.3.1", &["nsa", "cis-v1.23"], &["nsa"]);

    let err = installer(&source)
        .ensure_installed(&TracingUi, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::FrameworkNotFound(ref n) if n == "cis-v1.23"));
}

#[tokio::test]
async fn missing_scan_only_framework_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["nsa", "armobest"]);

    let state = installer(&source)
        .ensure_installed(&TracingUi, &config, &CancellationToken::new())
        .await
        .expect("optional framework failure must not fail the install");

    assert!(state.has_framework("nsa"));
    assert!(!state.has_framework("armobest"));
    assert_eq!(state.scan_frameworks, vec!["nsa"]);
}

#[tokio::test]
async fn failing_every_scan_framework_fails_the_install() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    source.remove_framework("mitre");
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["mitre"]);

    let err = installer(&source)
        .ensure_installed(&TracingUi, &config, &CancellationToken::new())
        .await
        .expect_err("an unrestricted scan must not be the fallback");

    assert!(matches!(err, InstallerError::NoScanFrameworks(ref n) if n == "mitre"));
    // 필수 프레임워크는 이미 자리잡음
    assert!(dir.path().join("frameworks/nsa.json").exists());
}

#[tokio::test]
async fn scan_only_framework_is_installed_when_available() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    source.add_framework("armobest", b"[]");
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["armobest"]);

    let state = installer(&source)
        .ensure_installed(&TracingUi, &config, &CancellationToken::new())
        .await
        .unwrap();

    assert!(state.has_framework("armobest"));
    assert_eq!(state.scan_frameworks, vec!["armobest"]);
}

#[tokio::test]
async fn invalid_required_framework_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    source.add_framework("nsa", b"Not Found");
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]);

    let err = installer(&source)
        .ensure_installed(&TracingUi, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::InvalidArtifact { .. }));
    assert!(!dir.path().join("frameworks/nsa.json").exists());
}

#[tokio::test]
async fn missing_manifest_is_recovered_by_probe() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]);
    let installer = installer(&source);
    let cancel = CancellationToken::new();

    installer.ensure_installed(&TracingUi, &config, &cancel).await.unwrap();
    InstallManifest::remove(dir.path()).await.unwrap();

    let state = installer.ensure_installed(&TracingUi, &config, &cancel).await.unwrap();

    assert_eq!(state.version, "v2.3.1");
    assert_eq!(source.binary_fetches(), 1, "probed binary must not be refetched");
    let repaired = InstallManifest::load(dir.path()).await.expect("manifest repaired");
    assert_eq!(repaired.version, "v2.3.1");
}

#[tokio::test]
async fn unusable_binary_without_manifest_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]);

    // 부분 설치: 매니페스트 없이 실행 불가능한 바이너리만 존재
    std::fs::write(dir.path().join("kubescape"), b"\x7fELF truncated").unwrap();

    let state = installer(&source)
        .ensure_installed(&TracingUi, &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(state.version, "v2.3.1");
    assert_eq!(source.binary_fetches(), 1);
}

#[tokio::test]
async fn platform_mismatch_forces_reinstall() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]);
    let installer = installer(&source);
    let cancel = CancellationToken::new();

    installer.ensure_installed(&TracingUi, &config, &cancel).await.unwrap();
    InstallManifest::new("v2.3.1", Platform::MacOs)
        .store(dir.path())
        .await
        .unwrap();

    installer.ensure_installed(&TracingUi, &config, &cancel).await.unwrap();

    assert_eq!(source.binary_fetches(), 2);
    let manifest = InstallManifest::load(dir.path()).await.unwrap();
    assert_eq!(manifest.platform, Platform::Linux);
}

#[tokio::test]
async fn offline_latest_keeps_existing_install() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    let config = config(dir.path(), "latest", &["nsa"], &["nsa"]);
    let installer = installer(&source);
    let cancel = CancellationToken::new();

    installer.ensure_installed(&TracingUi, &config, &cancel).await.unwrap();
    source.go_offline();

    let state = installer.ensure_installed(&TracingUi, &config, &cancel).await.unwrap();

    assert_eq!(state.version, "v3.0.8");
    assert!(!state.is_latest);
    assert_eq!(source.binary_fetches(), 1);
}

#[tokio::test]
async fn offline_latest_without_install_is_resolution_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    source.go_offline();
    let config = config(dir.path(), "latest", &["nsa"], &["nsa"]);

    let err = installer(&source)
        .ensure_installed(&TracingUi, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::Resolution { .. }));
    assert_eq!(source.binary_fetches(), 0);
}

#[tokio::test]
async fn cancellation_during_download_leaves_no_binary() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemorySource::new("v3.0.8"));
    source.slow_binary(Duration::from_secs(30));
    let config = config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        installer(&source).ensure_installed(&TracingUi, &config, &cancel),
    )
    .await
    .expect("cancelled install must settle promptly");

    assert!(matches!(result, Err(InstallerError::Cancelled)));
    assert!(!dir.path().join("kubescape").exists());
    assert!(InstallManifest::load(dir.path()).await.is_none());
}
