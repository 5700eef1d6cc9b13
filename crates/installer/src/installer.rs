//! 아티팩트 설치기 -- 바이너리와 프레임워크 번들을 디스크에 보장
//!
//! # 알고리즘
//! 1. 로컬 설치본 확인 (매니페스트, 없으면 `"<path>" version` 프로브)
//! 2. 대상 버전 결정 ([`resolve_version`])
//! 3. 바이너리가 없거나, 버전이 다르거나, 플랫폼이 다르면 내려받아 원자적으로 교체
//! 4. `required ∪ scan` 프레임워크 중 없는 것만 내려받기
//! 5. 모든 아티팩트가 자리잡은 뒤 [`InstalledState`] 하나를 반환
//!
//! 필수 프레임워크 실패는 설치 실패입니다. scan 목록에만 있는 프레임워크는
//! best-effort로 처리하며, 실패하면 경고 후 스캔 대상에서 제외됩니다.
//! 단, 스캔 대상이 하나도 남지 않으면 설치 실패입니다.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use kubescape_core::config::InstallConfig;
use kubescape_core::metrics::{KIND_BINARY, KIND_FRAMEWORK};
use kubescape_core::types::{InstalledState, Platform};
use kubescape_core::ui::KubescapeUi;
use kubescape_runner::command::version_args;
use kubescape_runner::{ProcessRunner, RunnerError, ScannerCommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::atomic::write_atomic;
use crate::error::InstallerError;
use crate::manifest::InstallManifest;
use crate::source::{ArtifactSource, record_fetch};
use crate::version::{ResolvedVersion, extract_version, resolve_version, versions_match};

/// 로컬에서 발견된 바이너리
#[derive(Debug, Clone, PartialEq, Eq)]
struct LocalBinary {
    version: String,
    platform: Platform,
    from_manifest: bool,
}

/// 바이너리 / 프레임워크 설치기
pub struct ArtifactInstaller<S> {
    source: Arc<S>,
    platform: Platform,
    runner: ProcessRunner,
}

impl<S: ArtifactSource> ArtifactInstaller<S> {
    /// 새 설치기를 생성합니다.
    ///
    /// `platform`은 내려받을 바이너리의 대상 플랫폼입니다.
    pub fn new(source: Arc<S>, platform: Platform) -> Self {
        Self {
            source,
            platform,
            runner: ProcessRunner::default(),
        }
    }

    /// 버전 프로브에 사용할 실행기를 설정합니다.
    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    /// 대상 플랫폼
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// 아티팩트 소스
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// 설정에 따른 바이너리 경로
    pub fn binary_path(&self, config: &InstallConfig) -> PathBuf {
        config.base_directory.join(self.platform.binary_name())
    }

    /// 바이너리와 프레임워크가 사용 가능한 상태인지 보장합니다.
    ///
    /// 성공 시 완성된 [`InstalledState`]를 반환합니다. 실패 시 이미 자리잡은
    /// 아티팩트는 그대로 두지만 상태 객체는 만들어지지 않습니다.
    pub async fn ensure_installed<U: KubescapeUi>(
        &self,
        ui: &U,
        config: &InstallConfig,
        cancel: &CancellationToken,
    ) -> Result<InstalledState, InstallerError> {
        create_dir(&config.base_directory).await?;
        create_dir(&config.frameworks_directory).await?;

        let binary_path = self.binary_path(config);
        let local = self
            .detect_local(ui, &binary_path, &config.base_directory, cancel)
            .await?;

        let resolved = cancellable(
            cancel,
            resolve_version(
                self.source.as_ref(),
                &config.version_request(),
                local.as_ref().map(|l| l.version.as_str()),
            ),
        )
        .await?;

        match local {
            Some(ref local) if !self.needs_binary(local, &resolved) => {
                ui.debug(&format!("Kubescape {} is already installed", local.version));
                if !local.from_manifest {
                    // 프로브로 확인된 설치본은 매니페스트를 복구해 둠
                    let manifest = InstallManifest::new(&local.version, self.platform);
                    if let Err(e) = manifest.store(&config.base_directory).await {
                        warn!(error = %e, "failed to repair install manifest");
                    }
                }
            }
            _ => {
                self.install_binary(ui, config, &resolved.version, cancel)
                    .await?;
            }
        }

        let frameworks = self.ensure_frameworks(ui, config, cancel).await?;

        let mut scan_frameworks: Vec<String> = Vec::new();
        for name in &config.scan_frameworks {
            let name = name.to_ascii_lowercase();
            if frameworks.contains(&name) && !scan_frameworks.contains(&name) {
                scan_frameworks.push(name);
            }
        }
        if scan_frameworks.is_empty() {
            // 빈 목록으로 스캔하면 프레임워크 제한 없이 실행됨
            return Err(InstallerError::NoScanFrameworks(
                config.scan_frameworks.join(", "),
            ));
        }

        info!(
            version = %resolved.version,
            is_latest = resolved.is_latest,
            path = %binary_path.display(),
            frameworks = frameworks.len(),
            "kubescape installation ready"
        );

        Ok(InstalledState {
            binary_path,
            version: resolved.version,
            is_latest: resolved.is_latest,
            frameworks,
            frameworks_directory: config.frameworks_directory.clone(),
            scan_frameworks,
            platform: self.platform,
        })
    }

    fn needs_binary(&self, local: &LocalBinary, resolved: &ResolvedVersion) -> bool {
        if local.platform != self.platform {
            debug!(
                installed = %local.platform,
                target = %self.platform,
                "platform mismatch, reinstalling"
            );
            return true;
        }
        !versions_match(&local.version, &resolved.version)
    }

    async fn detect_local<U: KubescapeUi>(
        &self,
        ui: &U,
        binary_path: &Path,
        base_directory: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<LocalBinary>, InstallerError> {
        if !is_non_empty_file(binary_path).await {
            return Ok(None);
        }

        if let Some(manifest) = InstallManifest::load(base_directory).await {
            return Ok(Some(LocalBinary {
                version: manifest.version,
                platform: manifest.platform,
                from_manifest: true,
            }));
        }

        match self.probe_version(ui, binary_path, cancel).await {
            Ok(version) => {
                debug!(version = %version, "probed installed kubescape version");
                Ok(Some(LocalBinary {
                    version,
                    platform: self.platform,
                    from_manifest: false,
                }))
            }
            Err(InstallerError::Cancelled) => Err(InstallerError::Cancelled),
            Err(e) => {
                warn!(error = %e, "installed binary is unusable, treating it as stale");
                ui.debug(&format!("Existing Kubescape binary will be replaced: {e}"));
                Ok(None)
            }
        }
    }

    /// 설치된 바이너리에 `version`을 실행해 버전을 확인합니다.
    pub async fn probe_version<U: KubescapeUi>(
        &self,
        ui: &U,
        binary_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<String, InstallerError> {
        let line = ScannerCommand::new(binary_path, version_args(), self.platform).to_command_line();
        let probe_error = |reason: String| InstallerError::Probe {
            path: binary_path.display().to_string(),
            reason,
        };

        let stdout = self
            .runner
            .run(ui, &line, cancel, None)
            .await
            .map_err(|e| match e {
                RunnerError::Cancelled => InstallerError::Cancelled,
                other => probe_error(other.to_string()),
            })?;

        extract_version(&stdout)
            .ok_or_else(|| probe_error("no version token in output".to_owned()))
    }

    async fn install_binary<U: KubescapeUi>(
        &self,
        ui: &U,
        config: &InstallConfig,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<(), InstallerError> {
        ui.info(&format!("Installing Kubescape {version}"));

        let source = self.source.as_ref();
        let platform = self.platform;
        let fetched = ui
            .progress(
                &format!("Downloading Kubescape {version}"),
                cancel,
                |reporter| async move {
                    cancellable(cancel, source.fetch_binary(version, platform, &reporter)).await
                },
            )
            .await;
        record_fetch(KIND_BINARY, &fetched);
        let bytes = fetched?;

        if bytes.is_empty() {
            return Err(InstallerError::InvalidArtifact {
                artifact: format!("kubescape {version}"),
                reason: "downloaded binary is empty".to_owned(),
            });
        }

        let base = &config.base_directory;
        // 바이너리 교체 도중 중단되면 매니페스트가 없어 다음 setup에서 프로브됨
        InstallManifest::remove(base).await?;
        let path = write_atomic(base, self.platform.binary_name(), bytes, true).await?;
        InstallManifest::new(version, self.platform)
            .store(base)
            .await?;

        info!(version, path = %path.display(), "kubescape binary installed");
        Ok(())
    }

    async fn ensure_frameworks<U: KubescapeUi>(
        &self,
        ui: &U,
        config: &InstallConfig,
        cancel: &CancellationToken,
    ) -> Result<BTreeSet<String>, InstallerError> {
        let mut present = BTreeSet::new();

        for name in config.all_frameworks() {
            match self
                .ensure_framework(ui, &config.frameworks_directory, &name, cancel)
                .await
            {
                Ok(()) => {
                    present.insert(name);
                }
                Err(InstallerError::Cancelled) => return Err(InstallerError::Cancelled),
                Err(e) if config.is_required(&name) => {
                    warn!(framework = %name, error = %e, "required framework unavailable");
                    return Err(e);
                }
                Err(e) => {
                    warn!(framework = %name, error = %e, "optional scan framework unavailable, skipping");
                    ui.info(&format!(
                        "Framework '{name}' could not be installed and will be skipped: {e}"
                    ));
                }
            }
        }

        Ok(present)
    }

    async fn ensure_framework<U: KubescapeUi>(
        &self,
        ui: &U,
        dir: &Path,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), InstallerError> {
        let file_name = format!("{name}.json");
        if is_non_empty_file(&dir.join(&file_name)).await {
            ui.debug(&format!("Framework '{name}' is already present"));
            return Ok(());
        }

        let fetched = ui
            .slow(
                &format!("Downloading framework {name}"),
                cancellable(cancel, self.source.fetch_framework(name)),
            )
            .await;
        record_fetch(KIND_FRAMEWORK, &fetched);
        let bytes = fetched?;

        validate_framework(name, &bytes)?;
        let path = write_atomic(dir, &file_name, bytes, false).await?;
        debug!(framework = name, path = %path.display(), "framework installed");
        Ok(())
    }
}

/// 프레임워크 번들이 JSON 객체 또는 배열인지 확인합니다.
pub fn validate_framework(name: &str, bytes: &Bytes) -> Result<(), InstallerError> {
    let invalid = |reason: String| InstallerError::InvalidArtifact {
        artifact: format!("framework {name}"),
        reason,
    };
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(serde_json::Value::Object(_)) | Ok(serde_json::Value::Array(_)) => Ok(()),
        Ok(_) => Err(invalid("expected a JSON object or array".to_owned())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// 취소 토큰과 작업을 경주시킵니다.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, work: F) -> Result<T, InstallerError>
where
    F: Future<Output = Result<T, InstallerError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(InstallerError::Cancelled),
        result = work => result,
    }
}

async fn create_dir(dir: &Path) -> Result<(), InstallerError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| InstallerError::from_io(dir, e))
}

async fn is_non_empty_file(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}
