//! Kubescape Facade -- setup, 스캔, 설치 상태 조회
//!
//! [`KubescapeApi`]는 프로세스당 하나 생성되어 호출자에게 주입되는 컨텍스트 객체입니다.
//! 설치 상태는 `RwLock<Option<Arc<InstalledState>>>`로 보관하며,
//! setup 성공 시점에 통째로 교체됩니다. 읽기 쪽은 `Arc`를 복제해 가져가므로
//! 진행 중인 setup과 동시에 조회해도 부분 상태를 관찰하지 않습니다.
//!
//! # 동시성
//! - `setup` 호출끼리는 `tokio::sync::Mutex`로 직렬화
//! - 스캔은 그 락을 잡지 않으며, 호출마다 자식 프로세스 하나를 독립적으로 실행

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use kubescape_core::config::{InstallConfig, SourceConfig};
use kubescape_core::error::KubescapeError;
use kubescape_core::metrics as m;
use kubescape_core::types::{InstalledState, Platform, ScanResults};
use kubescape_core::ui::KubescapeUi;
use kubescape_installer::{ArtifactInstaller, ArtifactSource, GithubSource};
use kubescape_runner::command::list_frameworks_args;
use kubescape_runner::{
    ProcessRunner, RunnerError, ScanArgs, ScannerCommand, parse_framework_list, parse_scan_output,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// setup 실패 시 안내할 설치 문제 해결 문서
pub const TROUBLESHOOTING_URL: &str =
    "https://github.com/kubescape/kubescape/blob/master/docs/installation.md";

/// Kubescape 설치/스캔 Facade
pub struct KubescapeApi<S> {
    installer: ArtifactInstaller<S>,
    runner: ProcessRunner,
    state: RwLock<Option<Arc<InstalledState>>>,
    setup_lock: Mutex<()>,
}

impl KubescapeApi<GithubSource> {
    /// GitHub 릴리스를 아티팩트 소스로 사용하는 Facade를 생성합니다.
    pub fn github(source: SourceConfig) -> Result<Self, KubescapeError> {
        let source = GithubSource::new(source)?;
        Ok(Self::new(Arc::new(source), Platform::current()))
    }
}

impl<S: ArtifactSource> KubescapeApi<S> {
    /// 아티팩트 소스와 대상 플랫폼으로 Facade를 생성합니다.
    ///
    /// `platform`은 내려받을 바이너리와 명령줄 문법을 함께 결정합니다.
    pub fn new(source: Arc<S>, platform: Platform) -> Self {
        let runner = ProcessRunner::new(platform);
        Self {
            installer: ArtifactInstaller::new(source, platform).with_runner(runner.clone()),
            runner,
            state: RwLock::new(None),
            setup_lock: Mutex::new(()),
        }
    }

    /// 프로세스 실행기를 교체합니다 (진행률 틱 간격 조정 등).
    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.installer = self.installer.with_runner(runner.clone());
        self.runner = runner;
        self
    }

    /// 대상 플랫폼
    pub fn platform(&self) -> Platform {
        self.installer.platform()
    }

    /// 바이너리와 프레임워크 설치를 보장합니다.
    ///
    /// 실패는 `ui.error`와 `ui.show_help`로 알리고 `false`를 반환합니다.
    /// 취소는 실패가 아니므로 에러 알림 없이 `false`를 반환합니다.
    /// 실패한 setup은 이전에 성공한 설치 상태를 건드리지 않습니다.
    pub async fn setup<U: KubescapeUi>(
        &self,
        ui: &U,
        config: &InstallConfig,
        cancel: &CancellationToken,
    ) -> bool {
        match self.try_setup(ui, config, cancel).await {
            Ok(_) => true,
            Err(e) if e.is_cancelled() => {
                ui.debug("Kubescape setup was cancelled");
                false
            }
            Err(e) => {
                ui.error(&format!("Failed to set up Kubescape: {e}"));
                ui.show_help(
                    "Kubescape could not be installed. See the installation guide for manual steps.",
                    TROUBLESHOOTING_URL,
                );
                false
            }
        }
    }

    /// [`setup`](Self::setup)과 같지만 실패 원인을 타입으로 반환합니다.
    pub async fn try_setup<U: KubescapeUi>(
        &self,
        ui: &U,
        config: &InstallConfig,
        cancel: &CancellationToken,
    ) -> Result<Arc<InstalledState>, KubescapeError> {
        config.validate()?;

        let _guard = self.setup_lock.lock().await;
        let result = self.installer.ensure_installed(ui, config, cancel).await;

        let outcome = match &result {
            Ok(_) => m::RESULT_SUCCESS,
            Err(e) if e.is_cancelled() => m::RESULT_CANCELLED,
            Err(_) => m::RESULT_FAILURE,
        };
        metrics::counter!(m::SETUP_TOTAL, m::LABEL_RESULT => outcome).increment(1);

        let state = Arc::new(result?);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&state));

        info!(
            version = %state.version,
            is_latest = state.is_latest,
            frameworks = ?state.frameworks,
            "kubescape setup complete"
        );
        Ok(state)
    }

    /// 매니페스트 파일 하나를 스캔합니다.
    ///
    /// 설치 확인된 scan 프레임워크로 범위를 제한하고, 로컬 번들을 `--use-from`으로 사용합니다.
    ///
    /// # Errors
    ///
    /// - setup 이전: [`KubescapeError::NotInstalled`] (프로세스를 실행하지 않음)
    /// - 0이 아닌 종료: [`KubescapeError::Execution`]
    /// - 취소: [`KubescapeError::Cancelled`]
    /// - 출력 형식 오류: [`KubescapeError::Parse`]
    pub async fn scan_yaml<U: KubescapeUi>(
        &self,
        ui: &U,
        file: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<ScanResults, KubescapeError> {
        let state = self.require_state()?;
        let file = file.as_ref();

        let command = self.command(&state, scan_args(&state, ScanArgs::file(file)));

        self.run_scan(ui, &format!("Scanning {}", file.display()), &command, cancel)
            .await
    }

    /// 현재 kubeconfig 컨텍스트의 클러스터를 스캔합니다.
    ///
    /// `kubeconfig`가 주어지면 `KUBECONFIG` 환경변수로 주입합니다.
    pub async fn scan_cluster<U: KubescapeUi>(
        &self,
        ui: &U,
        kubeconfig: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<ScanResults, KubescapeError> {
        let state = self.require_state()?;

        let mut command = self.command(&state, scan_args(&state, ScanArgs::cluster()));
        if let Some(kubeconfig) = kubeconfig {
            command = command.with_kubeconfig(kubeconfig);
        }

        self.run_scan(ui, "Scanning cluster", &command, cancel).await
    }

    /// 원격 레지스트리에서 사용 가능한 프레임워크 이름 목록을 조회합니다.
    pub async fn available_frameworks<U: KubescapeUi>(
        &self,
        ui: &U,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, KubescapeError> {
        let state = self.require_state()?;
        let line = self
            .command(&state, list_frameworks_args())
            .to_command_line();

        let stdout = ui
            .slow(
                "Listing frameworks",
                self.runner.run(ui, &line, cancel, None),
            )
            .await?;
        Ok(parse_framework_list(&stdout)?)
    }

    /// 설치된 바이너리로 임의 인자의 명령줄을 조립합니다.
    pub fn build_command(
        &self,
        args: &str,
        kubeconfig: Option<&Path>,
    ) -> Result<String, KubescapeError> {
        let state = self.require_state()?;
        let mut command = self.command(&state, args);
        if let Some(kubeconfig) = kubeconfig {
            command = command.with_kubeconfig(kubeconfig);
        }
        Ok(command.to_command_line())
    }

    // --- 설치 상태 조회 ---

    /// 현재 설치 상태 스냅샷
    pub fn installed_state(&self) -> Option<Arc<InstalledState>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// setup이 한 번이라도 성공했는지 여부
    pub fn is_installed(&self) -> bool {
        self.installed_state().is_some()
    }

    /// 설치된 버전 태그
    pub fn version(&self) -> Option<String> {
        self.installed_state().map(|s| s.version.clone())
    }

    /// 설치된 버전이 원격 최신 버전인지 여부 (setup 이전에는 `false`)
    pub fn is_latest_version(&self) -> bool {
        self.installed_state().is_some_and(|s| s.is_latest)
    }

    /// 로컬에 설치된 프레임워크 이름 (소문자, 정렬)
    pub fn frameworks_names(&self) -> Vec<String> {
        self.installed_state()
            .map(|s| s.frameworks.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 설치된 바이너리 경로
    pub fn path(&self) -> Option<PathBuf> {
        self.installed_state().map(|s| s.binary_path.clone())
    }

    fn require_state(&self) -> Result<Arc<InstalledState>, KubescapeError> {
        self.installed_state().ok_or(KubescapeError::NotInstalled)
    }

    fn command(&self, state: &InstalledState, args: impl Into<String>) -> ScannerCommand {
        ScannerCommand::new(&state.binary_path, args, self.platform())
    }

    async fn run_scan<U: KubescapeUi>(
        &self,
        ui: &U,
        title: &str,
        command: &ScannerCommand,
        cancel: &CancellationToken,
    ) -> Result<ScanResults, KubescapeError> {
        ui.debug(&format!("Running: {command}"));
        let line = command.to_command_line();
        let line = line.as_str();
        let runner = &self.runner;
        let started = Instant::now();

        let result = ui
            .progress(title, cancel, |reporter| async move {
                let stdout = runner.run(ui, line, cancel, Some(&reporter)).await?;
                Ok::<_, RunnerError>(parse_scan_output(&stdout)?)
            })
            .await;

        let outcome = match &result {
            Ok(_) => m::RESULT_SUCCESS,
            Err(RunnerError::Cancelled) => m::RESULT_CANCELLED,
            Err(_) => m::RESULT_FAILURE,
        };
        metrics::counter!(m::SCANS_TOTAL, m::LABEL_RESULT => outcome).increment(1);
        metrics::histogram!(m::SCAN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        let results = result?;
        if results.is_empty() {
            warn!("scan produced no framework results");
            ui.debug("Kubescape evaluated zero frameworks");
        } else {
            debug!(
                frameworks = ?results.framework_names(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "scan complete"
            );
        }
        Ok(results)
    }
}

fn scan_args(state: &InstalledState, args: ScanArgs) -> String {
    args.frameworks(state.scan_frameworks.iter().cloned())
        .bundles(state.scan_frameworks.iter().map(|name| state.framework_path(name)))
        .build()
}
