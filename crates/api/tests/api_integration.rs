//! 통합 테스트 -- setup → scan_yaml / scan_cluster 전체 흐름
//!
//! 인메모리 아티팩트 소스가 내려주는 "바이너리"는 인자에 따라 fixture JSON을
//! 출력하는 셸 스크립트입니다. 실제 `sh` 프로세스를 실행하므로 unix 전용입니다.

#![cfg(unix)]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kubescape_api::{KubescapeApi, TROUBLESHOOTING_URL};
use kubescape_core::config::{InstallConfig, InstallConfigBuilder};
use kubescape_core::error::KubescapeError;
use kubescape_core::types::Platform;
use kubescape_installer::{ArtifactSource, InstallerError};
use kubescape_runner::ProcessRunner;
use tokio_util::sync::CancellationToken;

/// 스캐너 대역 스크립트
///
/// - `version`: 버전 문자열 출력
/// - `list frameworks`: 프레임워크 이름 배열 출력
/// - `scan framework a,b ...`: 프레임워크마다 대문자 이름의 결과 객체 출력
/// - 파일명에 `slow` / `crash` / `garbage`가 있으면 각각 대기 / 종료 코드 3 / 비 JSON 출력
/// - 클러스터 스캔(파일 인자 없음)은 `KUBECONFIG`가 없으면 종료 코드 2
const SCANNER_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  version) echo "Your current version is: __VERSION__"; exit 0 ;;
  list) echo '["AllControls","NSA","MITRE"]'; exit 0 ;;
esac
case "$*" in
  *slow.yaml*) sleep 30 ;;
  *crash.yaml*) echo "panic: runtime error" >&2; exit 3 ;;
  *garbage.yaml*) echo "this is not json"; exit 0 ;;
  *.yaml*) ;;
  *) if [ -z "$KUBECONFIG" ]; then echo "no kubeconfig" >&2; exit 2; fi ;;
esac
out=""
if [ "$2" = "framework" ]; then
  old_ifs="$IFS"
  IFS=','
  for f in $3; do
    name=$(echo "$f" | tr '[:lower:]' '[:upper:]')
    entry="{\"name\":\"$name\",\"controlReports\":[{\"controlID\":\"C-0016\",\"name\":\"Allow privilege escalation\",\"failedResources\":1}],\"failedResources\":1,\"warningResources\":0,\"totalResources\":1}"
    if [ -z "$out" ]; then out="$entry"; else out="$out,$entry"; fi
  done
  IFS="$old_ifs"
fi
echo "[$out]"
"#;

const PRIVILEGED_POD: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: escalation
spec:
  containers:
    - name: app
      image: nginx
      securityContext:
        allowPrivilegeEscalation: true
        privileged: true
"#;

// In-memory artifact source and test UI
mod mock {
    use super::*;
    use bytes::Bytes;
    use kubescape_core::ui::{KubescapeUi, ProgressReporter};
    use std::future::Future;
    use std::sync::Mutex;

    pub struct ScriptSource {
        latest: String,
        pub binary_fetches: AtomicUsize,
        pub framework_fetches: AtomicUsize,
    }

    impl ScriptSource {
        pub fn new(latest: &str) -> Self {
            Self {
                latest: latest.to_owned(),
                binary_fetches: AtomicUsize::new(0),
                framework_fetches: AtomicUsize::new(0),
            }
        }

        pub fn fetches(&self) -> (usize, usize) {
            (
                self.binary_fetches.load(Ordering::SeqCst),
                self.framework_fetches.load(Ordering::SeqCst),
            )
        }
    }

    impl ArtifactSource for ScriptSource {
        async fn latest_version(&self) -> Result<String, InstallerError> {
            Ok(self.latest.clone())
        }

        async fn fetch_binary(
            &self,
            version: &str,
            _platform: Platform,
            progress: &ProgressReporter,
        ) -> Result<Bytes, InstallerError> {
            self.binary_fetches.fetch_add(1, Ordering::SeqCst);
            progress.report(1.0);
            Ok(Bytes::from(SCANNER_SCRIPT.replace("__VERSION__", version)))
        }

        async fn fetch_framework(&self, name: &str) -> Result<Bytes, InstallerError> {
            self.framework_fetches.fetch_add(1, Ordering::SeqCst);
            match name {
                "nsa" | "mitre" => Ok(Bytes::from(format!("{{\"name\":\"{name}\"}}"))),
                other => Err(InstallerError::FrameworkNotFound(other.to_owned())),
            }
        }
    }

    #[derive(Default)]
    pub struct RecordingUi {
        pub errors: Mutex<Vec<String>>,
        pub help: Mutex<Vec<(String, String)>>,
        pub progress_titles: Mutex<Vec<String>>,
    }

    impl KubescapeUi for RecordingUi {
        fn info(&self, _msg: &str) {}

        fn error(&self, msg: &str) {
            self.errors.lock().unwrap().push(msg.to_owned());
        }

        fn debug(&self, _msg: &str) {}

        fn show_help(&self, message: &str, url: &str) {
            self.help
                .lock()
                .unwrap()
                .push((message.to_owned(), url.to_owned()));
        }

        async fn slow<T, F>(&self, _title: &str, work: F) -> T
        where
            F: Future<Output = T> + Send,
            T: Send,
        {
            work.await
        }

        async fn progress<T, F, Fut>(&self, title: &str, _cancel: &CancellationToken, work: F) -> T
        where
            F: FnOnce(ProgressReporter) -> Fut + Send,
            Fut: Future<Output = T> + Send,
            T: Send,
        {
            self.progress_titles.lock().unwrap().push(title.to_owned());
            work(ProgressReporter::noop()).await
        }
    }
}

use mock::{RecordingUi, ScriptSource};

fn config(dir: &Path, version: &str, required: &[&str], scan: &[&str]) -> InstallConfig {
    InstallConfigBuilder::new()
        .version(version)
        .base_directory(dir.join("bin"))
        .frameworks_directory(dir.join("frameworks"))
        .required_frameworks(required)
        .scan_frameworks(scan)
        .build()
        .expect("valid test config")
}

fn api(source: &Arc<ScriptSource>) -> KubescapeApi<ScriptSource> {
    KubescapeApi::new(Arc::clone(source), Platform::Linux)
        .with_runner(ProcessRunner::new(Platform::Linux).with_tick_interval(Duration::from_millis(20)))
}

fn manifest(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn pinned_setup_reports_version_and_frameworks() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();

    let ok = api
        .setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]), &CancellationToken::new())
        .await;

    assert!(ok, "setup failed: {:?}", ui.errors.lock().unwrap());
    assert_eq!(api.version().as_deref(), Some("v2.3.1"));
    assert!(!api.is_latest_version());
    assert!(api.frameworks_names().iter().any(|f| f.eq_ignore_ascii_case("NSA")));
    assert_eq!(api.path(), Some(dir.path().join("bin/kubescape")));
}

#[tokio::test]
async fn latest_setup_is_latest() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);

    assert!(
        api.setup(
            &RecordingUi::default(),
            &config(dir.path(), "latest", &["nsa"], &["nsa"]),
            &CancellationToken::new()
        )
        .await
    );
    assert_eq!(api.version().as_deref(), Some("v3.0.8"));
    assert!(api.is_latest_version());
}

#[tokio::test]
async fn scan_yaml_returns_result_per_scan_framework() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();
    let install = config(dir.path(), "v2.3.1", &["nsa"], &["nsa", "mitre"]);
    assert!(api.setup(&ui, &install, &cancel).await);

    let file = manifest(dir.path(), "pod.yaml", PRIVILEGED_POD);
    let results = api.scan_yaml(&ui, &file, &cancel).await.expect("scan succeeds");

    assert!(!results.is_empty());
    let names: BTreeSet<String> = results.iter().map(|r| r.name.to_ascii_lowercase()).collect();
    for framework in &install.scan_frameworks {
        assert!(names.contains(framework), "missing result for {framework}");
    }
    // 스캐너가 보고한 대소문자는 보존됨
    assert!(results.find("nsa").is_some_and(|r| r.name == "NSA"));
    assert!(results.iter().all(|r| r.has_failures()));
    assert!(
        ui.progress_titles
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.starts_with("Scanning"))
    );
}

#[tokio::test]
async fn second_setup_does_not_refetch() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();
    let install = config(dir.path(), "v2.3.1", &["nsa"], &["nsa", "mitre"]);

    assert!(api.setup(&ui, &install, &cancel).await);
    let after_first = source.fetches();
    assert!(api.setup(&ui, &install, &cancel).await);

    assert_eq!(source.fetches(), after_first);
}

#[tokio::test]
async fn setup_with_new_version_reinstalls() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();

    assert!(api.setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]), &cancel).await);
    assert!(api.setup(&ui, &config(dir.path(), "latest", &["nsa"], &["nsa"]), &cancel).await);

    assert_eq!(source.fetches().0, 2);
    assert_eq!(api.version().as_deref(), Some("v3.0.8"));
}

#[tokio::test]
async fn failed_setup_reports_error_and_help() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();

    let ok = api
        .setup(
            &ui,
            &config(dir.path(), "v2.3.1", &["nsa", "cis-v1.23"], &["nsa"]),
            &CancellationToken::new(),
        )
        .await;

    assert!(!ok);
    assert!(!api.is_installed());
    let errors = ui.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("cis-v1.23"));
    let help = ui.help.lock().unwrap();
    assert_eq!(help.len(), 1);
    assert_eq!(help[0].1, TROUBLESHOOTING_URL);
}

#[tokio::test]
async fn unavailable_scan_frameworks_fail_setup_instead_of_scanning_everything() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();

    let ok = api
        .setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["armobest"]), &cancel)
        .await;

    assert!(!ok);
    assert!(!api.is_installed());
    assert!(ui.errors.lock().unwrap()[0].contains("armobest"));

    let file = manifest(dir.path(), "pod.yaml", PRIVILEGED_POD);
    let err = api.scan_yaml(&ui, &file, &cancel).await.unwrap_err();
    assert!(matches!(err, KubescapeError::NotInstalled));
}

#[tokio::test]
async fn cancelled_setup_is_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let ok = api
        .setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]), &cancel)
        .await;

    assert!(!ok);
    assert!(ui.errors.lock().unwrap().is_empty());
    assert!(ui.help.lock().unwrap().is_empty());
    assert_eq!(source.fetches().0, 0);
}

#[tokio::test]
async fn cancelling_scan_settles_as_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    assert!(
        api.setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]), &CancellationToken::new())
            .await
    );

    let file = manifest(dir.path(), "slow.yaml", PRIVILEGED_POD);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(10), api.scan_yaml(&ui, &file, &cancel))
        .await
        .expect("cancelled scan must not hang");

    assert!(matches!(result, Err(KubescapeError::Cancelled)));
}

#[tokio::test]
async fn crashing_scanner_is_execution_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();
    assert!(api.setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]), &cancel).await);

    let file = manifest(dir.path(), "crash.yaml", PRIVILEGED_POD);
    let err = api.scan_yaml(&ui, &file, &cancel).await.unwrap_err();

    match err {
        KubescapeError::Execution { exit_code, stderr } => {
            assert_eq!(exit_code, Some(3));
            assert!(stderr.contains("panic"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_output_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();
    assert!(api.setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]), &cancel).await);

    let file = manifest(dir.path(), "garbage.yaml", PRIVILEGED_POD);
    let err = api.scan_yaml(&ui, &file, &cancel).await.unwrap_err();

    assert!(matches!(err, KubescapeError::Parse(_)));
}

#[tokio::test]
async fn cluster_scan_injects_kubeconfig() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();
    assert!(api.setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]), &cancel).await);

    let kubeconfig = manifest(dir.path(), "kube config", "apiVersion: v1\nkind: Config\n");
    let results = api
        .scan_cluster(&ui, Some(&kubeconfig), &cancel)
        .await
        .expect("cluster scan with kubeconfig");
    assert!(results.contains("nsa"));
}

#[tokio::test]
async fn concurrent_scans_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();
    assert!(
        api.setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa", "mitre"]), &cancel)
            .await
    );

    let good = manifest(dir.path(), "pod.yaml", PRIVILEGED_POD);
    let bad = manifest(dir.path(), "crash.yaml", PRIVILEGED_POD);
    let (ok, failed) = tokio::join!(
        api.scan_yaml(&ui, &good, &cancel),
        api.scan_yaml(&ui, &bad, &cancel)
    );

    assert_eq!(ok.unwrap().len(), 2);
    assert!(matches!(failed, Err(KubescapeError::Execution { .. })));
}

#[tokio::test]
async fn available_frameworks_lists_remote_names() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptSource::new("v3.0.8"));
    let api = api(&source);
    let ui = RecordingUi::default();
    let cancel = CancellationToken::new();
    assert!(api.setup(&ui, &config(dir.path(), "v2.3.1", &["nsa"], &["nsa"]), &cancel).await);

    let names = api.available_frameworks(&ui, &cancel).await.unwrap();
    assert_eq!(names, vec!["AllControls", "NSA", "MITRE"]);
}
