//! 명령줄 조립 -- 플랫폼별 Kubescape 호출 문자열
//!
//! 출력 형식 (호환성을 위해 정확히 일치해야 함):
//!
//! ```text
//! 자격 증명 없음:          "<path>" <args>
//! POSIX + 자격 증명:       KUBECONFIG="<kubeconfig>" "<path>" <args>
//! Windows + 자격 증명:     set "KUBECONFIG=<kubeconfig>" & "<path>" <args>
//! ```
//!
//! 바이너리 경로를 큰따옴표로 감싸는 것 외에는 이스케이프하지 않습니다.
//! kubeconfig 경로와 인자 문자열은 호출자가 신뢰하는 값이어야 합니다.

use std::fmt;
use std::path::{Path, PathBuf};

use kubescape_core::types::Platform;

/// 자격 증명 파일을 가리키는 환경변수 이름
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// 완성된 Kubescape 호출
///
/// 요청마다 만들어지며 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerCommand {
    binary_path: PathBuf,
    args: String,
    kubeconfig: Option<PathBuf>,
    platform: Platform,
}

impl ScannerCommand {
    /// 새 호출을 생성합니다.
    pub fn new(binary_path: impl Into<PathBuf>, args: impl Into<String>, platform: Platform) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: args.into(),
            kubeconfig: None,
            platform,
        }
    }

    /// `KUBECONFIG` 주입을 설정합니다.
    pub fn with_kubeconfig(mut self, kubeconfig: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(kubeconfig.into());
        self
    }

    /// 바이너리 경로
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// 서브커맨드 및 인자
    pub fn args(&self) -> &str {
        &self.args
    }

    /// 대상 플랫폼
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// 셸에 넘길 명령줄 문자열
    pub fn to_command_line(&self) -> String {
        build_command(
            &self.binary_path,
            &self.args,
            self.kubeconfig.as_deref(),
            self.platform,
        )
    }
}

impl fmt::Display for ScannerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

/// 명령줄 문자열을 조립합니다. 부작용 없는 순수 함수입니다.
///
/// `args`가 비어 있으면 따옴표로 감싼 경로 뒤에 공백을 붙이지 않습니다.
pub fn build_command(
    binary_path: &Path,
    args: &str,
    kubeconfig: Option<&Path>,
    platform: Platform,
) -> String {
    let mut line = String::new();

    if let Some(kubeconfig) = kubeconfig {
        if platform.is_windows() {
            line.push_str(&format!(
                "set \"{KUBECONFIG_ENV}={}\" & ",
                kubeconfig.display()
            ));
        } else {
            line.push_str(&format!("{KUBECONFIG_ENV}=\"{}\" ", kubeconfig.display()));
        }
    }

    line.push_str(&quote(binary_path));

    if !args.is_empty() {
        line.push(' ');
        line.push_str(args);
    }
    line
}

/// 경로를 큰따옴표로 감쌉니다.
fn quote(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

// --- 서브커맨드 인자 ---

/// 스캔 대상
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// 매니페스트 파일
    File(PathBuf),
    /// 현재 kubeconfig 컨텍스트의 클러스터
    Cluster,
}

/// `scan` 서브커맨드 인자 빌더
///
/// 결과는 항상 `--format json --format-version v1 --logger error`로 요청합니다.
/// 번들 경로가 주어지면 각각 `--use-from`으로 넘겨 로컬 파일에서 읽게 합니다.
#[derive(Debug, Clone)]
pub struct ScanArgs {
    target: ScanTarget,
    frameworks: Vec<String>,
    bundles: Vec<PathBuf>,
}

impl ScanArgs {
    /// 파일 스캔 인자
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: ScanTarget::File(path.into()),
            frameworks: Vec::new(),
            bundles: Vec::new(),
        }
    }

    /// 클러스터 스캔 인자
    pub fn cluster() -> Self {
        Self {
            target: ScanTarget::Cluster,
            frameworks: Vec::new(),
            bundles: Vec::new(),
        }
    }

    /// 프레임워크 필터를 설정합니다.
    pub fn frameworks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frameworks = names.into_iter().map(Into::into).collect();
        self
    }

    /// `--use-from`으로 넘길 로컬 프레임워크 번들 파일을 설정합니다.
    pub fn bundles<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.bundles = paths.into_iter().map(Into::into).collect();
        self
    }

    /// 인자 문자열을 생성합니다.
    pub fn build(&self) -> String {
        let mut parts: Vec<String> = vec!["scan".to_owned()];

        if !self.frameworks.is_empty() {
            parts.push("framework".to_owned());
            parts.push(self.frameworks.join(","));
        }

        if let ScanTarget::File(path) = &self.target {
            parts.push(quote(path));
        }

        parts.push("--format json --format-version v1 --logger error".to_owned());

        for bundle in &self.bundles {
            parts.push(format!("--use-from {}", quote(bundle)));
        }

        parts.join(" ")
    }
}

/// 원격 프레임워크 목록 조회 인자
pub fn list_frameworks_args() -> &'static str {
    "list frameworks --format json"
}

/// 버전 조회 인자
pub fn version_args() -> &'static str {
    "version"
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIN: &str = "/home/user/.kubescape/kubescape";

    #[test]
    fn no_credentials_quotes_binary_path() {
        let line = build_command(Path::new(BIN), "scan", None, Platform::Linux);
        assert_eq!(line, format!("\"{BIN}\" scan"));
    }

    #[test]
    fn no_credentials_is_identical_on_windows() {
        let line = build_command(Path::new(BIN), "scan", None, Platform::Windows);
        assert_eq!(line, format!("\"{BIN}\" scan"));
    }

    #[test]
    fn posix_credentials_prefix_env_assignment() {
        let line = build_command(
            Path::new(BIN),
            "scan",
            Some(Path::new("kubeconfig_path")),
            Platform::Linux,
        );
        assert_eq!(line, format!("KUBECONFIG=\"kubeconfig_path\" \"{BIN}\" scan"));

        let mac = build_command(
            Path::new(BIN),
            "scan",
            Some(Path::new("kubeconfig_path")),
            Platform::MacOs,
        );
        assert_eq!(mac, line);
    }

    #[test]
    fn windows_credentials_use_set_and_ampersand() {
        let line = build_command(
            Path::new(BIN),
            "scan",
            Some(Path::new("kubeconfig_path")),
            Platform::Windows,
        );
        assert_eq!(
            line,
            format!("set \"KUBECONFIG=kubeconfig_path\" & \"{BIN}\" scan")
        );
    }

    #[test]
    fn empty_args_have_no_trailing_space() {
        let line = build_command(Path::new(BIN), "", None, Platform::Linux);
        assert_eq!(line, format!("\"{BIN}\""));
    }

    #[test]
    fn scanner_command_display_matches_builder() {
        let cmd = ScannerCommand::new(BIN, "version", Platform::Linux).with_kubeconfig("/kc");
        assert_eq!(cmd.to_string(), format!("KUBECONFIG=\"/kc\" \"{BIN}\" version"));
        assert_eq!(cmd.args(), "version");
        assert_eq!(cmd.binary_path(), Path::new(BIN));
    }

    #[test]
    fn scan_file_args_with_frameworks() {
        let args = ScanArgs::file("deploy/priv1.yaml")
            .frameworks(["nsa", "mitre"])
            .bundles(["/fw/nsa.json", "/fw/mitre.json"])
            .build();
        assert_eq!(
            args,
            "scan framework nsa,mitre \"deploy/priv1.yaml\" \
             --format json --format-version v1 --logger error \
             --use-from \"/fw/nsa.json\" --use-from \"/fw/mitre.json\""
        );
    }

    #[test]
    fn scan_cluster_args_omit_target() {
        let args = ScanArgs::cluster().frameworks(["nsa"]).build();
        assert_eq!(
            args,
            "scan framework nsa --format json --format-version v1 --logger error"
        );
    }

    #[test]
    fn scan_without_framework_filter() {
        let args = ScanArgs::file("a.yaml").build();
        assert_eq!(
            args,
            "scan \"a.yaml\" --format json --format-version v1 --logger error"
        );
    }

    #[test]
    fn fixed_subcommands() {
        assert_eq!(list_frameworks_args(), "list frameworks --format json");
        assert_eq!(version_args(), "version");
    }

    #[cfg(test)]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn command_ends_with_quoted_path_and_args(
                path in "/[a-zA-Z0-9_/.-]{1,60}",
                args in "[a-z][a-z -]{0,40}",
            ) {
                let line = build_command(Path::new(&path), &args, None, Platform::Linux);
                prop_assert_eq!(line, format!("\"{}\" {}", path, args));
            }

            #[test]
            fn posix_credential_prefix_is_stable(
                path in "/[a-zA-Z0-9_/.-]{1,60}",
                kc in "[a-zA-Z0-9_/.-]{1,60}",
            ) {
                let line = build_command(Path::new(&path), "scan", Some(Path::new(&kc)), Platform::Linux);
                let expected_prefix = format!("KUBECONFIG=\"{}\" ", kc);
                prop_assert!(line.starts_with(&expected_prefix));
                let expected_suffix = format!("\"{}\" scan", path);
                prop_assert!(line.ends_with(&expected_suffix));
            }

            #[test]
            fn windows_credential_prefix_is_stable(
                path in "[A-Z]:\\\\[a-zA-Z0-9_.-]{1,40}",
                kc in "[a-zA-Z0-9_.-]{1,40}",
            ) {
                let line = build_command(Path::new(&path), "scan", Some(Path::new(&kc)), Platform::Windows);
                prop_assert_eq!(line, format!("set \"KUBECONFIG={}\" & \"{}\" scan", kc, path));
            }
        }
    }
}
