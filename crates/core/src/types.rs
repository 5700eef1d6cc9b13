//! 도메인 타입 -- 플랫폼, 설치 상태, 스캔 결과
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 요청 버전 중 "최신"을 의미하는 키워드
pub const LATEST_KEYWORD: &str = "latest";

// ─── Platform ────────────────────────────────────────────────────────

/// 스캐너 바이너리가 실행될 운영체제
///
/// 컴파일 타임 상수 대신 값으로 주입되므로 테스트에서 어느 플랫폼이든
/// 시뮬레이션할 수 있습니다. [`Platform::current`]는 호스트 값을 반환합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux 및 기타 POSIX 계열
    Linux,
    /// macOS (POSIX 계열)
    #[serde(rename = "macos")]
    MacOs,
    /// Windows 계열
    Windows,
}

impl Platform {
    /// 현재 호스트 플랫폼을 반환합니다.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// Windows 계열 여부
    pub fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// GitHub 릴리스 에셋 이름
    pub fn release_asset(self) -> &'static str {
        match self {
            Self::Linux => "kubescape-ubuntu-latest",
            Self::MacOs => "kubescape-macos-latest",
            Self::Windows => "kubescape-windows-latest",
        }
    }

    /// 로컬에 설치될 바이너리 파일명
    pub fn binary_name(self) -> &'static str {
        match self {
            Self::Windows => "kubescape.exe",
            Self::Linux | Self::MacOs => "kubescape",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

// ─── Version ─────────────────────────────────────────────────────────

/// 설정에서 요청된 버전
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    /// 원격 최신 릴리스
    Latest,
    /// 명시적으로 고정된 태그 (`v` 접두어로 정규화됨)
    Pinned(String),
}

impl VersionRequest {
    /// 설정 문자열을 해석합니다. `"latest"`는 대소문자를 구분하지 않습니다.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(LATEST_KEYWORD) {
            Self::Latest
        } else {
            Self::Pinned(normalize_tag(trimmed))
        }
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "{LATEST_KEYWORD}"),
            Self::Pinned(tag) => write!(f, "{tag}"),
        }
    }
}

/// 버전 태그를 `v` 접두어 형식으로 정규화합니다 (`2.3.1` -> `v2.3.1`).
pub fn normalize_tag(tag: &str) -> String {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('v') || trimmed.starts_with('V') {
        format!("v{}", &trimmed[1..])
    } else {
        format!("v{trimmed}")
    }
}

// ─── InstalledState ──────────────────────────────────────────────────

/// 로컬 설치 상태
///
/// Facade가 단독으로 소유하며, setup 완료 시점에 통째로 교체됩니다.
/// 필드 단위 변경은 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledState {
    /// 설치된 바이너리 경로
    pub binary_path: PathBuf,
    /// 설치된 버전 태그
    pub version: String,
    /// 원격 최신 버전과 일치하는지 여부
    pub is_latest: bool,
    /// 로컬에 존재하는 프레임워크 이름 (소문자)
    pub frameworks: BTreeSet<String>,
    /// 프레임워크 번들 디렉토리
    pub frameworks_directory: PathBuf,
    /// 스캔에 사용할 프레임워크 (설치 확인된 것만, 설정 순서 유지)
    pub scan_frameworks: Vec<String>,
    /// 바이너리 대상 플랫폼
    pub platform: Platform,
}

impl InstalledState {
    /// 프레임워크가 설치되어 있는지 대소문자 구분 없이 확인합니다.
    pub fn has_framework(&self, name: &str) -> bool {
        self.frameworks.contains(&name.to_ascii_lowercase())
    }

    /// 프레임워크 번들 파일 경로
    pub fn framework_path(&self, name: &str) -> PathBuf {
        self.frameworks_directory
            .join(format!("{}.json", name.to_ascii_lowercase()))
    }
}

// ─── ScanResult ──────────────────────────────────────────────────────

/// `null`을 빈 목록으로 역직렬화합니다 (검사할 컨트롤이 없는 프레임워크).
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Vec<serde_json::Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// 프레임워크 하나에 대한 스캔 결과
///
/// 이름과 집계값 외의 필드는 `extra`에 그대로 보존됩니다.
/// 스캐너 출력 스키마가 확장되어도 역직렬화가 깨지지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// 프레임워크 이름 (스캐너가 보고한 대소문자 그대로)
    pub name: String,
    /// 컨트롤별 결과 (내용은 해석하지 않음)
    #[serde(rename = "controlReports", default, deserialize_with = "null_as_empty")]
    pub findings: Vec<serde_json::Value>,
    /// 실패한 리소스 수
    #[serde(
        rename = "failedResources",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub failed_resources: Option<u64>,
    /// 경고 리소스 수
    #[serde(
        rename = "warningResources",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub warning_resources: Option<u64>,
    /// 전체 리소스 수
    #[serde(
        rename = "totalResources",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_resources: Option<u64>,
    /// 위험 점수 (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// 알 수 없는 추가 필드
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ScanResult {
    /// 이름이 주어진 프레임워크와 같은지 대소문자 구분 없이 비교합니다.
    pub fn is_named(&self, framework: &str) -> bool {
        self.name.eq_ignore_ascii_case(framework)
    }

    /// 통과한 리소스 수 (전체 - 실패 - 경고)
    ///
    /// 스캐너가 집계값을 보고하지 않았으면 `None`을 반환합니다.
    pub fn passed_resources(&self) -> Option<u64> {
        let total = self.total_resources?;
        let failed = self.failed_resources.unwrap_or(0);
        let warning = self.warning_resources.unwrap_or(0);
        Some(total.saturating_sub(failed).saturating_sub(warning))
    }

    /// 실패한 리소스가 하나라도 있는지 여부
    pub fn has_failures(&self) -> bool {
        self.failed_resources.is_some_and(|n| n > 0)
    }
}

/// 한 번의 스캔에서 생성된 결과 묶음 (프레임워크별, 출력 순서 유지)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResults {
    results: Vec<ScanResult>,
}

impl ScanResults {
    /// 결과 벡터로부터 생성합니다.
    pub fn new(results: Vec<ScanResult>) -> Self {
        Self { results }
    }

    /// 결과 개수
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// 평가된 프레임워크가 없는지 여부
    ///
    /// 빈 결과는 유효하지만 의심스러운 상태입니다. 판단은 호출자 몫입니다.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// 순회
    pub fn iter(&self) -> std::slice::Iter<'_, ScanResult> {
        self.results.iter()
    }

    /// 이름으로 결과를 찾습니다 (대소문자 무시).
    pub fn find(&self, framework: &str) -> Option<&ScanResult> {
        self.results.iter().find(|r| r.is_named(framework))
    }

    /// 프레임워크 포함 여부 (대소문자 무시)
    pub fn contains(&self, framework: &str) -> bool {
        self.find(framework).is_some()
    }

    /// 소문자로 정규화된 프레임워크 이름 집합
    pub fn framework_names(&self) -> BTreeSet<String> {
        self.results
            .iter()
            .map(|r| r.name.to_ascii_lowercase())
            .collect()
    }

    /// 내부 벡터를 꺼냅니다.
    pub fn into_vec(self) -> Vec<ScanResult> {
        self.results
    }
}

impl IntoIterator for ScanResults {
    type Item = ScanResult;
    type IntoIter = std::vec::IntoIter<ScanResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ScanResults {
    type Item = &'a ScanResult;
    type IntoIter = std::slice::Iter<'a, ScanResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

impl From<Vec<ScanResult>> for ScanResults {
    fn from(results: Vec<ScanResult>) -> Self {
        Self::new(results)
    }
}
