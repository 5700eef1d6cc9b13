//! 설정 관리 -- kubescape.toml 파싱 및 설치 설정
//!
//! [`KubescapeConfig`]는 파일 전체를, [`InstallConfig`]는 설치/스캔 대상만 담습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`KUBESCAPE_INSTALL_VERSION=v3.0.0` 형식)
//! 3. 설정 파일 (`kubescape.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), kubescape_core::error::KubescapeError> {
//! use kubescape_core::config::{InstallConfigBuilder, KubescapeConfig};
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = KubescapeConfig::load("kubescape.toml").await?;
//!
//! // 코드에서 직접 구성
//! let install = InstallConfigBuilder::new()
//!     .version("v2.3.1")
//!     .required_frameworks(["NSA"])
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, KubescapeError};
use crate::types::{LATEST_KEYWORD, VersionRequest};

/// 기본 설정 파일명
pub const DEFAULT_CONFIG_FILE: &str = "kubescape.toml";

/// Kubescape 통합 설정
///
/// `kubescape.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubescapeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 설치 설정
    #[serde(default)]
    pub install: InstallConfig,
    /// 아티팩트 다운로드 소스 설정
    #[serde(default)]
    pub source: SourceConfig,
}

impl KubescapeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, KubescapeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일을 읽어 파싱만 합니다.
    ///
    /// 환경변수 오버라이드와 검증은 적용하지 않습니다. 파일 값이 환경변수로
    /// 교정될 수 있으므로 검증은 [`load`](Self::load)에서 한 번만 수행합니다.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, KubescapeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KubescapeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                KubescapeError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, KubescapeError> {
        toml::from_str(toml_str).map_err(|e| {
            KubescapeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// TOML 문자열로 직렬화합니다.
    pub fn to_toml(&self) -> Result<String, KubescapeError> {
        toml::to_string_pretty(self).map_err(|e| {
            KubescapeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `KUBESCAPE_{SECTION}_{FIELD}`
    /// 목록은 쉼표로 구분합니다: `KUBESCAPE_INSTALL_SCAN_FRAMEWORKS=nsa,mitre`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "KUBESCAPE_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "KUBESCAPE_GENERAL_LOG_FORMAT",
        );

        // Install
        override_string(&mut self.install.version, "KUBESCAPE_INSTALL_VERSION");
        override_path(
            &mut self.install.base_directory,
            "KUBESCAPE_INSTALL_BASE_DIRECTORY",
        );
        override_path(
            &mut self.install.frameworks_directory,
            "KUBESCAPE_INSTALL_FRAMEWORKS_DIRECTORY",
        );
        override_csv(
            &mut self.install.required_frameworks,
            "KUBESCAPE_INSTALL_REQUIRED_FRAMEWORKS",
        );
        override_csv(
            &mut self.install.scan_frameworks,
            "KUBESCAPE_INSTALL_SCAN_FRAMEWORKS",
        );

        // Source
        override_string(
            &mut self.source.release_api_url,
            "KUBESCAPE_SOURCE_RELEASE_API_URL",
        );
        override_string(
            &mut self.source.release_download_url,
            "KUBESCAPE_SOURCE_RELEASE_DOWNLOAD_URL",
        );
        override_string(
            &mut self.source.framework_download_url,
            "KUBESCAPE_SOURCE_FRAMEWORK_DOWNLOAD_URL",
        );
        override_u64(
            &mut self.source.timeout_secs,
            "KUBESCAPE_SOURCE_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), KubescapeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.install.validate()?;
        self.source.validate()?;
        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 설치 설정
///
/// setup 호출 시점의 불변 값입니다. 이름 목록은 소문자 식별자만 허용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// 요청 버전 (`latest` 또는 명시적 태그)
    pub version: String,
    /// 바이너리 설치 디렉토리
    pub base_directory: PathBuf,
    /// 프레임워크 번들 디렉토리
    pub frameworks_directory: PathBuf,
    /// 사용 전에 반드시 존재해야 하는 프레임워크
    pub required_frameworks: Vec<String>,
    /// 스캔 시 적용할 프레임워크
    pub scan_frameworks: Vec<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            version: LATEST_KEYWORD.to_owned(),
            base_directory: PathBuf::from(".kubescape"),
            frameworks_directory: PathBuf::from(".kubescape/frameworks"),
            required_frameworks: vec!["nsa".to_owned(), "mitre".to_owned()],
            scan_frameworks: vec!["nsa".to_owned(), "mitre".to_owned()],
        }
    }
}

impl InstallConfig {
    /// 요청 버전을 해석합니다.
    pub fn version_request(&self) -> VersionRequest {
        VersionRequest::parse(&self.version)
    }

    /// 설치 대상 프레임워크 전체 (required 먼저, 중복 제거, 순서 유지)
    ///
    /// scan 목록에만 있는 프레임워크도 설치 대상에 포함됩니다.
    pub fn all_frameworks(&self) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        for name in self
            .required_frameworks
            .iter()
            .chain(self.scan_frameworks.iter())
        {
            let lowered = name.to_ascii_lowercase();
            if !all.contains(&lowered) {
                all.push(lowered);
            }
        }
        all
    }

    /// 필수 프레임워크 여부 (대소문자 무시)
    pub fn is_required(&self, name: &str) -> bool {
        self.required_frameworks
            .iter()
            .any(|r| r.eq_ignore_ascii_case(name))
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), KubescapeError> {
        if self.version.trim().is_empty() {
            return Err(invalid("install.version", "must not be empty"));
        }
        if let VersionRequest::Pinned(tag) = self.version_request() {
            if tag.chars().any(|c| c.is_whitespace() || c == '"') {
                return Err(invalid(
                    "install.version",
                    "must not contain whitespace or quotes",
                ));
            }
        }

        validate_directory("install.base_directory", &self.base_directory)?;
        validate_directory(
            "install.frameworks_directory",
            &self.frameworks_directory,
        )?;

        validate_names("install.required_frameworks", &self.required_frameworks)?;
        validate_names("install.scan_frameworks", &self.scan_frameworks)?;
        Ok(())
    }
}

/// [`InstallConfig`] 빌더
///
/// 프레임워크 이름을 소문자로 정규화한 뒤 빌드 시 유효성을 검증합니다.
#[derive(Default)]
pub struct InstallConfigBuilder {
    config: InstallConfig,
}

impl InstallConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 설정에서 시작합니다.
    pub fn from_config(config: InstallConfig) -> Self {
        Self { config }
    }

    /// 요청 버전을 설정합니다.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config.version = version.into();
        self
    }

    /// 바이너리 설치 디렉토리를 설정합니다.
    pub fn base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_directory = dir.into();
        self
    }

    /// 프레임워크 디렉토리를 설정합니다.
    pub fn frameworks_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.frameworks_directory = dir.into();
        self
    }

    /// 필수 프레임워크 목록을 설정합니다.
    pub fn required_frameworks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.required_frameworks = lower_all(names);
        self
    }

    /// 스캔 프레임워크 목록을 설정합니다.
    pub fn scan_frameworks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.scan_frameworks = lower_all(names);
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `KubescapeError::Config` 반환
    pub fn build(mut self) -> Result<InstallConfig, KubescapeError> {
        self.config.required_frameworks = lower_all(&self.config.required_frameworks);
        self.config.scan_frameworks = lower_all(&self.config.scan_frameworks);
        self.config.validate()?;
        Ok(self.config)
    }
}

/// 아티팩트 다운로드 소스 설정
///
/// 미러를 쓰는 환경을 위해 URL을 바꿀 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// 최신 릴리스 조회 API
    pub release_api_url: String,
    /// 릴리스 에셋 다운로드 베이스 URL (`<url>/<tag>/<asset>`)
    pub release_download_url: String,
    /// 프레임워크 번들 다운로드 베이스 URL (`<url>/<name>.json`)
    pub framework_download_url: String,
    /// HTTP 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            release_api_url: "https://api.github.com/repos/kubescape/kubescape/releases/latest"
                .to_owned(),
            release_download_url: "https://github.com/kubescape/kubescape/releases/download"
                .to_owned(),
            framework_download_url:
                "https://github.com/kubescape/regolibrary/releases/latest/download".to_owned(),
            timeout_secs: 120,
        }
    }
}

impl SourceConfig {
    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), KubescapeError> {
        for (field, url) in [
            ("source.release_api_url", &self.release_api_url),
            ("source.release_download_url", &self.release_download_url),
            ("source.framework_download_url", &self.framework_download_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(invalid(field, "must be an http(s) URL"));
            }
        }
        if self.timeout_secs == 0 {
            return Err(invalid("source.timeout_secs", "must be greater than 0"));
        }
        Ok(())
    }
}

// --- 검증 헬퍼 ---

fn invalid(field: &str, reason: &str) -> KubescapeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

fn validate_directory(field: &str, dir: &Path) -> Result<(), KubescapeError> {
    if dir.as_os_str().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if dir.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(invalid(field, "must not contain '..' components"));
    }
    Ok(())
}

fn validate_names(field: &str, names: &[String]) -> Result<(), KubescapeError> {
    if names.is_empty() {
        return Err(invalid(field, "must contain at least one framework"));
    }
    for name in names {
        if !is_framework_identifier(name) {
            return Err(ConfigError::InvalidValue {
                field: field.to_owned(),
                reason: format!(
                    "'{name}' is not a lower-case framework identifier ([a-z0-9][a-z0-9._-]*)"
                ),
            }
            .into());
        }
    }
    Ok(())
}

/// `[a-z0-9][a-z0-9._-]*` 형식인지 확인합니다.
pub fn is_framework_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'))
}

fn lower_all<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_ascii_lowercase())
        .collect()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_path(target: &mut PathBuf, env_key: &str) {
    if let Some(val) = std::env::var_os(env_key) {
        *target = PathBuf::from(val);
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
