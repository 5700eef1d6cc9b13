//! 버전 결정
//!
//! 요청 버전(`latest` 또는 고정 태그)과 원격 최신 태그, 로컬 설치본을 비교해
//! 설치 대상 버전과 "최신 여부"를 결정합니다.
//!
//! | 요청 | 원격 조회 | 로컬 설치본 | 결과 |
//! |------|----------|------------|------|
//! | latest | 성공 | - | 원격 태그, `is_latest = true` |
//! | latest | 실패 | 있음 | 로컬 버전, `is_latest = false` |
//! | latest | 실패 | 없음 | `Resolution` 에러 |
//! | 고정 태그 | 성공 | - | 고정 태그, 원격과 비교한 결과 |
//! | 고정 태그 | 실패 | - | 고정 태그, `is_latest = false` |

use std::sync::LazyLock;

use kubescape_core::metrics::KIND_LATEST_TAG;
use kubescape_core::types::{VersionRequest, normalize_tag};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::InstallerError;
use crate::source::{ArtifactSource, record_fetch};

/// 결정된 설치 대상 버전
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// 설치할 태그 (`v` 접두어)
    pub version: String,
    /// 원격 최신 버전과 일치하는지 여부
    pub is_latest: bool,
}

/// 요청 버전을 결정합니다.
///
/// `local_version`은 이미 설치된 바이너리의 버전입니다 (오프라인 폴백용).
pub async fn resolve_version<S: ArtifactSource>(
    source: &S,
    request: &VersionRequest,
    local_version: Option<&str>,
) -> Result<ResolvedVersion, InstallerError> {
    match request {
        VersionRequest::Latest => match fetch_latest(source).await {
            Ok(latest) => {
                let version = normalize_tag(&latest);
                if version.is_empty() {
                    return fallback(local_version, "remote returned an empty tag".to_owned());
                }
                debug!(version = %version, "resolved latest version");
                Ok(ResolvedVersion {
                    version,
                    is_latest: true,
                })
            }
            Err(InstallerError::Cancelled) => Err(InstallerError::Cancelled),
            Err(e) => fallback(local_version, e.to_string()),
        },
        VersionRequest::Pinned(tag) => {
            let is_latest = match fetch_latest(source).await {
                Ok(latest) => versions_match(tag, &latest),
                Err(InstallerError::Cancelled) => return Err(InstallerError::Cancelled),
                Err(e) => {
                    warn!(error = %e, "latest version check failed, assuming pinned version is not latest");
                    false
                }
            };
            debug!(version = %tag, is_latest, "using pinned version");
            Ok(ResolvedVersion {
                version: normalize_tag(tag),
                is_latest,
            })
        }
    }
}

async fn fetch_latest<S: ArtifactSource>(source: &S) -> Result<String, InstallerError> {
    let result = source.latest_version().await;
    record_fetch(KIND_LATEST_TAG, &result);
    result
}

fn fallback(local_version: Option<&str>, reason: String) -> Result<ResolvedVersion, InstallerError> {
    match local_version {
        Some(local) => {
            warn!(
                version = local,
                reason = %reason,
                "cannot resolve latest version, keeping installed version"
            );
            Ok(ResolvedVersion {
                version: normalize_tag(local),
                is_latest: false,
            })
        }
        None => Err(InstallerError::Resolution {
            reason: format!("{reason} (and no local installation exists)"),
        }),
    }
}

/// 두 태그가 같은 버전을 가리키는지 비교합니다.
///
/// 양쪽 모두 semver로 해석되면 semver로, 아니면 정규화된 문자열로 비교합니다.
pub fn versions_match(a: &str, b: &str) -> bool {
    let a = normalize_tag(a);
    let b = normalize_tag(b);
    match (parse_semver(&a), parse_semver(&b)) {
        (Some(va), Some(vb)) => va == vb,
        _ => a == b,
    }
}

fn parse_semver(tag: &str) -> Option<semver::Version> {
    semver::Version::parse(tag.strip_prefix('v').unwrap_or(tag)).ok()
}

static VERSION_TOKEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\bv?(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)\b").ok());

/// `kubescape version` 출력에서 첫 번째 `vX.Y.Z` 토큰을 추출합니다.
///
/// 예: `"Your current version is: v2.3.1"` -> `Some("v2.3.1")`
pub fn extract_version(output: &str) -> Option<String> {
    let re = VERSION_TOKEN.as_ref()?;
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("v{}", m.as_str()))
}
