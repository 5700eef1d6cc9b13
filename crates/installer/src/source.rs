//! 원격 아티팩트 소스 추상화
//!
//! [`ArtifactSource`] trait은 최신 태그 조회, 바이너리/프레임워크 다운로드를 추상화합니다.
//! 운영 코드는 [`GithubSource`]를, 테스트는 인메모리 구현을 사용합니다.
//!
//! ```text
//!   ┌───────────────────┐
//!   │ ArtifactInstaller │
//!   └─────────┬─────────┘
//!             │
//!             ▼
//!     ┌──────────────┐
//!     │ArtifactSource│ (trait)
//!     └──────────────┘
//!        │        │
//!        ▼        ▼
//!   ┌────────┐ ┌──────┐
//!   │ GitHub │ │ Mock │
//!   └────────┘ └──────┘
//! ```
//!
//! # 에러 매핑
//!
//! - 프레임워크 404: [`InstallerError::FrameworkNotFound`]
//! - 그 외 비정상 상태 코드 / 연결 실패: [`InstallerError::Fetch`]

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use kubescape_core::config::SourceConfig;
use kubescape_core::metrics as m;
use kubescape_core::types::Platform;
use kubescape_core::ui::ProgressReporter;
use serde::Deserialize;
use tracing::debug;

use crate::error::InstallerError;

/// 원격 아티팩트 소스
///
/// `Send + Sync + 'static`이므로 `Arc`로 공유해 여러 비동기 컨텍스트에서 사용할 수 있습니다.
pub trait ArtifactSource: Send + Sync + 'static {
    /// 원격 최신 릴리스 태그를 조회합니다.
    fn latest_version(&self) -> impl Future<Output = Result<String, InstallerError>> + Send;

    /// 주어진 버전/플랫폼의 스캐너 바이너리를 내려받습니다.
    ///
    /// 전체 크기를 알 수 있으면 `progress`로 다운로드 진행률을 보고합니다.
    fn fetch_binary(
        &self,
        version: &str,
        platform: Platform,
        progress: &ProgressReporter,
    ) -> impl Future<Output = Result<Bytes, InstallerError>> + Send;

    /// 프레임워크 번들(JSON)을 내려받습니다.
    ///
    /// # Errors
    ///
    /// 원격에 해당 프레임워크가 없으면 [`InstallerError::FrameworkNotFound`]
    fn fetch_framework(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Bytes, InstallerError>> + Send;
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// GitHub 릴리스 기반 아티팩트 소스
///
/// - 최신 태그: `release_api_url`의 `tag_name`
/// - 바이너리: `<release_download_url>/<tag>/<asset>`
/// - 프레임워크: `<framework_download_url>/<name>.json`
#[derive(Debug, Clone)]
pub struct GithubSource {
    client: reqwest::Client,
    config: SourceConfig,
}

impl GithubSource {
    /// 설정으로부터 HTTP 클라이언트를 생성합니다.
    pub fn new(config: SourceConfig) -> Result<Self, InstallerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("kubescape-installer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InstallerError::Fetch {
                artifact: "http client".to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, config })
    }

    /// 바이너리 다운로드 URL
    pub fn binary_url(&self, version: &str, platform: Platform) -> String {
        format!(
            "{}/{}/{}",
            self.config.release_download_url.trim_end_matches('/'),
            version,
            platform.release_asset()
        )
    }

    /// 프레임워크 다운로드 URL
    pub fn framework_url(&self, name: &str) -> String {
        format!(
            "{}/{}.json",
            self.config.framework_download_url.trim_end_matches('/'),
            name
        )
    }

    async fn get(&self, url: &str, artifact: &str) -> Result<reqwest::Response, InstallerError> {
        debug!(url, artifact, "fetching artifact");
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| InstallerError::Fetch {
                artifact: artifact.to_owned(),
                reason: e.to_string(),
            })
    }
}

impl ArtifactSource for GithubSource {
    async fn latest_version(&self) -> Result<String, InstallerError> {
        let response = self
            .client
            .get(&self.config.release_api_url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| fetch_error("latest release", e))?;

        if !response.status().is_success() {
            return Err(InstallerError::Fetch {
                artifact: "latest release".to_owned(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let release: LatestRelease = response
            .json()
            .await
            .map_err(|e| InstallerError::InvalidArtifact {
                artifact: "latest release".to_owned(),
                reason: e.to_string(),
            })?;
        Ok(release.tag_name)
    }

    async fn fetch_binary(
        &self,
        version: &str,
        platform: Platform,
        progress: &ProgressReporter,
    ) -> Result<Bytes, InstallerError> {
        let artifact = format!("kubescape {version} ({platform})");
        let url = self.binary_url(version, platform);
        let mut response = self.get(&url, &artifact).await?;

        if !response.status().is_success() {
            return Err(InstallerError::Fetch {
                artifact,
                reason: format!("HTTP {} from {url}", response.status()),
            });
        }

        let total = response.content_length();
        let mut body = BytesMut::with_capacity(total.unwrap_or(0).min(256 * 1024 * 1024) as usize);
        progress.report(0.0);

        while let Some(chunk) = response.chunk().await.map_err(|e| fetch_error(&artifact, e))? {
            body.extend_from_slice(&chunk);
            if let Some(total) = total.filter(|t| *t > 0) {
                progress.report(body.len() as f64 / total as f64);
            }
        }

        progress.report(1.0);
        Ok(body.freeze())
    }

    async fn fetch_framework(&self, name: &str) -> Result<Bytes, InstallerError> {
        let artifact = format!("framework {name}");
        let url = self.framework_url(name);
        let response = self.get(&url, &artifact).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(InstallerError::FrameworkNotFound(name.to_owned()));
        }
        if !response.status().is_success() {
            return Err(InstallerError::Fetch {
                artifact,
                reason: format!("HTTP {} from {url}", response.status()),
            });
        }

        response.bytes().await.map_err(|e| fetch_error(&artifact, e))
    }
}

/// 아티팩트 조회 결과를 메트릭으로 기록합니다.
pub(crate) fn record_fetch<T>(kind: &'static str, result: &Result<T, InstallerError>) {
    let outcome = match result {
        Ok(_) => m::RESULT_SUCCESS,
        Err(InstallerError::Cancelled) => m::RESULT_CANCELLED,
        Err(_) => m::RESULT_FAILURE,
    };
    metrics::counter!(
        m::ARTIFACT_FETCHES_TOTAL,
        m::LABEL_KIND => kind,
        m::LABEL_RESULT => outcome
    )
    .increment(1);
}

fn fetch_error(artifact: &str, err: reqwest::Error) -> InstallerError {
    InstallerError::Fetch {
        artifact: artifact.to_owned(),
        reason: err.to_string(),
    }
}
