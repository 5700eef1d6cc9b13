#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;
pub mod ui;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, InstallError, KubescapeError, ParseError};

// 설정
pub use config::{GeneralConfig, InstallConfig, InstallConfigBuilder, KubescapeConfig, SourceConfig};

// 도메인 타입
pub use types::{
    InstalledState, Platform, ScanResult, ScanResults, VersionRequest, normalize_tag,
};

// UI 능력
pub use ui::{KubescapeUi, ProgressReporter, TracingUi};

// 취소 토큰은 모든 공개 API에서 쓰이므로 함께 노출합니다.
pub use tokio_util::sync::CancellationToken;
