//! 에러 타입 -- 도메인별 에러 정의
//!
//! [`KubescapeError`]는 Facade 경계에서 호출자에게 노출되는 최상위 에러입니다.
//! 각 하위 크레이트(`kubescape-runner`, `kubescape-installer`)는 자체 에러를 정의하고
//! `From` 구현으로 이 타입으로 변환합니다.

/// Kubescape 관리 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum KubescapeError {
    /// 설치할 버전을 결정할 수 없고 로컬 설치본도 없음
    #[error("version resolution failed: {reason}")]
    Resolution { reason: String },

    /// 바이너리 / 프레임워크 설치 실패
    #[error("install error: {0}")]
    Install(#[from] InstallError),

    /// setup 완료 전에 스캔을 시도함
    #[error("kubescape is not installed, run setup first")]
    NotInstalled,

    /// 외부 프로세스가 실행되었으나 실패함
    #[error("kubescape exited with {}: {stderr}", display_exit_code(.exit_code))]
    Execution {
        /// 종료 코드 (시그널로 종료된 경우 None)
        exit_code: Option<i32>,
        /// 표준 에러 출력
        stderr: String,
    },

    /// 호출자 요청으로 취소됨
    #[error("operation cancelled")]
    Cancelled,

    /// 프로세스는 성공했으나 출력 형식이 잘못됨
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 설정 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl KubescapeError {
    /// 취소로 인한 에러인지 반환합니다.
    ///
    /// 취소는 실패가 아니므로 UI 에러 알림을 생략할 때 사용합니다.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// 메트릭 레이블 / 로그 필드용 짧은 분류명을 반환합니다.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolution { .. } => "resolution",
            Self::Install(_) => "install",
            Self::NotInstalled => "not_installed",
            Self::Execution { .. } => "execution",
            Self::Cancelled => "cancelled",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_owned(),
    }
}

/// 설치 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// 원격 아티팩트 다운로드 실패
    #[error("failed to fetch {artifact}: {reason}")]
    Fetch { artifact: String, reason: String },

    /// 쓰기 권한 없음
    #[error("permission denied: {path}: {reason}")]
    Permission { path: String, reason: String },

    /// 디스크 쓰기 / rename 실패
    #[error("disk error: {path}: {reason}")]
    Disk { path: String, reason: String },

    /// 원격에 존재하지 않는 프레임워크
    #[error("framework not found: {0}")]
    FrameworkNotFound(String),

    /// 다운로드된 아티팩트가 올바르지 않음
    #[error("invalid artifact {artifact}: {reason}")]
    InvalidArtifact { artifact: String, reason: String },

    /// scan 목록의 프레임워크가 하나도 설치되지 않음
    #[error("none of the scan frameworks could be installed: {0}")]
    NoScanFrameworks(String),
}

/// 스캔 결과 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 출력이 비어 있음
    #[error("scanner produced no output")]
    Empty,

    /// JSON 형식이 아님 / 최상위 구조가 다름
    #[error("malformed scanner output: {reason}")]
    Malformed { reason: String },

    /// 프레임워크 결과에 name 필드가 없음
    #[error("framework result at index {index} has no name")]
    MissingName { index: usize },
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
