//! 러너 에러 타입
//!
//! [`RunnerError`]는 명령 실행과 결과 파싱 중 발생하는 에러를 표현합니다.
//! `From<RunnerError> for KubescapeError` 변환이 구현되어 있어
//! Facade에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use kubescape_core::error::{KubescapeError, ParseError};

/// 러너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// 셸 프로세스를 시작하지 못함
    #[error("failed to spawn '{program}': {reason}")]
    Spawn {
        /// 실행하려던 셸 프로그램
        program: String,
        /// 실패 사유
        reason: String,
    },

    /// 프로세스가 0이 아닌 코드로 종료됨
    #[error("process exited with {exit_code:?}: {stderr}")]
    Execution {
        /// 종료 코드 (시그널 종료 시 None)
        exit_code: Option<i32>,
        /// 표준 에러 출력
        stderr: String,
    },

    /// 취소 토큰이 트리거됨
    #[error("process cancelled")]
    Cancelled,

    /// 출력 파싱 실패
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// 파이프 읽기 / 대기 중 I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RunnerError> for KubescapeError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Spawn { program, reason } => KubescapeError::Execution {
                exit_code: None,
                stderr: format!("failed to spawn '{program}': {reason}"),
            },
            RunnerError::Execution { exit_code, stderr } => {
                KubescapeError::Execution { exit_code, stderr }
            }
            RunnerError::Cancelled => KubescapeError::Cancelled,
            RunnerError::Parse(e) => KubescapeError::Parse(e),
            RunnerError::Io(e) => KubescapeError::Io(e),
        }
    }
}
