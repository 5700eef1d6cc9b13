//! UI 능력 trait -- 호출자가 구현하는 알림/진행 표시 계약
//!
//! 코어는 UI를 저장하지 않고 호출마다 인자로 받습니다.
//! 에디터 확장, CLI, 테스트 더블이 같은 trait를 구현합니다.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// 진행률 콜백
///
/// 전달되는 값은 항상 `[0, 1]` 범위로 보정됩니다.
/// 렌더링 빈도 조절(throttling)은 UI 구현체의 몫입니다.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(f64) + Send + Sync>,
}

impl ProgressReporter {
    /// 콜백으로부터 생성합니다.
    pub fn new(sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// 아무것도 하지 않는 리포터
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// 진행률을 보고합니다.
    pub fn report(&self, fraction: f64) {
        let clamped = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        (self.sink)(clamped);
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

/// 호스트 UI 능력
///
/// `slow`는 작업을 불확정 진행 표시와 함께 실행하고 결과를 그대로 돌려줍니다.
/// `progress`는 작업에 [`ProgressReporter`]를 넘겨 분수 진행률을 받습니다.
/// 두 메서드 모두 작업의 성공/실패를 가공하지 않아야 합니다.
///
/// # 구현 예시
/// ```ignore
/// struct MyUi;
///
/// impl KubescapeUi for MyUi {
///     fn info(&self, msg: &str) { println!("{msg}"); }
///     fn error(&self, msg: &str) { eprintln!("{msg}"); }
///     fn debug(&self, _msg: &str) {}
///     fn show_help(&self, message: &str, url: &str) { eprintln!("{message} ({url})"); }
///
///     async fn slow<T, F>(&self, _title: &str, work: F) -> T
///     where
///         F: Future<Output = T> + Send,
///         T: Send,
///     {
///         work.await
///     }
///
///     async fn progress<T, F, Fut>(&self, _title: &str, _cancel: &CancellationToken, work: F) -> T
///     where
///         F: FnOnce(ProgressReporter) -> Fut + Send,
///         Fut: Future<Output = T> + Send,
///         T: Send,
///     {
///         work(ProgressReporter::noop()).await
///     }
/// }
/// ```
pub trait KubescapeUi: Send + Sync {
    /// 정보 알림
    fn info(&self, msg: &str);

    /// 에러 알림
    fn error(&self, msg: &str);

    /// 디버그 메시지
    fn debug(&self, msg: &str);

    /// 도움말 링크와 함께 메시지를 표시합니다.
    fn show_help(&self, message: &str, url: &str);

    /// 불확정 진행 표시와 함께 작업을 실행합니다.
    fn slow<T, F>(&self, title: &str, work: F) -> impl Future<Output = T> + Send
    where
        F: Future<Output = T> + Send,
        T: Send;

    /// 분수 진행률 보고와 함께 작업을 실행합니다.
    ///
    /// `cancel`은 UI가 취소 버튼 등을 노출할 때 트리거할 수 있는 토큰입니다.
    fn progress<T, F, Fut>(
        &self,
        title: &str,
        cancel: &CancellationToken,
        work: F,
    ) -> impl Future<Output = T> + Send
    where
        F: FnOnce(ProgressReporter) -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send;
}

/// 모든 알림을 `tracing`으로 보내는 헤드리스 UI
///
/// 데몬이나 라이브러리 사용자가 별도 UI 없이 Facade를 쓸 때 사용합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUi;

impl KubescapeUi for TracingUi {
    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn show_help(&self, message: &str, url: &str) {
        tracing::warn!(help_url = url, "{message}");
    }

    async fn slow<T, F>(&self, title: &str, work: F) -> T
    where
        F: Future<Output = T> + Send,
        T: Send,
    {
        tracing::debug!(title, "started");
        let out = work.await;
        tracing::debug!(title, "finished");
        out
    }

    async fn progress<T, F, Fut>(&self, title: &str, _cancel: &CancellationToken, work: F) -> T
    where
        F: FnOnce(ProgressReporter) -> Fut + Send,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        let title = title.to_owned();
        let reporter = ProgressReporter::new(move |fraction| {
            tracing::trace!(title = %title, fraction, "progress");
        });
        work(reporter).await
    }
}
