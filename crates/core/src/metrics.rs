//! 메트릭 상수 및 설명 등록
//!
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더(exporter) 설치는 바이너리의 몫이며,
//! 레코더가 없으면 기록은 아무 효과가 없습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `kubescape_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use kubescape_core::metrics::{LABEL_RESULT, SCANS_TOTAL};
//!
//! metrics::counter!(SCANS_TOTAL, LABEL_RESULT => "success").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 아티팩트 종류 레이블 키 (binary, framework, latest_tag)
pub const LABEL_KIND: &str = "kind";

/// 결과 레이블 키 (success, failure, cancelled)
pub const LABEL_RESULT: &str = "result";

// ─── 레이블 값 상수 ────────────────────────────────────────────────

/// 결과: 성공
pub const RESULT_SUCCESS: &str = "success";

/// 결과: 실패
pub const RESULT_FAILURE: &str = "failure";

/// 결과: 취소
pub const RESULT_CANCELLED: &str = "cancelled";

/// 종류: 스캐너 바이너리
pub const KIND_BINARY: &str = "binary";

/// 종류: 프레임워크 번들
pub const KIND_FRAMEWORK: &str = "framework";

/// 종류: 최신 버전 태그 조회
pub const KIND_LATEST_TAG: &str = "latest_tag";

// ─── 메트릭 이름 ────────────────────────────────────────────────────

/// 원격 아티팩트 조회 수 (counter, labels: kind, result)
pub const ARTIFACT_FETCHES_TOTAL: &str = "kubescape_artifact_fetches_total";

/// 스캔 실행 수 (counter, label: result)
pub const SCANS_TOTAL: &str = "kubescape_scans_total";

/// setup 호출 수 (counter, label: result)
pub const SETUP_TOTAL: &str = "kubescape_setup_total";

/// 스캐너 프로세스 실행 시간 (histogram, 초)
pub const SCAN_DURATION_SECONDS: &str = "kubescape_scan_duration_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 바이너리 시작 시 한 번 호출합니다. 설치된 레코더가 없으면 효과가 없습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        ARTIFACT_FETCHES_TOTAL,
        "Remote artifact fetches by kind (binary, framework, latest_tag) and result"
    );
    describe_counter!(SCANS_TOTAL, "Scanner invocations by result");
    describe_counter!(SETUP_TOTAL, "Setup (resolve + install) attempts by result");
    describe_histogram!(
        SCAN_DURATION_SECONDS,
        "Wall-clock duration of scanner child processes in seconds"
    );
}
