//! 스캔 결과 파서
//!
//! `--format json --format-version v1` 출력은 프레임워크별 결과 객체의 배열입니다.
//! 각 객체는 최소한 `name` 문자열을 가져야 하며, 나머지 필드는 보존만 합니다.
//!
//! 빈 배열은 유효합니다 (평가된 프레임워크 없음). 호출자가 길이를 확인합니다.
//! 입력 자체가 비어 있거나 JSON이 아니면 [`ParseError`]를 반환합니다.

use kubescape_core::error::ParseError;
use kubescape_core::types::{ScanResult, ScanResults};
use serde_json::Value;

/// 파싱 가능한 최대 입력 크기 (바이트)
pub const MAX_OUTPUT_SIZE: usize = 256 * 1024 * 1024;

/// 스캐너 stdout을 결과 목록으로 변환합니다.
pub fn parse_scan_output(stdout: &str) -> Result<ScanResults, ParseError> {
    let items = parse_array(stdout)?;

    let mut results = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if !has_string_name(&item) {
            return Err(ParseError::MissingName { index });
        }
        let result: ScanResult =
            serde_json::from_value(item).map_err(|e| ParseError::Malformed {
                reason: format!("framework result at index {index}: {e}"),
            })?;
        results.push(result);
    }

    tracing::debug!(frameworks = results.len(), "parsed scan output");
    Ok(ScanResults::new(results))
}

/// `list frameworks --format json` 출력에서 프레임워크 이름을 추출합니다.
///
/// 문자열 배열과 `name` 필드를 가진 객체 배열을 모두 받아들입니다.
pub fn parse_framework_list(stdout: &str) -> Result<Vec<String>, ParseError> {
    let items = parse_array(stdout)?;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(name) => Ok(name),
            Value::Object(mut map) => match map.remove("name") {
                Some(Value::String(name)) => Ok(name),
                _ => Err(ParseError::MissingName { index }),
            },
            _ => Err(ParseError::MissingName { index }),
        })
        .collect()
}

fn parse_array(stdout: &str) -> Result<Vec<Value>, ParseError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    if trimmed.len() > MAX_OUTPUT_SIZE {
        return Err(ParseError::Malformed {
            reason: format!(
                "output too large: {} bytes (max {MAX_OUTPUT_SIZE})",
                trimmed.len()
            ),
        });
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| ParseError::Malformed {
        reason: e.to_string(),
    })?;

    match value {
        Value::Array(items) => Ok(items),
        other => Err(ParseError::Malformed {
            reason: format!("expected a JSON array, got {}", json_kind(&other)),
        }),
    }
}

fn has_string_name(item: &Value) -> bool {
    item.get("name").is_some_and(Value::is_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
