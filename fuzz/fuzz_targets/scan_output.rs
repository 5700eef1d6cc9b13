#![no_main]

use libfuzzer_sys::fuzz_target;
use kubescape_runner::{parse_framework_list, parse_scan_output};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(results) = parse_scan_output(text) {
            // 결과는 항상 원본 배열 길이를 유지한다
            let raw: Vec<serde_json::Value> =
                serde_json::from_str(text.trim()).expect("parsed output is a JSON array");
            assert_eq!(results.len(), raw.len());
        }
        let _ = parse_framework_list(text);
    }
});
