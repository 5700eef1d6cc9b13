//! 스캔 결과 파서 벤치마크
//!
//! fixture 출력과 프레임워크/컨트롤 수를 늘린 합성 출력의 파싱 성능을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kubescape_runner::parse_scan_output;

const FIXTURE: &str = include_str!("../tests/fixtures/scan_v1.json");

fn synthetic_output(frameworks: usize, controls: usize) -> String {
    let frameworks: Vec<serde_json::Value> = (0..frameworks)
        .map(|f| {
            let reports: Vec<serde_json::Value> = (0..controls)
                .map(|c| {
                    serde_json::json!({
                        "controlID": format!("C-{c:04}"),
                        "name": format!("control {c}"),
                        "failedResources": c % 3,
                        "totalResources": 3,
                        "score": 42.0,
                    })
                })
                .collect();
            serde_json::json!({
                "name": format!("framework-{f}"),
                "controlReports": reports,
                "failedResources": 1,
                "totalResources": controls,
                "score": 50.0,
            })
        })
        .collect();
    serde_json::Value::Array(frameworks).to_string()
}

fn bench_fixture(c: &mut Criterion) {
    c.bench_function("parse_fixture", |b| {
        b.iter(|| parse_scan_output(black_box(FIXTURE)))
    });
}

fn bench_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_synthetic");
    for controls in [10usize, 100, 1000] {
        let output = synthetic_output(3, controls);
        group.throughput(Throughput::Bytes(output.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(controls), &output, |b, out| {
            b.iter(|| parse_scan_output(black_box(out)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fixture, bench_synthetic);
criterion_main!(benches);
