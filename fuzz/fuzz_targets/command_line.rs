#![no_main]

use std::path::Path;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use kubescape_core::types::Platform;
use kubescape_runner::build_command;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    binary: String,
    args: String,
    kubeconfig: Option<String>,
    windows: bool,
}

fuzz_target!(|input: FuzzInput| {
    let platform = if input.windows {
        Platform::Windows
    } else {
        Platform::Linux
    };
    let line = build_command(
        Path::new(&input.binary),
        &input.args,
        input.kubeconfig.as_deref().map(Path::new),
        platform,
    );

    // 인자가 비어 있으면 명령줄은 닫는 따옴표로 끝난다
    if input.args.is_empty() {
        assert!(line.ends_with('"'));
    } else {
        assert!(line.ends_with(&input.args));
    }
});
