#![no_main]

use libfuzzer_sys::fuzz_target;
use kubescape_installer::extract_version;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Some(version) = extract_version(&text) {
        assert!(version.starts_with('v'));
        assert_eq!(extract_version(&version).as_deref(), Some(version.as_str()));
    }
});
