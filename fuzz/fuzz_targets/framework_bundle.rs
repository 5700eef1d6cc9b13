#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use kubescape_installer::validate_framework;

fuzz_target!(|data: &[u8]| {
    let bundle = Bytes::copy_from_slice(data);
    if validate_framework("fuzz", &bundle).is_ok() {
        let value: serde_json::Value =
            serde_json::from_slice(data).expect("accepted bundle is valid JSON");
        assert!(value.is_object() || value.is_array());
    }
});
