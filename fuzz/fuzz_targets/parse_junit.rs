#![no_main]

use libfuzzer_sys::fuzz_target;
use passgate_ingest::{parse_junit_str, JunitOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(records) = parse_junit_str(s, &JunitOptions::default()) {
            for r in &records {
                // Every parsed key has exactly the file::class::name shape.
                assert!(r.key.as_str().matches("::").count() >= 2);
            }
        }
    }
});
