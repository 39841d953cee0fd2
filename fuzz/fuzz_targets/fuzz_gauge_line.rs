#![no_main]
use libfuzzer_sys::fuzz_target;
use regulator_core::link::decode_gauge_line;
use regulator_core::sci;

fuzz_target!(|data: &str| {
    if let Ok(v) = sci::parse(data) {
        assert!(v.is_finite());
    }
    if let Ok(r) = decode_gauge_line(data) {
        assert!(r.pascals().is_finite() && r.pascals() >= 0.0);
    }
});
