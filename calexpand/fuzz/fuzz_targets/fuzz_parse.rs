#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parse should never panic, only return Ok or Err
        let anchor = jiff::civil::date(2026, 1, 1).at(9, 0, 0, 0);
        let _ = calexpand::parse(s, anchor);
    }
});
