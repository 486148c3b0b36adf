#![no_main]
use calexpand::RecurrenceXml;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let anchor = jiff::civil::date(2026, 1, 1).at(9, 0, 0, 0);
        if let Ok((pattern, range)) = calexpand::parse(s, anchor) {
            let rendered = RecurrenceXml::new(&pattern, &range).to_string();
            let reparsed = calexpand::parse(&rendered, anchor)
                .expect("rendered description must be parseable");
            assert_eq!((pattern, range), reparsed, "render/parse roundtrip failed");
        }
    }
});
