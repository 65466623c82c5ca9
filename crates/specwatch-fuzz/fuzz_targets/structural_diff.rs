#![no_main]
use libfuzzer_sys::fuzz_target;
use specwatch_core::spec::{diff, render_diff};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    // Two JSON documents separated by a NUL byte
    let Some((left, right)) = s.split_once('\0') else {
        return;
    };
    let (Ok(old), Ok(new)) = (
        serde_json::from_str::<serde_json::Value>(left),
        serde_json::from_str::<serde_json::Value>(right),
    ) else {
        return;
    };

    assert!(diff(&old, &old, "").is_empty());
    let entries = diff(&old, &new, "");
    let _ = render_diff(&entries);
});
