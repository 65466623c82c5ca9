#![no_main]
use libfuzzer_sys::fuzz_target;
use specwatch_core::spec::{identical_after_normalizing, normalize, parse_document};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        assert!(identical_after_normalizing(s, s));
        if let Ok(tree) = parse_document(s) {
            let once = normalize(&tree);
            assert_eq!(normalize(&once), once);
        }
    }
});
