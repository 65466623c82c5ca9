#![no_main]
use libfuzzer_sys::fuzz_target;
use specwatch_core::spec::split::{parse_unit_id, split};
use specwatch_core::spec::{bundle, parse_document};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(document) = parse_document(s) else {
        return;
    };

    let units = split(&document);
    for id in units.keys() {
        // Every emitted id must parse back
        assert!(parse_unit_id(id).is_ok(), "unparseable unit id {id}");
    }

    if document.get("paths").is_none() {
        // Whole document treated as an operation
        let _ = bundle(&document, &document);
    }
});
