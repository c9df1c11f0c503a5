#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    let Ok(filter) = querygate::utils::json::parse_json_to_bson_document(s) else { return };
    let doc = bson::doc! {"a": 1, "b": {"c": "x"}, "t": ["red", "blue"], "s": "some text"};
    // Unsupported operators are errors, never panics
    let _ = querygate::store::matches(&doc, &filter);
});
