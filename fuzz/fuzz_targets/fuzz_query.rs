#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    // Parsing and compiling must reject bad input without panicking.
    let Ok(query) = mongo_search::query::parse_query(s) else { return };
    let Ok(filter) = mongo_search::query::compile_filter(&query) else { return };
    let docs = [
        bson::doc! {"name": "x", "size": 1, "public": true},
        bson::doc! {"name": "y", "size": -5, "meta": {"z": 3}, "tags": ["a", "b"]},
        bson::doc! {"access": {"users": [{"id": "u1", "level": 2}]}},
    ];
    for d in &docs {
        let _ = mongo_search::query::eval_filter(d, &filter);
    }
});
