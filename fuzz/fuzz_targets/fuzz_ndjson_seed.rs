#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16384 { return; }
    let col = mongo_search::collection::Collection::new("item");
    let _ = mongo_search::seed::load_ndjson(&col, data, true);
});
