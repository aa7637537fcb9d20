#![no_main]

use chorecard_render::markup::{decode_entities, parse, to_markup};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // Malformed markup is an error, never a panic.
    if let Ok(nodes) = parse(input) {
        let _ = to_markup(&nodes);
    }
    let _ = decode_entities(input);
});
