#![no_main]

use std::path::Path;

use cityfilter::decompression::maybe_decompress;
use cityfilter::source::parse_rows;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let path = Path::new("fuzz.csv");

    // Parse errors are fine; we only care about panics.
    if let Ok(rows) = parse_rows(data, path) {
        for row in rows {
            let _ = row.population_value(path);
        }
    }

    // Exercise magic-byte sniffing and the decoders on arbitrary bytes too
    if let Ok(reader) = maybe_decompress(std::io::Cursor::new(data.to_vec())) {
        let _ = parse_rows(reader, path);
    }
});
