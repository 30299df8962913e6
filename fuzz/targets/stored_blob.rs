#![no_main]

use std::io::Read;

use libfuzzer_sys::fuzz_target;
use nvstore::nvram::{decode_table, open_blob};

fuzz_target!(|data: &[u8]| {
    // Схема, кадр и gzip: только ошибки, никаких паник.
    if let Ok(reader) = open_blob(data) {
        let mut sink = Vec::new();
        let _ = reader.take(1 << 20).read_to_end(&mut sink);
    }
    let _ = decode_table(data);
});
