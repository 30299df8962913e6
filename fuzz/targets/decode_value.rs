#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nvstore::{BinarySerializer, Registry, TypeTable};

#[derive(Debug, Arbitrary)]
struct DecodeInput {
    /// Имена таблицы типов, против которой декодируется поток
    type_names: Vec<String>,
    /// Произвольный (возможно повреждённый) поток
    data: Vec<u8>,
}

fuzz_target!(|input: DecodeInput| {
    let serializer = BinarySerializer::new(Arc::new(Registry::empty())).with_max_depth(32);
    let table = TypeTable::from_names(input.type_names);

    // Декодер должен вернуть ошибку, а не паниковать.
    if let Ok(value) = serializer.deserialize(&mut input.data.as_slice(), &table) {
        // Удачно декодированное значение кодируется повторно.
        let mut table = table.clone();
        let _ = serializer.serialize(&value, &mut table);
    }
});
