//! Property-based тесты бинарного сериализатора.
//!
//! Генерируются произвольные деревья `Value` без объектов и кодеков;
//! проверяется encode/decode, стабильность таблицы типов и то, что
//! декодер не читает байты после значения.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Timelike};
use nvstore::{
    serializer::{ticks_to_datetime, ticks_to_timespan},
    BinarySerializer, Registry, SerializerError, TypeTable, Value,
};
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 512;

/// 9999-12-31T23:59:59.9999999 в тиках.
const MAX_DATETIME_TICKS: i64 = 3_155_378_975_999_999_999;

/// Сравнение с побитовым равенством чисел с плавающей точкой (NaN == NaN).
fn value_deep_eq(
    a: &Value,
    b: &Value,
) -> bool {
    use Value::*;
    match (a, b) {
        (Single(x), Single(y)) => x.to_bits() == y.to_bits(),
        (Double(x), Double(y)) => x.to_bits() == y.to_bits(),
        (
            List {
                type_name: n1,
                items: i1,
            },
            List {
                type_name: n2,
                items: i2,
            },
        )
        | (
            Array {
                type_name: n1,
                items: i1,
            },
            Array {
                type_name: n2,
                items: i2,
            },
        )
        | (
            Tuple {
                type_name: n1,
                items: i1,
            },
            Tuple {
                type_name: n2,
                items: i2,
            },
        ) => n1 == n2 && i1.len() == i2.len() && i1.iter().zip(i2).all(|(x, y)| value_deep_eq(x, y)),
        (
            Dictionary {
                type_name: n1,
                entries: e1,
            },
            Dictionary {
                type_name: n2,
                entries: e2,
            },
        ) => {
            n1 == n2
                && e1.len() == e2.len()
                && e1
                    .iter()
                    .zip(e2)
                    .all(|((k1, v1), (k2, v2))| value_deep_eq(k1, k2) && value_deep_eq(v1, v2))
        }
        _ => a == b,
    }
}

fn type_name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "List<object>",
        "object[]",
        "Tuple<object,object>",
        "Dictionary<object,object>",
        "game.Reel",
    ])
    .prop_map(String::from)
}

fn integer_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<u8>().prop_map(Value::Byte),
        any::<i16>().prop_map(Value::Int16),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        any::<u16>().prop_map(Value::UInt16),
        any::<u32>().prop_map(Value::UInt32),
        any::<u64>().prop_map(Value::UInt64),
    ]
}

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<char>().prop_map(Value::Char),
        integer_strategy(),
        any::<f32>().prop_map(Value::Single),
        any::<f64>().prop_map(Value::Double),
        ".{0,40}".prop_map(Value::String),
        (-(1i64 << 60)..(1i64 << 60)).prop_map(|t| Value::TimeSpan(ticks_to_timespan(t))),
        (0..=MAX_DATETIME_TICKS).prop_filter_map("in chrono range", |t| {
            ticks_to_datetime(t).ok().map(Value::DateTime)
        }),
        (type_name_strategy(), integer_strategy()).prop_map(|(type_name, value)| Value::Enum {
            type_name,
            value: Box::new(value),
        }),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            (type_name_strategy(), prop::collection::vec(inner.clone(), 0..8))
                .prop_map(|(type_name, items)| Value::List { type_name, items }),
            (type_name_strategy(), prop::collection::vec(inner.clone(), 0..8))
                .prop_map(|(type_name, items)| Value::Array { type_name, items }),
            (type_name_strategy(), prop::collection::vec(inner.clone(), 1..5))
                .prop_map(|(type_name, items)| Value::Tuple { type_name, items }),
            (
                type_name_strategy(),
                prop::collection::vec((inner.clone(), inner), 0..6)
            )
                .prop_map(|(type_name, entries)| Value::Dictionary { type_name, entries }),
        ]
    })
}

fn serializer() -> BinarySerializer {
    BinarySerializer::new(Arc::new(Registry::empty()))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        .. ProptestConfig::default()
    })]

    /// Любое значение переживает encode -> decode.
    #[test]
    fn roundtrip_all_values(value in value_strategy()) {
        let s = serializer();
        let mut table = TypeTable::new();
        let encoded = s.serialize(&value, &mut table)
            .map_err(|e| TestCaseError::fail(format!("Failed to encode value: {e}")))?;

        let decoded = s.deserialize(&mut encoded.bytes.as_slice(), &table)
            .map_err(|e| TestCaseError::fail(format!("Failed to decode value: {e}")))?;

        prop_assert!(
            value_deep_eq(&value, &decoded),
            "Roundtrip failed\nleft: {value:?}\nright: {decoded:?}"
        );
    }

    /// Таблица, восстановленная из сохранённой формы, декодирует те же байты.
    #[test]
    fn roundtrip_through_persisted_table(value in value_strategy()) {
        let s = serializer();
        let mut table = TypeTable::new();
        let encoded = s.serialize(&value, &mut table).unwrap();

        let restored = TypeTable::decode(&mut table.encode().unwrap().as_slice()).unwrap();
        prop_assert_eq!(&restored, &table);

        let decoded = s.deserialize(&mut encoded.bytes.as_slice(), &restored).unwrap();
        prop_assert!(value_deep_eq(&value, &decoded));
    }

    /// Повторная сериализация не добавляет записей в таблицу.
    #[test]
    fn second_pass_does_not_grow_table(value in value_strategy()) {
        let s = serializer();
        let mut table = TypeTable::new();
        let first = s.serialize(&value, &mut table).unwrap();
        let len = table.len();
        let second = s.serialize(&value, &mut table).unwrap();

        prop_assert!(!second.table_grew);
        prop_assert_eq!(table.len(), len);
        prop_assert_eq!(first.bytes, second.bytes);
    }

    /// Длительность или момент времени с точностью до наносекунды: значение
    /// либо переживает encode/decode без изменений, либо отклоняется, если
    /// не кратно 100 нс.
    #[test]
    fn time_values_are_exact_or_rejected(
        secs in -(1i64 << 32)..(1i64 << 32),
        nanos in 0u32..1_000_000_000,
        as_datetime in any::<bool>(),
    ) {
        let value = if as_datetime {
            let Some(dt) = DateTime::from_timestamp(secs.rem_euclid(1i64 << 35), nanos) else {
                return Ok(());
            };
            Value::DateTime(dt.naive_utc())
        } else {
            Value::TimeSpan(TimeDelta::seconds(secs) + TimeDelta::nanoseconds(i64::from(nanos)))
        };
        let sub_tick = match &value {
            Value::DateTime(dt) => dt.nanosecond() % 100 != 0,
            _ => nanos % 100 != 0,
        };

        let s = serializer();
        let mut table = TypeTable::new();
        match s.serialize(&value, &mut table) {
            Ok(encoded) => {
                prop_assert!(!sub_tick);
                let decoded = s.deserialize(&mut encoded.bytes.as_slice(), &table).unwrap();
                prop_assert_eq!(decoded, value);
            }
            Err(e) => {
                prop_assert!(sub_tick, "unexpected error {e}");
                prop_assert!(matches!(e, SerializerError::InvalidData { .. }), "expected InvalidData, got {e:?}");
            }
        }
    }

    /// Байты после значения остаются непрочитанными.
    #[test]
    fn trailing_bytes_untouched(
        value in value_strategy(),
        tail in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let s = serializer();
        let mut table = TypeTable::new();
        let mut bytes = s.serialize(&value, &mut table).unwrap().bytes;
        bytes.extend_from_slice(&tail);

        let mut input = bytes.as_slice();
        let decoded = s.deserialize(&mut input, &table).unwrap();
        prop_assert!(value_deep_eq(&value, &decoded));
        prop_assert_eq!(input, tail.as_slice());
    }
}

#[test]
fn test_int64_wire_bytes() {
    let bytes = serializer()
        .serialize(&Value::Int64(42), &mut TypeTable::new())
        .unwrap()
        .bytes;
    assert_eq!(bytes, vec![6, 0x2A, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_nested_dictionary_of_lists() {
    let value = Value::Dictionary {
        type_name: "Dictionary<string,List<i32>>".into(),
        entries: vec![
            (
                Value::from("odd"),
                Value::List {
                    type_name: "List<i32>".into(),
                    items: vec![Value::Int32(1), Value::Int32(3)],
                },
            ),
            (
                Value::from("none"),
                Value::List {
                    type_name: "List<i32>".into(),
                    items: vec![],
                },
            ),
        ],
    };
    let s = serializer();
    let mut table = TypeTable::new();
    let bytes = s.serialize(&value, &mut table).unwrap().bytes;
    assert_eq!(table.names(), ["Dictionary<string,List<i32>>", "List<i32>"]);
    assert_eq!(s.deserialize(&mut bytes.as_slice(), &table).unwrap(), value);
}
