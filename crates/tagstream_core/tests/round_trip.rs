//! End-to-end round trips through the public API.

use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;

use tagstream_core::value::{
    BigDecimal, BigInt, BigRational, Deferred, Exception, HybridInt, OffsetTime, Period,
    StackFrame, Uuid, ZonedDateTime,
};
use tagstream_core::{
    from_bytes, to_bytes, DecodeHooks, Decoder, EncodeHooks, Encoder, Error, Map, Options,
    Pattern, Value, CHACHA20_POLY1305,
};

fn init_logger() {
    let _ = pretty_env_logger::formatted_builder()
        .is_test(true)
        .parse_filters("debug")
        .try_init();
}

fn round_trip_with(value: &Value, options: Options) -> Value {
    init_logger();
    let bytes = to_bytes([value], options.clone()).unwrap();
    let mut values = from_bytes(&bytes, options).unwrap();
    assert_eq!(values.len(), 1, "one value per stream");
    values.remove(0)
}

fn round_trip(value: &Value) -> Value {
    round_trip_with(value, Options::default())
}

fn keyword_map(entries: &[(&str, Value)]) -> Map {
    entries
        .iter()
        .map(|(k, v)| (Value::keyword(*k), v.clone()))
        .collect()
}

fn sample_values() -> Vec<Value> {
    let instant: DateTime<Utc> = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
    let date: DateTime<Utc> = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
    let local = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_nano_opt(23, 59, 58, 999)
        .unwrap();
    let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();

    vec![
        Value::Null,
        Value::Bool(true),
        Value::Bool(false),
        Value::Byte(-1),
        Value::Byte(i8::MIN),
        Value::Short(0),
        Value::Short(i16::MAX),
        Value::Int(1),
        Value::Int(-123_456),
        Value::Long(-1),
        Value::Long(i64::MAX),
        Value::Float(1.0),
        Value::Float(3.25),
        Value::Double(-1.0),
        Value::Double(std::f64::consts::PI),
        Value::Double(f64::INFINITY),
        Value::Char('λ'),
        Value::Uuid(Uuid::from_u128(0x0123_4567_89ab_cdef_fedc_ba98_7654_3210)),
        Value::String(String::new()),
        Value::from("hello, wörld"),
        Value::keyword("ns/name"),
        Value::symbol("sym"),
        Value::Regex(Pattern::new(r"^\d+(\.\d*)?$").unwrap()),
        Value::Url("https://example.org/a?b=c".into()),
        Value::Uri("urn:isbn:0451450523".into()),
        Value::Bytes(vec![0, 1, 2, 254, 255]),
        Value::Bytes(Vec::new()),
        Value::IntArray(vec![i32::MIN, 0, i32::MAX]),
        Value::ShortArray(vec![-2, 2]),
        Value::LongArray(vec![]),
        Value::FloatArray(vec![0.5, -0.25]),
        Value::DoubleArray(vec![1e300]),
        Value::BoolArray(vec![true, false, true]),
        Value::CharArray(vec!['a', '☃']),
        Value::BigInt(BigInt::from(i64::MAX) * BigInt::from(i64::MAX) * -1),
        Value::BigDecimal("-1234.56789".parse::<BigDecimal>().unwrap()),
        Value::Ratio(BigRational::new(BigInt::from(-3), BigInt::from(7))),
        Value::HybridInt(HybridInt::Small(42)),
        Value::HybridInt(HybridInt::normalized(BigInt::from(u64::MAX) * 16)),
        Value::Vector(vec![Value::Int(5), Value::Null, Value::from("x")]),
        Value::Vector(Vec::new()),
        Value::Map(keyword_map(&[("a", Value::Int(1)), ("b", Value::Vector(vec![]))])),
        Value::Map(Map::new()),
        Value::map_entry(Value::keyword("k"), Value::Long(9)),
        Value::Set(vec![Value::Int(1), Value::Int(2)]),
        Value::SortedSet(vec![Value::from("a"), Value::from("b")]),
        Value::SortedMap(keyword_map(&[("z", Value::Null)])),
        Value::List(vec![Value::Bool(false)]),
        Value::List(Vec::new()),
        Value::Queue(VecDeque::from(vec![Value::Int(3), Value::Int(4)])),
        Value::Seq((0..600).map(Value::Long).collect()),
        Value::Seq(Vec::new()),
        Value::Iterable(vec![Value::from("it")]),
        Value::GenericMap(keyword_map(&[("g", Value::Short(7))])),
        Value::GenericList(vec![Value::Char('g')]),
        Value::ObjectArray(vec![Value::Null, Value::Int(8)]),
        Value::Instant(instant),
        Value::Date(date),
        Value::LocalDate(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()),
        Value::LocalDate(NaiveDate::from_ymd_opt(2500, 1, 1).unwrap()),
        Value::LocalTime(NaiveTime::from_hms_nano_opt(7, 8, 9, 10).unwrap()),
        Value::LocalDateTime(local),
        Value::OffsetDateTime(offset.from_local_datetime(&local).unwrap()),
        Value::OffsetTime(OffsetTime {
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            offset: FixedOffset::west_opt(8 * 3600).unwrap(),
        }),
        Value::ZonedDateTime(ZonedDateTime {
            local,
            zone: "Europe/Paris".into(),
        }),
        Value::ZoneId("America/New_York".into()),
        Value::Duration(TimeDelta::milliseconds(-1_500)),
        Value::Duration(TimeDelta::seconds(86_400 * 365)),
        Value::Period(Period::new(1, -2, 30)),
        Value::Atom(Box::new(Value::Int(11))),
        Value::Ref(Box::new(Value::Vector(vec![Value::Null]))),
        Value::Future(Deferred::ready(Value::from("done"))),
        Value::Exception(Box::new(Exception::new("boom"))),
        Value::WithMeta {
            meta: keyword_map(&[("line", Value::Int(3))]),
            value: Box::new(Value::Vector(vec![Value::Int(1)])),
        },
        Value::Unsupported {
            type_name: "my::Thing".into(),
            repr: "Thing { .. }".into(),
        },
    ]
}

#[test]
fn test_every_variant() {
    for value in sample_values() {
        let back = round_trip(&value);
        println!("{} -> {:?}", value.type_name(), back);
        assert_eq!(back, value, "{}", value.type_name());
    }
}

#[test]
fn test_every_variant_in_one_stream() {
    let values = sample_values();
    let options = Options::builder().object_chunk_size(3).build().unwrap();
    let bytes = to_bytes(&values, options.clone()).unwrap();
    assert_eq!(from_bytes(&bytes, options).unwrap(), values);
}

#[test]
fn test_nested_composites() {
    let inner = Value::Map(keyword_map(&[
        ("seq", Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)])),
        ("set", Value::Set(vec![Value::keyword("x")])),
    ]));
    let value = Value::Vector(vec![
        inner.clone(),
        Value::List(vec![inner.clone(), Value::Atom(Box::new(inner))]),
    ]);
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_exception_chain() {
    let root = Exception::new("disk unplugged")
        .with_frame(StackFrame::new("io.Disk", "read", "Disk.java", 88));
    let middle = Exception::with_info(
        "load failed",
        keyword_map(&[("path", Value::from("/var/data")), ("retries", Value::Int(3))]),
    )
    .with_cause(root)
    .with_frame(StackFrame::new("app.Loader", "load", "Loader.java", 12))
    .with_frame(StackFrame::new("app.Main", "main", "Main.java", 5));
    let top = Exception::new("request aborted")
        .with_cause(middle)
        .with_suppressed(Exception::new("cleanup failed"));

    let back = round_trip(&Value::Exception(Box::new(top.clone())));
    let back = back.as_exception().unwrap();
    assert_eq!(back, &top);

    let messages: Vec<_> = back.chain().filter_map(|e| e.message.as_deref()).collect();
    assert_eq!(messages, ["request aborted", "load failed", "disk unplugged"]);

    let middle = back.cause.as_deref().unwrap();
    assert_eq!(middle.stack_trace.len(), 2);
    assert_eq!(
        middle.data.as_ref().unwrap().get(&Value::keyword("retries")),
        Some(&Value::Int(3))
    );
    assert_eq!(back.suppressed[0].message.as_deref(), Some("cleanup failed"));
}

#[test]
fn test_exception_without_message() {
    let ex = Exception::default().with_frame(StackFrame::new("A", "b", "A.java", -1));
    let value = Value::Exception(Box::new(ex));
    assert_eq!(round_trip(&value), value);
}

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

const POINT: i16 = 0x1001;

fn point_hooks() -> (EncodeHooks, DecodeHooks) {
    let enc = EncodeHooks::new().register::<Point, _>(|p, enc| {
        enc.write_tag(POINT)?;
        enc.write_int(p.x)?;
        enc.write_int(p.y)
    });
    let dec = DecodeHooks::new()
        .register(POINT, |_, dec| {
            let x = dec.read_int()?;
            let y = dec.read_int()?;
            Ok(Value::custom(Point { x, y }))
        })
        .unwrap();
    (enc, dec)
}

#[test]
fn test_external_hooks() {
    let (enc_hooks, dec_hooks) = point_hooks();
    let value = Value::Vector(vec![
        Value::custom(Point { x: 1, y: -2 }),
        Value::Map(keyword_map(&[("p", Value::custom(Point { x: 0, y: 0 }))])),
    ]);

    let mut buf = Vec::new();
    let mut enc = Encoder::with_hooks(&mut buf, Options::default(), enc_hooks).unwrap();
    enc.encode(&value).unwrap();
    enc.close().unwrap();
    println!("{:?}", buf);

    let mut dec = Decoder::with_hooks(buf.as_slice(), Options::default(), dec_hooks).unwrap();
    let back = dec.decode().unwrap().unwrap();
    assert_eq!(back, value);

    let Value::Vector(items) = &back else {
        panic!("expected a vector, got {}", back.type_name());
    };
    let Value::Custom(point) = &items[0] else {
        panic!("expected a custom value");
    };
    assert_eq!(point.downcast_ref::<Point>(), Some(&Point { x: 1, y: -2 }));
    assert_eq!(dec.decode().unwrap(), None);
}

#[test]
fn test_external_tag_without_decode_hook() {
    let (enc_hooks, _) = point_hooks();
    let mut buf = Vec::new();
    let mut enc = Encoder::with_hooks(&mut buf, Options::default(), enc_hooks).unwrap();
    enc.encode(&Value::custom(Point { x: 5, y: 5 })).unwrap();
    enc.close().unwrap();

    let err = from_bytes(&buf, Options::default()).unwrap_err();
    assert!(matches!(err, Error::UnknownTag { tag: POINT }), "{err}");
}

#[test]
fn test_unregistered_custom_falls_back() {
    let value = Value::custom(Point { x: 3, y: 4 });
    match round_trip(&value) {
        Value::Unsupported { type_name, repr } => {
            assert!(type_name.ends_with("Point"), "{type_name}");
            assert!(repr.contains("x: 3"), "{repr}");
        }
        other => panic!("expected an unsupported record, got {other:?}"),
    }
}

#[test]
fn test_builtin_tag_cannot_be_hooked() {
    let err = DecodeHooks::new()
        .register(tagstream_core::tags::STRING, |_, dec| dec.decode_child())
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_transformed_streams() {
    init_logger();
    let values = sample_values();
    let configs = [
        Options::builder().gzip(true).build().unwrap(),
        Options::builder()
            .cipher(CHACHA20_POLY1305, b"correct horse".to_vec())
            .byte_chunk_size(64)
            .build()
            .unwrap(),
        Options::builder()
            .gzip(true)
            .io_use_temp_file(true)
            .cipher(CHACHA20_POLY1305, b"battery staple".to_vec())
            .build()
            .unwrap(),
    ];

    let plain = to_bytes(&values, Options::default()).unwrap();
    for options in configs {
        let bytes = to_bytes(&values, options.clone()).unwrap();
        assert_ne!(bytes, plain, "{options:?}");
        assert_eq!(from_bytes(&bytes, options).unwrap(), values);
    }
}

#[test]
fn test_wrong_secret_fails() {
    let write = Options::builder()
        .cipher(CHACHA20_POLY1305, b"one".to_vec())
        .build()
        .unwrap();
    let read = Options::builder()
        .cipher(CHACHA20_POLY1305, b"two".to_vec())
        .build()
        .unwrap();
    let bytes = to_bytes([&Value::from("secret payload")], write).unwrap();
    let err = from_bytes(&bytes, read).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
}

#[test]
fn test_stream_sequence_matches_decode() {
    let items: Vec<_> = (0..1000).map(|i| Value::from(format!("item-{i}"))).collect();
    let options = Options::builder().object_chunk_size(7).build().unwrap();
    let bytes = to_bytes(
        [&Value::Seq(items.clone()), &Value::keyword("after")],
        options.clone(),
    )
    .unwrap();

    let mut dec = Decoder::new(bytes.as_slice(), options).unwrap();
    let streamed = {
        let reader = dec.stream_sequence().unwrap();
        assert_eq!(reader.tag(), tagstream_core::tags::SEQ);
        reader.collect::<Result<Vec<_>, _>>().unwrap()
    };
    assert_eq!(streamed, items);
    assert_eq!(dec.decode().unwrap(), Some(Value::keyword("after")));
    assert!(dec.is_at_end().unwrap());
}

#[test]
fn test_serde_through_the_encoder() {
    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Reading {
        sensor: String,
        samples: Vec<f64>,
        ok: bool,
    }

    let reading = Reading {
        sensor: "t-1".into(),
        samples: vec![20.5, 21.0, -3.75],
        ok: true,
    };

    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf, Options::default()).unwrap();
    enc.encode_serde(&reading).unwrap();
    enc.close().unwrap();

    let mut dec = Decoder::new(buf.as_slice(), Options::default()).unwrap();
    assert_eq!(dec.decode_serde::<Reading>().unwrap(), Some(reading));
    assert_eq!(dec.decode_serde::<Reading>().unwrap(), None);
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i8>().prop_map(Value::Byte),
        any::<i16>().prop_map(Value::Short),
        any::<i32>().prop_map(Value::Int),
        any::<i64>().prop_map(Value::Long),
        prop_oneof![Just(-1.0), Just(0.0), Just(1.0), -1e12f64..1e12].prop_map(Value::Double),
        any::<char>().prop_map(Value::Char),
        ".{0,12}".prop_map(Value::String),
        "[a-z][a-z0-9-]{0,8}".prop_map(Value::Keyword),
        proptest::collection::vec(any::<u8>(), 0..40).prop_map(Value::Bytes),
        any::<i128>().prop_map(|v| Value::BigInt(BigInt::from(v))),
        proptest::collection::vec(any::<i32>(), 0..10).prop_map(Value::IntArray),
    ];

    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Vector),
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Set),
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::List),
            proptest::collection::vec(inner.clone(), 0..20).prop_map(Value::Seq),
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Iterable),
            proptest::collection::vec((inner.clone(), inner.clone()), 0..6)
                .prop_map(|entries| Value::Map(entries.into_iter().collect())),
            inner.clone().prop_map(|v| Value::Atom(Box::new(v))),
            (inner.clone(), inner).prop_map(|(k, v)| Value::map_entry(k, v)),
        ]
    })
}

proptest! {
    #[test]
    fn prop_round_trip(value in arb_value(), chunk in 1usize..10) {
        let options = Options::builder().object_chunk_size(chunk).build().unwrap();
        prop_assert_eq!(round_trip_with(&value, options), value);
    }

    #[test]
    fn prop_round_trip_gzip(values in proptest::collection::vec(arb_value(), 0..5)) {
        let options = Options::builder().gzip(true).build().unwrap();
        let bytes = to_bytes(&values, options.clone()).unwrap();
        prop_assert_eq!(from_bytes(&bytes, options).unwrap(), values);
    }
}
