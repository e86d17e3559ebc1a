use std::io::{Cursor, Seek, SeekFrom};

use castprims::driver::{
    define_native, AbstractType, AdapterConfig, AdapterSettings, Driver, DriverError, DriverRegistry,
    EndianFlag, Lookup, NumberAdapter, Scalar, SerializerExt,
};
use castprims::types::{make_int_type, ByteSize, ConstraintPolicy, Integer};
use castprims::Serializer;

fn native() -> std::sync::Arc<Driver> {
    define_native(&DriverRegistry::new()).unwrap()
}

#[test]
fn descriptors_are_memoized() {
    let a = make_int_type(32, true).unwrap();
    let b = make_int_type(32, true).unwrap();
    assert!(std::ptr::eq(a, b));
    assert_eq!(a.size_of(), ByteSize::Finite(4));

    let unbounded = make_int_type(castprims::types::Bits::Unbounded, true).unwrap();
    assert_eq!(unbounded.size_of(), ByteSize::Unbounded);
}

#[test]
fn unsigned_byte_bounds() {
    let adapter = NumberAdapter::new(make_int_type(8, false).unwrap(), AdapterSettings::default());

    assert_eq!(adapter.load(&[0xFFu8][..], None).unwrap(), Scalar::from(255u8));
    assert_eq!(adapter.dump(255u32, None).unwrap().as_ref(), &[0xFF]);

    for value in [256i64, -1] {
        let err = adapter.dump(value, None).unwrap_err();
        assert!(matches!(err, DriverError::Constraint(_)), "{value}: {err}");
    }
}

#[test]
fn unregistered_type_is_not_implemented() {
    let driver = native();
    let nibble = AbstractType::Number(make_int_type(4, false).unwrap());

    assert!(matches!(driver.lookup(&nibble), Lookup::NotImplemented));
    let err = driver.instantiate(&nibble, &AdapterSettings::default()).err().unwrap();
    assert!(matches!(err, DriverError::NotImplemented { .. }));
    assert!(matches!(driver.lookup(&AbstractType::Named("Frame")), Lookup::NotImplemented));
}

#[test]
fn fixed_adapters_round_trip_at_their_width() {
    let driver = native();
    let cases: [(&str, Scalar); 9] = [
        ("Byte", Scalar::from(-128i8)),
        ("UnsignedChar", Scalar::from(200u8)),
        ("UnsignedShort", Scalar::from(65_535u16)),
        ("Int", Scalar::from(-123_456i32)),
        ("UnsignedLongLong", Scalar::from(u64::MAX)),
        ("SignedInt128", Scalar::from(i128::MIN)),
        ("Int256", Scalar::Int(-Integer::pow2(255))),
        ("Half", Scalar::from(65504.0f64)),
        ("Double", Scalar::from(-0.25f64)),
    ];

    for (name, value) in cases {
        let serializer = driver.resolve(name).implementation().unwrap().instantiate(&AdapterSettings::default()).unwrap();
        let size = serializer.size().unwrap();
        let dumped = serializer.dump(value.clone(), None).unwrap();
        assert_eq!(dumped.len(), size, "{name}");
        assert_eq!(serializer.load(&dumped[..], None).unwrap(), value, "{name}");
    }
}

#[test]
fn odd_width_uses_byte_integer_codec() {
    let adapter = NumberAdapter::new(make_int_type(24, true).unwrap(), AdapterSettings::default().little(true));
    let dumped = adapter.dump(-2i32, None).unwrap();
    assert_eq!(dumped.as_ref(), &[0xFE, 0xFF, 0xFF]);
    assert_eq!(adapter.size(), Some(3));
    assert!(adapter.dump(1i32 << 23, None).is_err());
}

#[test]
fn deferred_endianness_reads_context() {
    use castprims::context::{ContextKind, MapContext, ScopeType};

    let flag = EndianFlag::deferred(|context| {
        context
            .and_then(castprims::context::downcast::<MapContext>)
            .and_then(|map| map.get("little"))
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    });
    let adapter = NumberAdapter::new(make_int_type(16, false).unwrap(), AdapterSettings::default().little(flag));

    let scope = ScopeType::builder("frame")
        .context_kind(ContextKind::Mapping)
        .build()
        .unwrap()
        .instantiate(None)
        .unwrap();
    let context = scope.context();

    assert_eq!(adapter.dump(0x0102u16, Some(&context)).unwrap().as_ref(), &[0x01, 0x02]);
    scope
        .context_as::<MapContext>()
        .unwrap()
        .insert("little", serde_json::json!(true));
    assert_eq!(adapter.dump(0x0102u16, Some(&context)).unwrap().as_ref(), &[0x02, 0x01]);
}

#[test]
fn config_drives_policy() {
    let config = AdapterConfig::from_json(r#"{"little": true, "policy": "reshape"}"#).unwrap();
    let adapter = NumberAdapter::new(make_int_type(8, true).unwrap(), config.into());

    assert_eq!(adapter.dump(1000i32, None).unwrap().as_ref(), &[0x7F]);
    assert_eq!(
        adapter.constraint().unwrap().policy(),
        ConstraintPolicy::Reshape
    );
    assert!(AdapterConfig::from_json(r#"{"order": "big"}"#).is_err());
}

#[test]
fn dump_into_returns_only_its_span() {
    let adapter = NumberAdapter::new(make_int_type(16, false).unwrap(), AdapterSettings::default());
    let mut stream = Cursor::new(vec![0xAA, 0xBB]);
    stream.seek(SeekFrom::End(0)).unwrap();

    let span = adapter.dump_into(0x1234u16, &mut stream, None).unwrap();
    assert_eq!(span.as_ref(), &[0x12, 0x34]);
    assert_eq!(stream.get_ref(), &vec![0xAA, 0xBB, 0x12, 0x34]);
    assert_eq!(stream.position(), 4);
}

#[test]
fn bound_errors_elide_wide_values() {
    let adapter = NumberAdapter::new(make_int_type(128, false).unwrap(), AdapterSettings::default());
    let err = adapter.dump(Integer::from_parts(true, u128::MAX), None).unwrap_err();
    let message = err.to_string();

    assert!(message.contains("..."), "{message}");
    assert!(!message.contains(&u128::MAX.to_string()), "{message}");
}

#[test]
fn wide_integers_are_registered_natively() {
    let driver = native();
    let serializer = driver
        .resolve("UnsignedInt512")
        .implementation()
        .unwrap()
        .instantiate(&AdapterSettings::default().little(true))
        .unwrap();
    assert_eq!(serializer.size(), Some(64));

    let value = Integer::pow2(512);
    let err = serializer.dump(value, None).unwrap_err();
    assert!(matches!(err, DriverError::Constraint(_)));
    assert!(err.to_string().contains("..."), "{err}");

    let max: Integer = concat!(
        "13407807929942597099574024998205846127479365820592393377723561443721764030073546976",
        "801874298166903427690031858186486050853753882811946569946433649006084095"
    )
    .parse()
    .unwrap();
    assert_eq!(serializer.load(&[0xFFu8; 64][..], None).unwrap(), Scalar::Int(max));
}

#[tokio::test]
async fn async_cast_matches_sync() {
    let driver = native();
    let single = driver.resolve("Single").implementation().unwrap().instantiate(&AdapterSettings::default()).unwrap();
    let dumped = single.dump_async(Scalar::from(1.5f32), None).await.unwrap();
    assert_eq!(dumped, single.dump(1.5f32, None).unwrap());
    assert_eq!(single.load_async(dumped, None).await.unwrap(), Scalar::from(1.5f32));
}
