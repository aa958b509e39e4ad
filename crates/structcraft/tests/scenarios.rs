//! End-to-end layouts decoded both eagerly and through views.

use structcraft::{
    Access, BitfieldDef, ByteOrder, CodecError, EnumDef, FormatError, RangeError, StructDef,
    StructOptions, Value, record,
};

fn color(byteorder: ByteOrder) -> StructDef {
    let mut def = StructDef::new(byteorder);
    for name in ["r", "g", "b", "a"] {
        def.add("uint8", name, 1).unwrap();
    }
    def
}

fn packed(byteorder: ByteOrder) -> StructDef {
    StructDef::with_options(StructOptions {
        byteorder,
        pack: Some(1),
        union: false,
    })
    .unwrap()
}

#[test]
fn test_four_bytes_as_color() {
    let def = color(ByteOrder::Native);
    let data = [1u8, 2, 3, 4];

    let eager = def.deserialize(&data).unwrap();
    assert_eq!(
        eager,
        record! { "r" => 1u8, "g" => 2u8, "b" => 3u8, "a" => 4u8 }
    );

    let view = def.instance_from(&data).unwrap();
    for (name, expected) in [("r", 1u8), ("g", 2), ("b", 3), ("a", 4)] {
        assert_eq!(view.value(name).unwrap(), Value::from(expected));
    }
}

#[test]
fn test_packed_pixel_with_nested_color() {
    let mut pixel = packed(ByteOrder::Little);
    pixel.add("uint8", "a", 1).unwrap();
    pixel.add("uint8", "b", 1).unwrap();
    pixel.add("uint16", "c", 1).unwrap();
    pixel.add("uint8", "d", 1).unwrap();
    pixel.add(color(ByteOrder::Little), "color", 1).unwrap();
    assert_eq!(pixel.size(), 9);
    assert_eq!(pixel.offset("color"), Some(5));

    let data = [0u8, 0, 0, 0, 0, 1, 2, 3, 4];
    let eager = pixel.deserialize(&data).unwrap();
    assert_eq!(
        eager["color"],
        Value::Struct(record! { "r" => 1u8, "g" => 2u8, "b" => 3u8, "a" => 4u8 })
    );

    let view = pixel.instance_from(&data).unwrap();
    let Access::Struct(color) = view.get("color").unwrap() else {
        panic!("color is a struct field");
    };
    assert_eq!(color.value("a").unwrap(), Value::UInt(4));
    assert_eq!(color.base_offset(), 5);
}

#[test]
fn test_array_of_ten_colors() {
    let mut palette = packed(ByteOrder::Little);
    palette.add(color(ByteOrder::Little), "colors", 10).unwrap();
    assert_eq!(palette.size(), 40);

    let mut data = [0x10u8, 0x20, 0x30, 0x00].repeat(9);
    data.extend_from_slice(&[0x40, 0x50, 0x60, 0x00]);

    let view = palette.instance_from(data.as_slice()).unwrap();
    let colors = view.array("colors").unwrap();
    assert_eq!(colors.len(), 10);
    assert_eq!(colors.child(0).unwrap().value("r").unwrap(), Value::UInt(0x10));
    assert_eq!(colors.child(9).unwrap().value("r").unwrap(), Value::UInt(0x40));
    assert_eq!(colors.child(9).unwrap().value("b").unwrap(), Value::UInt(0x60));
    assert_eq!(
        colors.child(10).unwrap_err(),
        FormatError::IndexOutOfRange { index: 10, len: 10 }
    );

    let eager = palette.deserialize(&data).unwrap();
    let Value::Array(elements) = &eager["colors"] else {
        panic!("colors is an array");
    };
    assert_eq!(elements.len(), 10);
    assert_eq!(elements[9].as_record().unwrap()["g"], Value::UInt(0x50));
}

#[test]
fn test_nibble_bitfield_over_two_containers() {
    let mut bits = BitfieldDef::new(ByteOrder::Little);
    for name in ["r", "g"] {
        bits.add(name, 4).unwrap();
    }
    assert_eq!(bits.size(), 1);

    let mut def = StructDef::new(ByteOrder::Little);
    def.add(bits.clone(), "first", 1).unwrap();
    def.add(bits, "second", 1).unwrap();

    let data = [0x99u8, 0x99];
    let eager = def.deserialize(&data).unwrap();
    for name in ["first", "second"] {
        assert_eq!(
            eager[name],
            Value::Struct(record! { "r" => 9u64, "g" => 9u64 })
        );
    }

    let bytes = def
        .serialize(&record! {
            "first" => record! { "r" => 9u8, "g" => 9u8 },
            "second" => record! { "r" => 9u8, "g" => 9u8 },
        })
        .unwrap();
    assert_eq!(bytes, data);
}

#[test]
fn test_view_writes_touch_only_their_field() {
    let mut flags = BitfieldDef::new(ByteOrder::Big);
    flags.add("hi", 3).unwrap();
    flags.add("lo", 5).unwrap();

    let mut def = StructDef::new(ByteOrder::Big);
    def.add("uint16", "id", 1).unwrap();
    def.add(flags, "flags", 1).unwrap();
    def.add("utf-8", "tag", 5).unwrap();
    def.add(color(ByteOrder::Big), "color", 1).unwrap();

    let mut buf = vec![0xAAu8; def.size()];
    let mut view = def.instance_from(buf.as_mut_slice()).unwrap();

    view.set("id", 0x0102u16).unwrap();
    view.bitfield_mut("flags").unwrap().set("hi", 5u8).unwrap();
    view.child_mut("color").unwrap().set("g", 7u8).unwrap();

    assert_eq!(&buf[..2], &[0x01, 0x02]);
    assert_eq!(buf[2], (5 << 5) | (0xAA & 0x1F));
    assert_eq!(&buf[3..8], &[0xAA; 5]);
    assert_eq!(&buf[8..12], &[0xAA, 7, 0xAA, 0xAA]);
}

#[test]
fn test_failed_view_write_leaves_buffer_alone() {
    let mut def = StructDef::new(ByteOrder::Little);
    def.add("utf-8", "name", 4).unwrap();
    def.add("int8", "small", 1).unwrap();

    let mut view = def.instance();
    view.set("name", "abc").unwrap();

    let err = view.set("name", "too long").unwrap_err();
    assert_eq!(
        err,
        CodecError::Range(RangeError::StringTooLong { len: 8, max: 4 })
    );
    assert!(matches!(
        view.set("small", 200u8),
        Err(CodecError::Range(RangeError::Integer { .. }))
    ));
    assert_eq!(view.value("name").unwrap(), Value::from("abc"));
    assert_eq!(view.into_inner(), b"abc\0\0");
}

#[test]
fn test_enum_passthrough_through_struct() {
    let mut mode = EnumDef::new(ByteOrder::Little);
    mode.add("off", 0).unwrap();
    mode.add("on", 1).unwrap();
    mode.add_next("auto").unwrap();

    let mut def = StructDef::new(ByteOrder::Little);
    def.add(mode, "mode", 3).unwrap();

    let eager = def.deserialize(&[2, 1, 9]).unwrap();
    assert_eq!(
        eager["mode"],
        Value::Array(vec![Value::from("auto"), Value::from("on"), Value::UInt(9)])
    );

    let bytes = def
        .serialize(&record! { "mode" => vec![Value::from("on"), Value::UInt(9)] })
        .unwrap();
    assert_eq!(bytes, [1, 9, 0]);
}

#[test]
fn test_union_overlays_members() {
    let mut word = StructDef::new_union(ByteOrder::Little);
    word.add("uint32", "value", 1).unwrap();
    word.add("uint8", "bytes", 4).unwrap();
    word.add(color(ByteOrder::Little), "color", 1).unwrap();
    assert_eq!(word.size(), 4);

    let mut view = word.instance();
    view.set("value", 0x0403_0201u32).unwrap();
    assert_eq!(
        view.array("bytes").unwrap().to_vec().unwrap(),
        [1u8, 2, 3, 4].map(Value::from)
    );
    assert_eq!(view.child("color").unwrap().value("b").unwrap(), Value::UInt(3));
}

#[test]
fn test_view_matches_deserialize() {
    let mut inner = StructDef::new(ByteOrder::Big);
    inner.add("int16", "x", 1).unwrap();
    inner.add("float32", "y", 1).unwrap();

    let mut bits = BitfieldDef::new(ByteOrder::Little);
    bits.add_signed("dx", 4).unwrap();
    bits.add("dy", 4).unwrap();

    let mut def = StructDef::new(ByteOrder::Little);
    def.add("bool8", "valid", 1).unwrap();
    def.add("uint32", "count", 1).unwrap();
    def.add(inner, "pos", 2).unwrap();
    def.add(bits, "delta", 1).unwrap();
    def.add("utf-8", "label", 6).unwrap();
    def.add("float64", "scale", 1).unwrap();

    let data = def
        .serialize(&record! {
            "valid" => true,
            "count" => 77u32,
            "pos" => vec![
                Value::from(record! { "x" => -5i16, "y" => 1.5f32 }),
                Value::from(record! { "x" => 300i16, "y" => -0.25f32 }),
            ],
            "delta" => record! { "dx" => -3i8, "dy" => 12u8 },
            "label" => "héllo",
            "scale" => 2.5f64,
        })
        .unwrap();
    assert_eq!(data.len(), def.size());

    let eager = def.deserialize(&data).unwrap();
    let view = def.instance_from(&data).unwrap();
    for field in def.fields() {
        assert_eq!(
            view.value(field.name()).unwrap(),
            eager[field.name()],
            "{}",
            field.name()
        );
    }
    assert_eq!(view.to_record().unwrap(), eager);
    assert_eq!(
        view.bitfield("delta").unwrap().get("dx").unwrap(),
        Value::Int(-3)
    );
    assert_eq!(
        view.array("pos").unwrap().child(1).unwrap().value("x").unwrap(),
        Value::Int(300)
    );
}

#[test]
fn test_deserialize_many_consecutive_records() {
    let def = color(ByteOrder::Native);
    let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
    let records = def.deserialize_many(&data).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["r"], Value::UInt(5));
}

#[test]
fn test_create_empty_instance_is_zeroed() {
    let mut def = StructDef::new(ByteOrder::Little);
    def.add("uint8", "a", 1).unwrap();
    def.add("uint64", "b", 1).unwrap();

    let view = def.create_empty_instance();
    assert_eq!(view.as_bytes(), [0u8; 16]);
    assert_eq!(view.to_record().unwrap(), def.create_empty_data());
}
