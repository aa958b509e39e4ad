use std::fs;

use structcraft::{ByteOrder, TypeNode, Value, record};
use structcraft_cparse::{CParseError, ExternalToolError, ParseOptions, XmlCache, parse_c};

const PACKET_XML: &str = r#"<?xml version="1.0"?>
<CastXML format="1.1.0">
  <Struct id="_1" name="packet" members="_2 _3 _4" size="64" align="16"/>
  <Field id="_2" name="kind" type="_5" context="_1" offset="0"/>
  <Field id="_3" name="length" type="_6" context="_1" offset="16"/>
  <Field id="_4" name="tag" type="_7" context="_1" offset="32"/>
  <Typedef id="_5" name="uint16_t" type="_6"/>
  <FundamentalType id="_6" name="short unsigned int" size="16" align="16"/>
  <ArrayType id="_7" min="0" max="3" type="_8"/>
  <FundamentalType id="_8" name="char" size="8" align="8"/>
</CastXML>
"#;

fn options(cache: &XmlCache) -> ParseOptions {
    ParseOptions {
        castxml_cmd: "structcraft-test-missing-castxml".to_string(),
        byteorder: ByteOrder::Big,
        cache: cache.clone(),
        use_cached: true,
        ..Default::default()
    }
}

#[test]
fn test_parse_from_cached_xml() {
    let dir = tempfile::tempdir().unwrap();
    let cache = XmlCache::new(dir.path());
    let inputs = ["packet.h"];
    fs::write(cache.path_for(&inputs), PACKET_XML).unwrap();

    let types = parse_c(&inputs, &options(&cache)).unwrap();
    let TypeNode::Struct(packet) = &types["packet"] else {
        panic!("packet is a struct");
    };
    assert_eq!(packet.size(), 8);

    let bytes = packet
        .serialize(&record! { "kind" => 1u16, "length" => 0x0203u16, "tag" => "ab" })
        .unwrap();
    assert_eq!(bytes, [0, 1, 2, 3, b'a', b'b', 0, 0]);
    assert_eq!(
        packet.deserialize(&bytes).unwrap()["tag"],
        Value::from("ab")
    );
}

#[test]
fn test_missing_castxml_without_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = XmlCache::new(dir.path());

    let err = parse_c(&["packet.h"], &options(&cache)).unwrap_err();
    assert!(matches!(
        err,
        CParseError::Tool(ExternalToolError::NotFound { .. })
    ));
}

#[test]
fn test_cache_ignored_unless_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let cache = XmlCache::new(dir.path());
    let inputs = ["packet.h"];
    fs::write(cache.path_for(&inputs), PACKET_XML).unwrap();

    let options = ParseOptions {
        use_cached: false,
        ..options(&cache)
    };
    assert!(matches!(
        parse_c(&inputs, &options),
        Err(CParseError::Tool(ExternalToolError::NotFound { .. }))
    ));
}
