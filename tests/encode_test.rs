/*!
 * Encode Integration Tests
 * End-to-end output of the public encode API against known documents
 */

use planjson::harness::fixtures;
use planjson::{
    encode_dyn_to_bytes, encode_to_bytes, to_string, to_vec, transparent, AnyValue, Dynamic,
    EncodeOptions, Encoder, RawJson, Reflect, Shape,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

fn encode_str<T: Reflect>(value: &T, options: &EncodeOptions) -> String {
    String::from_utf8(encode_to_bytes(value, options).unwrap()).unwrap()
}

fn parse(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

// ============================================================================
// Fixtures
// ============================================================================

#[test]
fn test_simple_payload_exact_output() {
    assert_eq!(
        to_string(&fixtures::simple()).unwrap(),
        r#"{"st":1,"sid":2,"tt":"TestString","gr":4,"uuid":"8f9a65eb-4807-4d57-b6e0-bda5d62f1429","ip":"127.0.0.1","ua":"Mozilla","tz":8,"v":true}"#
    );
}

#[test]
fn test_simple_payload_matches_serde_json() {
    let payload = fixtures::simple();
    assert_eq!(to_vec(&payload).unwrap(), serde_json::to_vec(&payload).unwrap());
}

#[test]
fn test_complex_payload_matches_serde_except_bytes() {
    let payload = fixtures::complex();
    let mut ours = parse(&to_vec(&payload).unwrap());
    let mut theirs = serde_json::to_value(&payload).unwrap();

    // bytes become base64 here and a number array under serde
    let k = ours.as_object_mut().unwrap().remove("k").unwrap();
    assert_eq!(k.as_str().unwrap().len(), 44);
    theirs.as_object_mut().unwrap().remove("k");

    assert_eq!(ours, theirs);
    assert!(ours.get("f").is_none());
    assert!(ours.get("o2").is_none());
    assert_eq!(ours["B1"], Value::Null);
    assert_eq!(ours["j"], json!([]));
    assert_eq!(ours["o1"], json!([0, 42, null]));
}

#[test]
fn test_complex_payload_field_order() {
    let out = to_string(&fixtures::complex()).unwrap();
    let keys = [
        "\"a\":", "\"B1\":", "\"B2\":", "\"c\":", "\"d\":", "\"e\":", "\"g\":", "\"h\":",
        "\"i\":", "\"j\":", "\"k\":", "\"l\":", "\"m1\":", "\"m2\":", "\"n\":", "\"o1\":",
        "\"p\":", "\"q\":", "\"r\":",
    ];
    let positions: Vec<usize> = keys.iter().map(|k| out.find(k).unwrap()).collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
}

#[test]
fn test_medium_payload_matches_serde_json() {
    let payload = fixtures::medium().unwrap();
    assert_eq!(
        to_vec(&payload).unwrap(),
        serde_json::to_vec(&payload).unwrap()
    );
}

#[test]
fn test_medium_value_matches_serde_json() {
    let value = fixtures::medium_value().unwrap();
    assert_eq!(
        to_string(&value).unwrap(),
        serde_json::to_string(&value).unwrap()
    );
}

#[test]
fn test_interface_fixture() {
    let value = fixtures::interface();
    assert_eq!(to_string(&value).unwrap(), r#""Loreum""#);
}

// ============================================================================
// Maps
// ============================================================================

#[test]
fn test_map_sorted_by_default() {
    assert_eq!(to_string(&fixtures::map()).unwrap(), r#"{"a":1,"b":2,"c":3}"#);
}

#[test]
fn test_map_unsorted_has_same_entries() {
    let options = EncodeOptions::default().unsorted_maps();
    let out = encode_to_bytes(&fixtures::map(), &options).unwrap();
    assert_eq!(parse(&out), json!({"a": 1, "b": 2, "c": 3}));
}

#[test]
fn test_integer_keys_sort_as_text() {
    let map: HashMap<i32, bool> = HashMap::from([(10, true), (9, false), (-1, true)]);
    assert_eq!(
        to_string(&map).unwrap(),
        r#"{"-1":true,"10":true,"9":false}"#
    );
}

#[test]
fn test_char_keys_and_nested_maps() {
    let mut inner = BTreeMap::new();
    inner.insert('z', 1u8);
    inner.insert('y', 2u8);
    let outer: HashMap<String, BTreeMap<char, u8>> = HashMap::from([("m".into(), inner)]);
    assert_eq!(to_string(&outer).unwrap(), r#"{"m":{"y":2,"z":1}}"#);
}

#[test]
fn test_empty_map_and_sequence() {
    let map: HashMap<String, i64> = HashMap::new();
    assert_eq!(to_string(&map).unwrap(), "{}");
    assert_eq!(to_string(&Vec::<String>::new()).unwrap(), "[]");
}

// ============================================================================
// Struct Features
// ============================================================================

#[derive(Default)]
struct Sparse {
    name: String,
    count: u32,
    tags: Vec<String>,
    parent: Option<Box<Sparse>>,
    enabled: bool,
}

planjson::reflect_struct!(Sparse {
    name [omit_empty],
    count [omit_empty],
    tags [omit_empty],
    parent [omit_empty],
    enabled,
});

#[test]
fn test_omit_empty_fields() {
    assert_eq!(to_string(&Sparse::default()).unwrap(), r#"{"enabled":false}"#);

    let filled = Sparse {
        name: "n".into(),
        count: 3,
        tags: vec!["t".into()],
        parent: Some(Box::default()),
        enabled: true,
    };
    assert_eq!(
        to_string(&filled).unwrap(),
        r#"{"name":"n","count":3,"tags":["t"],"parent":{"enabled":false},"enabled":true}"#
    );
}

#[test]
fn test_omit_empty_default_option() {
    let options = EncodeOptions::default().omit_empty_by_default();
    assert_eq!(encode_str(&Sparse::default(), &options), "{}");
}

struct Meta {
    id: u64,
    kind: &'static str,
}

planjson::reflect_struct!(Meta { id, kind });

struct Record {
    meta: Option<Box<Meta>>,
    kind: &'static str,
    body: String,
}

planjson::reflect_struct!(Record { meta [inline], kind, body });

#[test]
fn test_inline_fields_promoted_and_shadowed() {
    let record = Record {
        meta: Some(Box::new(Meta { id: 7, kind: "inner" })),
        kind: "outer",
        body: "b".into(),
    };
    assert_eq!(
        to_string(&record).unwrap(),
        r#"{"id":7,"kind":"outer","body":"b"}"#
    );
}

#[test]
fn test_inline_null_pointer_fields_absent() {
    let record = Record {
        meta: None,
        kind: "outer",
        body: String::new(),
    };
    assert_eq!(to_string(&record).unwrap(), r#"{"kind":"outer","body":""}"#);
}

struct UserId(u64);

impl Reflect for UserId {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| transparent(|id: &UserId| &id.0))
    }
}

struct Owner {
    id: UserId,
    ids: Vec<UserId>,
}

planjson::reflect_struct!(Owner { id, ids });

#[test]
fn test_transparent_newtype() {
    let owner = Owner {
        id: UserId(5),
        ids: vec![UserId(1), UserId(2)],
    };
    assert_eq!(to_string(&owner).unwrap(), r#"{"id":5,"ids":[1,2]}"#);
}

// ============================================================================
// Dynamic Values
// ============================================================================

struct Envelope {
    kind: String,
    payload: AnyValue,
    shared: Option<Arc<dyn Dynamic>>,
}

planjson::reflect_struct!(Envelope { kind, payload, shared });

#[test]
fn test_dynamic_payload_dispatch() {
    let envelope = Envelope {
        kind: "simple".into(),
        payload: Some(Box::new(fixtures::simple())),
        shared: Some(Arc::new(vec![1u8, 2])),
    };
    let out = parse(&to_vec(&envelope).unwrap());
    assert_eq!(out["payload"], serde_json::to_value(fixtures::simple()).unwrap());
    assert_eq!(out["shared"], json!([1, 2]));

    let empty = Envelope {
        kind: String::new(),
        payload: None,
        shared: None,
    };
    assert_eq!(
        to_string(&empty).unwrap(),
        r#"{"kind":"","payload":null,"shared":null}"#
    );
}

#[test]
fn test_encode_dyn_to_bytes() {
    let value: Box<dyn Dynamic> = Box::new(fixtures::map());
    let out = encode_dyn_to_bytes(&*value, &EncodeOptions::default()).unwrap();
    assert_eq!(out, br#"{"a":1,"b":2,"c":3}"#);
}

#[test]
fn test_json_value_tree() {
    let value = json!({"b": [1, 2.5, null], "a": {"nested": true}, "c": "x"});
    assert_eq!(
        to_string(&value).unwrap(),
        r#"{"a":{"nested":true},"b":[1,2.5,null],"c":"x"}"#
    );
}

struct Cached {
    id: u32,
    body: RawJson,
}

planjson::reflect_struct!(Cached { id, body });

#[test]
fn test_raw_json_written_verbatim() {
    let cached = Cached {
        id: 1,
        body: RawJson::new(r#"{"pre":[1,2]}"#).unwrap(),
    };
    assert_eq!(to_string(&cached).unwrap(), r#"{"id":1,"body":{"pre":[1,2]}}"#);
    assert!(RawJson::new("{not json").is_err());
}

// ============================================================================
// Text
// ============================================================================

#[test]
fn test_html_escaping_toggle() {
    let text = String::from("<a href=\"x\">&</a>");
    assert_eq!(
        to_string(&text).unwrap(),
        "\"\\u003ca href=\\\"x\\\"\\u003e\\u0026\\u003c/a\\u003e\""
    );
    let plain = encode_str(&text, &EncodeOptions::default().no_html_escaping());
    assert_eq!(plain, "\"<a href=\\\"x\\\">&</a>\"");
}

#[test]
fn test_html_escaping_applies_to_map_keys() {
    let map: HashMap<String, u8> = HashMap::from([("<k>".into(), 1)]);
    assert_eq!(to_string(&map).unwrap(), "{\"\\u003ck\\u003e\":1}");
}

#[test]
fn test_control_characters_escaped() {
    let text = String::from("tab\tline\nnul\u{0}");
    assert_eq!(
        to_string(&text).unwrap(),
        "\"tab\\tline\\nnul\\u0000\""
    );
}

#[cfg(unix)]
#[test]
fn test_invalid_utf8_path_coerced() {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    use std::path::PathBuf;

    let path = PathBuf::from(OsString::from_vec(vec![b'a', 0xff, b'b']));
    assert_eq!(to_string(&path).unwrap(), "\"a\\ufffdb\"");

    let raw = encode_to_bytes(&path, &EncodeOptions::default().no_utf8_coercion()).unwrap();
    assert_eq!(raw, vec![b'"', b'a', 0xff, b'b', b'"']);
}

// ============================================================================
// Numbers and Bytes
// ============================================================================

#[test]
fn test_float_formatting() {
    let floats = vec![0.0f64, 1.5, -2.0, 1e21, 1e-7, 123456.789];
    assert_eq!(
        to_string(&floats).unwrap(),
        "[0,1.5,-2,1e+21,1e-7,123456.789]"
    );
}

#[test]
fn test_integer_extremes() {
    let values = (i64::MIN, u64::MAX, i128::MIN);
    struct Extremes {
        a: i64,
        b: u64,
        c: i128,
    }
    planjson::reflect_struct!(Extremes { a, b, c });
    let out = to_string(&Extremes {
        a: values.0,
        b: values.1,
        c: values.2,
    })
    .unwrap();
    assert_eq!(
        out,
        format!(r#"{{"a":{},"b":{},"c":{}}}"#, values.0, values.1, values.2)
    );
}

#[test]
fn test_bytes_base64() {
    let bytes = bytes::Bytes::from_static(b"hello world");
    assert_eq!(to_string(&bytes).unwrap(), r#""aGVsbG8gd29ybGQ=""#);
    assert_eq!(to_string(&bytes::Bytes::new()).unwrap(), r#""""#);
}

// ============================================================================
// Sinks
// ============================================================================

#[test]
fn test_encoder_into_bytes_mut_and_writer() {
    let encoder = Encoder::new::<fixtures::SimplePayload>().unwrap();
    let payload = fixtures::simple();
    let options = EncodeOptions::default();

    let mut buf = bytes::BytesMut::new();
    encoder.encode(&payload, &mut buf, &options).unwrap();

    let mut sink = planjson::IoSink::new(Vec::new());
    encoder.encode(&payload, &mut sink, &options).unwrap();

    assert_eq!(&buf[..], sink.get_ref().as_slice());
    assert_eq!(buf.freeze(), to_vec(&payload).unwrap());
}
