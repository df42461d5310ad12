/*!
 * Property Tests
 * Encoder output parses back to the same data serde_json sees
 */

use planjson::{encode_to_bytes, EncodeOptions};
use proptest::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
struct Row {
    name: String,
    score: i64,
    ratio: f64,
    tags: Vec<String>,
    extra: Option<Box<Row>>,
}

planjson::reflect_struct!(Row { name, score, ratio, tags, extra });

fn row() -> impl Strategy<Value = Row> {
    let leaf = (
        any::<String>(),
        any::<i64>(),
        -1e12f64..1e12,
        prop::collection::vec(any::<String>(), 0..4),
    )
        .prop_map(|(name, score, ratio, tags)| Row {
            name,
            score,
            ratio,
            tags,
            extra: None,
        });
    leaf.prop_recursive(3, 8, 1, |inner| {
        (inner.clone(), inner).prop_map(|(mut outer, child)| {
            outer.extra = Some(Box::new(child));
            outer
        })
    })
}

fn plain() -> EncodeOptions {
    EncodeOptions::default().no_html_escaping()
}

proptest! {
    #[test]
    fn prop_strings_match_serde_json(s in any::<String>()) {
        let ours = encode_to_bytes(&s, &plain()).unwrap();
        prop_assert_eq!(ours, serde_json::to_vec(&s).unwrap());
    }

    #[test]
    fn prop_html_escaped_strings_parse_back(s in any::<String>()) {
        let ours = encode_to_bytes(&s, &EncodeOptions::default()).unwrap();
        prop_assert!(!ours.iter().any(|&b| matches!(b, b'<' | b'>' | b'&')));
        let parsed: String = serde_json::from_slice(&ours).unwrap();
        prop_assert_eq!(parsed, s);
    }

    #[test]
    fn prop_integers_match_serde_json(values in prop::collection::vec(any::<i64>(), 0..16)) {
        let ours = encode_to_bytes(&values, &plain()).unwrap();
        prop_assert_eq!(ours, serde_json::to_vec(&values).unwrap());
    }

    #[test]
    fn prop_finite_floats_parse_back(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let ours = encode_to_bytes(&value, &plain()).unwrap();
        let parsed: f64 = std::str::from_utf8(&ours).unwrap().parse().unwrap();
        prop_assert_eq!(parsed, value);
    }

    #[test]
    fn prop_maps_sorted_and_complete(map in prop::collection::hash_map("[a-z]{0,6}", any::<i32>(), 0..12)) {
        let ours = encode_to_bytes(&map, &plain()).unwrap();
        let parsed: Value = serde_json::from_slice(&ours).unwrap();
        prop_assert_eq!(&parsed, &serde_json::to_value(&map).unwrap());

        // lowercase ASCII keys escape to themselves, so output order is key order
        let text = String::from_utf8(ours).unwrap();
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| text.find(&format!("\"{k}\":")).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_structs_match_serde_json(value in row()) {
        let ours = encode_to_bytes(&value, &plain()).unwrap();
        let parsed: Value = serde_json::from_slice(&ours).unwrap();
        let expected = serde_json::to_value(&value).unwrap();
        prop_assert_eq!(normalize(parsed), normalize(expected));
    }

    #[test]
    fn prop_unsorted_maps_same_entries(map in prop::collection::hash_map(any::<String>(), any::<u16>(), 0..8)) {
        let sorted = encode_to_bytes(&map, &plain()).unwrap();
        let unsorted = encode_to_bytes(&map, &plain().unsorted_maps()).unwrap();
        let a: HashMap<String, u16> = serde_json::from_slice(&sorted).unwrap();
        let b: HashMap<String, u16> = serde_json::from_slice(&unsorted).unwrap();
        prop_assert_eq!(&a, &map);
        prop_assert_eq!(a, b);
    }
}

/// Float formatting differs between encoders; compare numbers by value
///
/// Numbers are narrowed to `f32` since serde_json's default float parser may
/// land one ulp away depending on notation.
fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::from(n.as_f64().unwrap_or_default() as f32 as f64),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        other => other,
    }
}
