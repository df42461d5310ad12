/*!
 * serde_json Interop
 *
 * Shapes for `serde_json::Value` (a closed tagged union dispatched like an
 * interface), `Number` and `Map`, plus `RawJson` for pre-encoded fragments.
 */

use super::access::{InterfaceView, IterMap, RawHook};
use super::{CustomShape, Dynamic, InterfaceShape, MapShape, Reflect, Shape, ShapeKind};
use crate::core::{EncodeResult, Sink};
use crate::encoder::number::{write_f64, write_integer};
use serde_json::{Map, Number, Value};

fn value_variant(value: &Value) -> Option<&dyn Dynamic> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b as &dyn Dynamic),
        Value::Number(n) => Some(n as &dyn Dynamic),
        Value::String(s) => Some(s as &dyn Dynamic),
        Value::Array(items) => Some(items as &dyn Dynamic),
        Value::Object(map) => Some(map as &dyn Dynamic),
    }
}

impl Reflect for Value {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| {
            ShapeKind::Interface(InterfaceShape {
                access: Box::new(InterfaceView::new(value_variant)),
            })
        })
    }
}

fn write_number(number: &Number, sink: &mut dyn Sink) -> EncodeResult<()> {
    if let Some(n) = number.as_u64() {
        write_integer(sink, n)
    } else if let Some(n) = number.as_i64() {
        write_integer(sink, n)
    } else if let Some(n) = number.as_f64() {
        write_f64(sink, n)
    } else {
        sink.write_bytes(number.to_string().as_bytes())?;
        Ok(())
    }
}

impl Reflect for Number {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| {
            ShapeKind::Custom(CustomShape {
                hook: Box::new(RawHook::new(write_number)),
            })
        })
    }
}

impl Reflect for Map<String, Value> {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| {
            ShapeKind::Map(MapShape {
                key: String::shape,
                value: Value::shape,
                access: Box::new(IterMap::<Self, String, Value>::new(Map::len)),
            })
        })
    }
}

/// Pre-encoded JSON copied to the output verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJson(Box<str>);

impl RawJson {
    /// Wrap `text` after checking it is one well-formed JSON value
    pub fn new(text: impl Into<Box<str>>) -> Result<Self, serde_json::Error> {
        let text = text.into();
        serde_json::from_str::<serde::de::IgnoredAny>(&text)?;
        Ok(Self(text))
    }

    /// Wrap `text` without validation
    pub fn from_trusted(text: impl Into<Box<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn write_raw(raw: &RawJson, sink: &mut dyn Sink) -> EncodeResult<()> {
    sink.write_bytes(raw.0.as_bytes())?;
    Ok(())
}

impl Reflect for RawJson {
    fn shape() -> &'static Shape {
        Shape::register::<Self>(|| {
            ShapeKind::Custom(CustomShape {
                hook: Box::new(RawHook::new(write_raw)),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_variants_resolve() {
        assert!(value_variant(&Value::Null).is_none());
        let shape = value_variant(&Value::from(3)).map(|d| d.dyn_shape());
        assert!(shape.is_some_and(|s| std::ptr::eq(s, Number::shape())));
        let shape = value_variant(&Value::from("s")).map(|d| d.dyn_shape());
        assert!(shape.is_some_and(|s| std::ptr::eq(s, String::shape())));
    }

    #[test]
    fn test_number_hook() {
        let mut out = Vec::new();
        for n in [Number::from(-7), Number::from(u64::MAX)] {
            write_number(&n, &mut out).unwrap();
            out.push(b',');
        }
        write_number(&Number::from_f64(2.5).unwrap(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "-7,18446744073709551615,2.5");
    }

    #[test]
    fn test_raw_json_validation() {
        assert!(RawJson::new("{\"a\":[1,2]}").is_ok());
        assert!(RawJson::new("{\"a\":").is_err());
        assert!(RawJson::new("1 2").is_err());
        assert_eq!(RawJson::from_trusted("null").as_str(), "null");
    }
}
