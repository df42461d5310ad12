/*!
 * Streaming Encoder
 *
 * Executes compiled plans against live values, writing JSON into a `Sink`.
 *
 * # Usage
 * - `Encoder::new::<T>()` compiles once; call `encode`/`to_vec` many times
 * - `encode_to_bytes` resolves the plan through the global cache per call
 * - `encode` runs an explicit plan against a type-erased value
 */

mod base64;
mod context;
pub(crate) mod escape;
pub(crate) mod number;

use crate::core::{EncodeOptions, EncodeResult, ShapeError, Sink, ValueError};
use crate::plan::{compile, Plan, PlanCache};
use crate::shape::{Dynamic, Reflect, Shape};
use context::EncodeContext;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Run `plan` against `value`, resolving dynamic values through the global cache
pub fn encode<S: Sink + ?Sized>(
    plan: &Plan,
    value: &dyn Any,
    sink: &mut S,
    options: &EncodeOptions,
) -> EncodeResult<()> {
    encode_with_cache(PlanCache::global(), plan, value, sink, options)
}

/// Run `plan` against `value` with an explicit cache for dynamic values
///
/// A value of the wrong type is rejected before anything is written.
pub fn encode_with_cache<S: Sink + ?Sized>(
    cache: &PlanCache,
    plan: &Plan,
    value: &dyn Any,
    sink: &mut S,
    options: &EncodeOptions,
) -> EncodeResult<()> {
    if value.type_id() != plan.shape().type_id() {
        return Err(ValueError::TypeMismatch {
            expected: plan.shape().type_name(),
        }
        .into());
    }
    EncodeContext::new(sink, options, cache).run(plan, value)
}

/// Encode any reflected value into a fresh buffer
pub fn encode_to_bytes<T: Reflect>(value: &T, options: &EncodeOptions) -> EncodeResult<Vec<u8>> {
    let plan = compile(T::shape())?;
    let mut out = Vec::new();
    encode(&plan, value, &mut out, options)?;
    Ok(out)
}

/// Encode a dynamically typed value into a fresh buffer
pub fn encode_dyn_to_bytes(value: &dyn Dynamic, options: &EncodeOptions) -> EncodeResult<Vec<u8>> {
    let plan = compile(value.dyn_shape())?;
    let mut out = Vec::new();
    encode(&plan, value.as_any(), &mut out, options)?;
    Ok(out)
}

/// Encode with default options
pub fn to_vec<T: Reflect>(value: &T) -> EncodeResult<Vec<u8>> {
    encode_to_bytes(value, &EncodeOptions::default())
}

/// Encode with default options into a `String`
pub fn to_string<T: Reflect>(value: &T) -> EncodeResult<String> {
    let bytes = to_vec(value)?;
    // UTF-8 coercion is on by default, so the output is valid UTF-8
    Ok(String::from_utf8(bytes)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()))
}

/// A plan compiled once and reused across calls
#[derive(Clone)]
pub struct Encoder<'c> {
    plan: Arc<Plan>,
    cache: &'c PlanCache,
}

impl fmt::Debug for Encoder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder").field("plan", &self.plan).finish()
    }
}

impl Encoder<'static> {
    /// Compile `T` through the global cache
    pub fn new<T: Reflect>() -> Result<Self, ShapeError> {
        Self::with_cache::<T>(PlanCache::global())
    }

    pub fn for_shape(shape: &'static Shape) -> Result<Self, ShapeError> {
        let plan = PlanCache::global().get_or_compile(shape)?;
        Ok(Self {
            plan,
            cache: PlanCache::global(),
        })
    }
}

impl<'c> Encoder<'c> {
    pub fn with_cache<T: Reflect>(cache: &'c PlanCache) -> Result<Self, ShapeError> {
        let plan = cache.get_or_compile(T::shape())?;
        Ok(Self { plan, cache })
    }

    pub fn plan(&self) -> &Arc<Plan> {
        &self.plan
    }

    pub fn encode<T: Reflect, S: Sink + ?Sized>(
        &self,
        value: &T,
        sink: &mut S,
        options: &EncodeOptions,
    ) -> EncodeResult<()> {
        encode_with_cache(self.cache, &self.plan, value, sink, options)
    }

    pub fn encode_dyn<S: Sink + ?Sized>(
        &self,
        value: &dyn Any,
        sink: &mut S,
        options: &EncodeOptions,
    ) -> EncodeResult<()> {
        encode_with_cache(self.cache, &self.plan, value, sink, options)
    }

    pub fn to_vec<T: Reflect>(&self, value: &T, options: &EncodeOptions) -> EncodeResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(value, &mut out, options)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EncodeError;
    use pretty_assertions::assert_eq;

    struct Point {
        x: i32,
        y: i32,
        label: Option<String>,
    }

    crate::reflect_struct!(Point { x, y, label [omit_empty] });

    #[test]
    fn test_encode_struct() {
        let p = Point {
            x: 1,
            y: -2,
            label: None,
        };
        assert_eq!(to_string(&p).unwrap(), r#"{"x":1,"y":-2}"#);

        let p = Point {
            label: Some("a\"b".into()),
            ..p
        };
        assert_eq!(to_string(&p).unwrap(), r#"{"x":1,"y":-2,"label":"a\"b"}"#);
    }

    #[test]
    fn test_wrong_value_type_writes_nothing() {
        let encoder = Encoder::new::<Point>().unwrap();
        let mut out: Vec<u8> = Vec::new();
        let err = encoder
            .encode_dyn(&5u8, &mut out, &EncodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, EncodeError::Value(ValueError::TypeMismatch { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_encoder_reuse_with_private_cache() {
        let cache = PlanCache::new();
        let encoder = Encoder::with_cache::<Vec<Point>>(&cache).unwrap();
        let points: Vec<Point> = Vec::new();
        assert_eq!(encoder.to_vec(&points, &EncodeOptions::default()).unwrap(), b"[]");
        assert!(cache.len() >= 3);
    }

    #[test]
    fn test_encode_dyn_to_bytes() {
        let value: Box<dyn Dynamic> = Box::new(vec![1u8, 2]);
        let out = encode_dyn_to_bytes(&*value, &EncodeOptions::default()).unwrap();
        assert_eq!(out, b"[1,2]");
    }
}
