/*!
 * planjson
 *
 * Reflection-driven JSON encoder. A type's shape is derived once, compiled
 * into a reusable plan of encode instructions, cached process-wide and
 * executed against live values.
 *
 * ```ignore
 * struct User { id: u64, name: String }
 * planjson::reflect_struct!(User { id, name });
 *
 * let json = planjson::to_string(&User { id: 1, name: "ada".into() })?;
 * assert_eq!(json, r#"{"id":1,"name":"ada"}"#);
 * ```
 */

pub mod core;
pub mod encoder;
pub mod harness;
pub mod plan;
pub mod shape;
pub mod tracer;

// Re-exports
pub use crate::core::{
    EncodeError, EncodeOptions, EncodeResult, IoSink, OptionsError, ShapeError, Sink, ValueError,
    WriteError,
};
pub use encoder::{
    encode, encode_dyn_to_bytes, encode_to_bytes, encode_with_cache, to_string, to_vec, Encoder,
};
pub use plan::{compile, CacheStats, Plan, PlanCache};
pub use shape::{
    transparent, AnyValue, Dynamic, FieldFlags, RawJson, Reflect, ScalarKind, Shape, ShapeKind,
    StructBuilder,
};
pub use tracer::init_tracing;
