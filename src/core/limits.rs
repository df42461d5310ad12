/*!
 * Encoder Limits and Constants
 *
 * Centralized location for defaults and thresholds used by the compiler,
 * the plan cache and the streaming encoder.
 */

// =============================================================================
// ENCODING LIMITS
// =============================================================================

/// Default nesting cap (objects, arrays and maps entered)
/// Encoding recurses once per level, so this bounds stack use.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Doubles whose magnitude falls outside [1e-6, 1e21) use exponent notation
/// Same cut-off as ECMAScript Number.prototype.toString.
pub const FLOAT_EXP_LOWER: f64 = 1e-6;
pub const FLOAT_EXP_UPPER: f64 = 1e21;

/// Stack buffer for float formatting
/// Longest plain form is 24 significant characters plus sign.
pub const FLOAT_BUFFER_SIZE: usize = 64;

// =============================================================================
// CACHE SIZING
// =============================================================================

/// Initial capacity of the plan cache snapshot
/// [PERF] Most programs encode a few dozen distinct types.
pub const PLAN_CACHE_INITIAL_CAPACITY: usize = 64;

/// Initial capacity of the shape registry
pub const SHAPE_REGISTRY_INITIAL_CAPACITY: usize = 128;

// =============================================================================
// ENVIRONMENT
// =============================================================================

pub const ENV_SORT_MAP_KEYS: &str = "PLANJSON_SORT_MAP_KEYS";
pub const ENV_HTML_ESCAPING: &str = "PLANJSON_HTML_ESCAPING";
pub const ENV_UTF8_COERCION: &str = "PLANJSON_UTF8_COERCION";
pub const ENV_MAX_DEPTH: &str = "PLANJSON_MAX_DEPTH";
pub const ENV_OMIT_EMPTY: &str = "PLANJSON_OMIT_EMPTY";
pub const ENV_TRACE_JSON: &str = "PLANJSON_TRACE_JSON";
