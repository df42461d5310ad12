/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use thiserror::Error;

/// Result type for encode operations
pub type EncodeResult<T> = Result<T, EncodeError>;

/// A shape that cannot be compiled into a plan
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ShapeError {
    #[error("duplicate JSON key {key:?} in {type_name}")]
    #[diagnostic(
        code(shape::duplicate_key),
        help("Two fields at the same embedding depth resolve to the same wire key. Rename or skip one of them.")
    )]
    DuplicateKey {
        type_name: &'static str,
        key: String,
    },

    #[error("field {field} of {type_name} is marked inline but {inner} is not a struct")]
    #[diagnostic(
        code(shape::invalid_inline),
        help("Only struct shapes (optionally behind Option/Box/Arc) can be inlined.")
    )]
    InvalidInline {
        type_name: &'static str,
        field: &'static str,
        inner: &'static str,
    },

    #[error("map {type_name} has unsupported key type {key_type}")]
    #[diagnostic(
        code(shape::unsupported_map_key),
        help("JSON object keys must be strings; use a string-like or integer key type.")
    )]
    UnsupportedMapKey {
        type_name: &'static str,
        key_type: &'static str,
    },

    #[error("custom encoder attached to {type_name} does not accept that type")]
    #[diagnostic(
        code(shape::hook_mismatch),
        help("A custom hook must be registered on the exact type it encodes.")
    )]
    HookMismatch { type_name: &'static str },

    #[error("plan for {type_name} was referenced before it finished compiling")]
    #[diagnostic(
        code(shape::unresolved),
        help("This indicates a plan escaped a failed compilation. Please report this issue.")
    )]
    Unresolved { type_name: &'static str },
}

/// A runtime value that cannot be represented in JSON
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum ValueError {
    #[error("{value} cannot be represented in JSON")]
    #[diagnostic(
        code(value::non_finite),
        help("JSON has no NaN or Infinity literals. Filter or replace the value before encoding.")
    )]
    NonFinite { value: f64 },

    #[error("value does not match the compiled shape {expected}")]
    #[diagnostic(
        code(value::type_mismatch),
        help("Encode a value of the type the plan was compiled for.")
    )]
    TypeMismatch { expected: &'static str },

    #[error("custom encoder for {type_name} failed: {reason}")]
    #[diagnostic(code(value::custom))]
    Custom {
        type_name: &'static str,
        reason: String,
    },
}

/// The output sink refused a write
#[derive(Error, Debug, Diagnostic)]
pub enum WriteError {
    #[error("sink write failed: {0}")]
    #[diagnostic(
        code(write::io),
        help("The output was closed or failed. Bytes written before the failure are not retracted.")
    )]
    Io(#[from] std::io::Error),
}

/// Unified encode error
#[derive(Error, Debug, Diagnostic)]
pub enum EncodeError {
    #[error("shape error: {0}")]
    #[diagnostic(transparent)]
    Shape(#[from] ShapeError),

    #[error("value error: {0}")]
    #[diagnostic(transparent)]
    Value(#[from] ValueError),

    #[error("cycle detected while encoding {type_name}")]
    #[diagnostic(
        code(encode::cycle),
        help("A pointer refers back to a value that is still being encoded.")
    )]
    Cycle { type_name: &'static str },

    #[error("nesting depth exceeds the limit of {limit}")]
    #[diagnostic(
        code(encode::depth_exceeded),
        help("Raise max_depth in EncodeOptions or flatten the value.")
    )]
    DepthExceeded { limit: usize },

    #[error("write error: {0}")]
    #[diagnostic(transparent)]
    Write(#[from] WriteError),
}

impl EncodeError {
    /// True when the failure is known before any byte is produced
    pub fn is_shape_error(&self) -> bool {
        matches!(self, EncodeError::Shape(_))
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(err: std::io::Error) -> Self {
        EncodeError::Write(WriteError::Io(err))
    }
}

/// Invalid encoder configuration
#[derive(Error, Debug, Diagnostic)]
pub enum OptionsError {
    #[error("invalid options document: {0}")]
    #[diagnostic(
        code(options::parse),
        help("Options are a JSON object with kebab-case keys, e.g. {{\"sort-map-keys\": false}}.")
    )]
    Parse(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {variable}")]
    #[diagnostic(code(options::env), help("Use true/false/1/0 for flags and a positive integer for depth."))]
    Env { variable: &'static str, value: String },
}
