/*!
 * Core Module
 * Errors, options, limits and output sinks shared by every layer
 */

pub mod errors;
pub mod limits;
pub mod options;
pub mod sink;

// Re-export for convenience
pub use errors::*;
pub use options::EncodeOptions;
pub use sink::{IoSink, Sink};
