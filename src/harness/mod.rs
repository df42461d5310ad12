/*!
 * Benchmark Harness
 * Fixtures and the comparison driver for the report binary and benches
 */

pub mod fixtures;
pub mod runner;

pub use runner::{
    measure, measure_decode, standard_fixtures, Candidate, Fixture, HarnessError, MediumDecode,
    Measurement, Payload, SerdeLibrary,
};
