/*!
 * Benchmark Runner
 *
 * Drives every candidate encoder over every fixture and reports time, output
 * size and allocation count per operation. Allocation counting is supplied
 * by the caller, since only a binary can install a global allocator.
 *
 * Decoding is measured for the serde libraries alone on the medium payload.
 */

use super::fixtures::{self, MediumPayload};
use crate::core::{EncodeError, EncodeOptions, ShapeError};
use crate::encoder::{encode, Encoder};
use crate::plan::compile;
use crate::shape::{Dynamic, Reflect};
use miette::Diagnostic;
use serde::Serialize;
use std::fmt;
use std::hint::black_box;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Harness failures
#[derive(Error, Debug, Diagnostic)]
pub enum HarnessError {
    #[error("encode failed: {0}")]
    #[diagnostic(transparent)]
    Encode(#[from] EncodeError),

    #[error("serde_json failed: {0}")]
    #[diagnostic(code(harness::serde_json))]
    SerdeJson(#[from] serde_json::Error),

    #[error("simd-json failed: {0}")]
    #[diagnostic(code(harness::simd_json))]
    SimdJson(#[from] simd_json::Error),

    #[error("report output failed: {0}")]
    #[diagnostic(code(harness::io))]
    Io(#[from] std::io::Error),

    #[error("{candidate} cannot encode the {fixture} fixture")]
    #[diagnostic(code(harness::unsupported))]
    Unsupported {
        fixture: &'static str,
        candidate: &'static str,
    },
}

impl From<ShapeError> for HarnessError {
    fn from(err: ShapeError) -> Self {
        HarnessError::Encode(err.into())
    }
}

/// Encoder under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Candidate {
    /// Precompiled `Encoder`, default options
    Compiled,
    /// Precompiled `Encoder` without HTML escaping or UTF-8 coercion
    CompiledFast,
    /// Plan resolved through the global cache on every call
    Direct,
    /// Precompiled `Encoder` emitting maps in iteration order
    Unsorted,
    SerdeJson,
    SimdJson,
}

impl Candidate {
    pub const ALL: [Candidate; 6] = [
        Candidate::Compiled,
        Candidate::CompiledFast,
        Candidate::Direct,
        Candidate::Unsorted,
        Candidate::SerdeJson,
        Candidate::SimdJson,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Candidate::Compiled => "planjson",
            Candidate::CompiledFast => "planjson NoUTF8Coercion NoHTMLEscaping",
            Candidate::Direct => "planjson direct",
            Candidate::Unsorted => "planjson nosort",
            Candidate::SerdeJson => "serde_json",
            Candidate::SimdJson => "simd-json",
        }
    }

    fn options(self) -> EncodeOptions {
        match self {
            Candidate::CompiledFast => EncodeOptions::default()
                .no_html_escaping()
                .no_utf8_coercion(),
            Candidate::Unsorted => EncodeOptions::default().unsorted_maps(),
            _ => EncodeOptions::default(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Serde-based libraries compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerdeLibrary {
    SerdeJson,
    SimdJson,
}

impl SerdeLibrary {
    pub const ALL: [SerdeLibrary; 2] = [SerdeLibrary::SerdeJson, SerdeLibrary::SimdJson];

    pub fn name(self) -> &'static str {
        match self {
            SerdeLibrary::SerdeJson => Candidate::SerdeJson.name(),
            SerdeLibrary::SimdJson => Candidate::SimdJson.name(),
        }
    }
}

/// Serde path for a fixture value
pub type SerdeFn<T> = fn(&T, SerdeLibrary, &mut Vec<u8>) -> Result<(), HarnessError>;

/// A named value every candidate can encode
pub trait Fixture: Send + Sync {
    fn name(&self) -> &'static str;

    /// Encode once into `buf`, replacing its contents
    fn run(&self, candidate: Candidate, buf: &mut Vec<u8>) -> Result<(), HarnessError>;
}

pub struct Payload<T: Reflect> {
    name: &'static str,
    value: T,
    encoder: Encoder<'static>,
    serde: SerdeFn<T>,
}

fn serialize<T: Serialize>(
    value: &T,
    library: SerdeLibrary,
    buf: &mut Vec<u8>,
) -> Result<(), HarnessError> {
    match library {
        SerdeLibrary::SerdeJson => serde_json::to_writer(&mut *buf, value)?,
        SerdeLibrary::SimdJson => buf.extend_from_slice(&simd_json::to_vec(value)?),
    }
    Ok(())
}

impl<T: Reflect + Serialize> Payload<T> {
    pub fn new(name: &'static str, value: T) -> Result<Self, HarnessError> {
        Self::with_serde(name, value, serialize::<T>)
    }
}

impl<T: Reflect> Payload<T> {
    /// Fixture whose value has no `Serialize` impl of its own
    pub fn with_serde(
        name: &'static str,
        value: T,
        serde: SerdeFn<T>,
    ) -> Result<Self, HarnessError> {
        Ok(Self {
            name,
            value,
            encoder: Encoder::new::<T>()?,
            serde,
        })
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T: Reflect> Fixture for Payload<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, candidate: Candidate, buf: &mut Vec<u8>) -> Result<(), HarnessError> {
        buf.clear();
        match candidate {
            Candidate::Compiled | Candidate::CompiledFast | Candidate::Unsorted => {
                self.encoder
                    .encode(&self.value, buf, &candidate.options())?;
            }
            Candidate::Direct => {
                let plan = compile(T::shape())?;
                encode(&plan, &self.value, buf, &candidate.options())?;
            }
            Candidate::SerdeJson => (self.serde)(&self.value, SerdeLibrary::SerdeJson, buf)?,
            Candidate::SimdJson => (self.serde)(&self.value, SerdeLibrary::SimdJson, buf)?,
        }
        Ok(())
    }
}

// Serde has no view of `dyn Dynamic`; the fixture only ever holds a string.
#[allow(clippy::borrowed_box)]
fn serialize_interface(
    value: &Box<dyn Dynamic>,
    library: SerdeLibrary,
    buf: &mut Vec<u8>,
) -> Result<(), HarnessError> {
    match (**value).as_any().downcast_ref::<String>() {
        Some(s) => serialize(s, library, buf),
        None => Err(HarnessError::Unsupported {
            fixture: "interface",
            candidate: library.name(),
        }),
    }
}

/// Fixtures in the order they are reported
pub fn standard_fixtures() -> Result<Vec<Box<dyn Fixture>>, HarnessError> {
    let all: Vec<Box<dyn Fixture>> = vec![
        Box::new(Payload::new("SimplePayload", fixtures::simple())?),
        Box::new(Payload::new("ComplexPayload", fixtures::complex())?),
        Box::new(Payload::with_serde(
            "Interface",
            fixtures::interface(),
            serialize_interface,
        )?),
        Box::new(Payload::new("Map", fixtures::map())?),
        Box::new(Payload::new("MediumPayload", fixtures::medium()?)?),
        Box::new(Payload::new("MediumValue", fixtures::medium_value()?)?),
    ];
    Ok(all)
}

// ============================================================================
// Decoding
// ============================================================================

/// The compact medium document parsed back into `MediumPayload`
pub struct MediumDecode {
    input: Vec<u8>,
}

impl MediumDecode {
    pub const NAME: &'static str = "MediumPayloadDecode";

    /// Input is planjson's own encoding of the medium payload
    pub fn new() -> Result<Self, HarnessError> {
        let input = crate::to_vec(&fixtures::medium()?)?;
        Ok(Self { input })
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// Decode once. simd-json parses in place, so it works on a copy in `scratch`.
    pub fn run(
        &self,
        library: SerdeLibrary,
        scratch: &mut Vec<u8>,
    ) -> Result<MediumPayload, HarnessError> {
        let payload = match library {
            SerdeLibrary::SerdeJson => serde_json::from_slice(&self.input)?,
            SerdeLibrary::SimdJson => {
                scratch.clear();
                scratch.extend_from_slice(&self.input);
                simd_json::serde::from_slice(scratch)?
            }
        };
        Ok(payload)
    }
}

/// One timed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub fixture: &'static str,
    pub candidate: &'static str,
    pub iterations: u64,
    pub ns_per_op: f64,
    pub bytes_per_op: usize,
    pub allocs_per_op: f64,
}

crate::reflect_struct!(Measurement {
    fixture,
    candidate,
    iterations,
    ns_per_op: "ns/op",
    bytes_per_op: "B/op",
    allocs_per_op: "allocs/op",
});

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Benchmark{}/{:<42} {:>10} {:>12.1} ns/op {:>8} B/op {:>8.2} allocs/op",
            self.fixture,
            self.candidate,
            self.iterations,
            self.ns_per_op,
            self.bytes_per_op,
            self.allocs_per_op
        )
    }
}

/// Time `iterations` runs of `candidate` on `fixture`
///
/// `allocations` returns a monotonic allocation count; pass `|| 0` when none
/// is available. One untimed warm-up run compiles plans and sizes the buffer.
pub fn measure(
    fixture: &dyn Fixture,
    candidate: Candidate,
    iterations: u64,
    allocations: fn() -> u64,
) -> Result<Measurement, HarnessError> {
    let mut buf = Vec::with_capacity(4096);
    fixture.run(candidate, &mut buf)?;
    let bytes_per_op = buf.len();

    let (ns_per_op, allocs_per_op) = time(iterations, allocations, || {
        fixture.run(candidate, black_box(&mut buf))
    })?;
    Ok(report(Measurement {
        fixture: fixture.name(),
        candidate: candidate.name(),
        iterations,
        ns_per_op,
        bytes_per_op,
        allocs_per_op,
    }))
}

/// Time `iterations` decodes of the medium payload with `library`
///
/// `B/op` is the input size. The warm-up run also checks the input decodes.
pub fn measure_decode(
    decode: &MediumDecode,
    library: SerdeLibrary,
    iterations: u64,
    allocations: fn() -> u64,
) -> Result<Measurement, HarnessError> {
    let mut scratch = Vec::with_capacity(decode.input().len());
    decode.run(library, &mut scratch)?;

    let (ns_per_op, allocs_per_op) = time(iterations, allocations, || {
        black_box(decode.run(library, &mut scratch)?);
        Ok(())
    })?;
    Ok(report(Measurement {
        fixture: MediumDecode::NAME,
        candidate: library.name(),
        iterations,
        ns_per_op,
        bytes_per_op: decode.input().len(),
        allocs_per_op,
    }))
}

/// Nanoseconds and allocations per call of `op`
fn time(
    iterations: u64,
    allocations: fn() -> u64,
    mut op: impl FnMut() -> Result<(), HarnessError>,
) -> Result<(f64, f64), HarnessError> {
    let allocs_before = allocations();
    let start = Instant::now();
    for _ in 0..iterations {
        op()?;
    }
    let elapsed = start.elapsed();
    let allocs = allocations().saturating_sub(allocs_before);

    let iterations_f = iterations.max(1) as f64;
    Ok((
        elapsed.as_nanos() as f64 / iterations_f,
        allocs as f64 / iterations_f,
    ))
}

fn report(measurement: Measurement) -> Measurement {
    debug!(
        fixture = measurement.fixture,
        candidate = measurement.candidate,
        ns_per_op = measurement.ns_per_op,
        "Measured"
    );
    measurement
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_candidate_runs_every_fixture() {
        for fixture in standard_fixtures().unwrap() {
            for candidate in Candidate::ALL {
                let mut buf = Vec::new();
                fixture.run(candidate, &mut buf).unwrap();
                let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
                assert!(!parsed.is_null(), "{} / {}", fixture.name(), candidate);
            }
        }
    }

    #[test]
    fn test_measure_reports_output_size() {
        let fixture = Payload::new("SimplePayload", fixtures::simple()).unwrap();
        let m = measure(&fixture, Candidate::Compiled, 10, || 0).unwrap();
        assert_eq!(m.bytes_per_op, crate::to_vec(fixture.value()).unwrap().len());
        assert_eq!(m.iterations, 10);
        assert_eq!(m.allocs_per_op, 0.0);
    }

    #[test]
    fn test_decoders_recover_medium_payload() {
        let decode = MediumDecode::new().unwrap();
        let expected = fixtures::medium().unwrap();
        let mut scratch = Vec::new();
        for library in SerdeLibrary::ALL {
            assert_eq!(decode.run(library, &mut scratch).unwrap(), expected);
        }
        // in-place parsing never touches the shared input
        assert_eq!(decode.input(), &crate::to_vec(&expected).unwrap()[..]);
    }

    #[test]
    fn test_measure_decode_reports_input_size() {
        let decode = MediumDecode::new().unwrap();
        for library in SerdeLibrary::ALL {
            let m = measure_decode(&decode, library, 5, || 0).unwrap();
            assert_eq!(m.fixture, "MediumPayloadDecode");
            assert_eq!(m.candidate, library.name());
            assert_eq!(m.bytes_per_op, decode.input().len());
            assert_eq!(m.iterations, 5);
        }
    }

    #[test]
    fn test_io_errors_convert() {
        use std::io;

        let err: HarnessError = io::Error::new(io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(err, HarnessError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(err.to_string(), "report output failed: closed");
    }
}
