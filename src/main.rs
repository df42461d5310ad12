/*!
 * planjson-report - Benchmark Report
 *
 * Runs every candidate encoder over every fixture, then the serde decoders
 * over the medium payload, and prints ns/op, B/op and allocs/op, one
 * aligned line per fixture and candidate.
 *
 * Usage: planjson-report [iterations] [--json]
 */

use planjson::harness::{
    measure, measure_decode, standard_fixtures, Candidate, HarnessError, MediumDecode,
    SerdeLibrary,
};
use planjson::{init_tracing, EncodeOptions};
use std::alloc::{GlobalAlloc, Layout, System};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info};

const DEFAULT_ITERATIONS: u64 = 100_000;

/// System allocator that counts allocations
struct CountingAlloc;

static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

fn allocations() -> u64 {
    ALLOCATIONS.load(Ordering::Relaxed)
}

fn run(iterations: u64, json: bool) -> Result<(), HarnessError> {
    let fixtures = standard_fixtures()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut results = Vec::new();
    for fixture in &fixtures {
        for candidate in Candidate::ALL {
            let m = measure(fixture.as_ref(), candidate, iterations, allocations)?;
            if !json {
                writeln!(out, "{m}")?;
            }
            results.push(m);
        }
    }

    let decode = MediumDecode::new()?;
    for library in SerdeLibrary::ALL {
        let m = measure_decode(&decode, library, iterations, allocations)?;
        if !json {
            writeln!(out, "{m}")?;
        }
        results.push(m);
    }

    if json {
        let encoded = planjson::encode_to_bytes(&results, &EncodeOptions::default())?;
        out.write_all(&encoded)?;
        writeln!(out)?;
    }

    let stats = planjson::PlanCache::global().stats();
    info!(
        plans = stats.plans,
        hit_rate = stats.hit_rate,
        compilations = stats.compilations,
        "Plan cache"
    );
    Ok(())
}

fn main() {
    init_tracing();

    let mut iterations = DEFAULT_ITERATIONS;
    let mut json = false;
    for arg in std::env::args().skip(1) {
        if arg == "--json" {
            json = true;
        } else if let Ok(n) = arg.parse() {
            iterations = n;
        } else {
            error!(argument = %arg, "Unrecognized argument");
            std::process::exit(2);
        }
    }

    info!(iterations, "Running benchmarks");
    if let Err(err) = run(iterations, json) {
        error!(error = %err, "Benchmark run failed");
        std::process::exit(1);
    }
}
