pub mod probe;
pub mod result;
pub mod stream;
pub mod trace;

use std::fmt::Write;

pub use probe::{Prober, Target};
pub use result::TimingResult;
pub use trace::{ClientTrace, PhaseTimings};

/// Flattens an error and its `source()` chain into a single log-friendly line.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}
