use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Phase timings of a single attempt against `url`.
///
/// A phase that did not happen (no TLS on plain HTTP, IP literal hosts
/// skipping DNS, a failed attempt) is `Duration::ZERO`. `total` is measured
/// on its own and is not the sum of the phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingResult {
    pub url: String,
    #[serde(with = "nanos")]
    pub dns: Duration,
    #[serde(with = "nanos")]
    pub tls: Duration,
    #[serde(with = "nanos")]
    pub connect: Duration,
    #[serde(with = "nanos")]
    pub ttfb: Duration,
    #[serde(with = "nanos")]
    pub total: Duration,
}

impl TimingResult {
    /// The record emitted for failed attempts. Blank jobs get `default()`.
    pub fn zero(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Durations travel as integer nanoseconds.
mod nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}
