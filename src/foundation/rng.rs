use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Where a node's random stream gets its seed from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SeedSource {
    /// Reproducible: the same seed always yields the same stream.
    Fixed(u64),
    /// Wall-clock microseconds modulo 2^32, different on every call.
    #[default]
    Clock,
}

impl SeedSource {
    pub fn resolve(self) -> u64 {
        match self {
            Self::Fixed(seed) => seed,
            Self::Clock => clock_seed(),
        }
    }

    pub fn rng(self) -> StdRng {
        StdRng::seed_from_u64(self.resolve())
    }
}

fn clock_seed() -> u64 {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or(0);
    (micros % (1u128 << 32)) as u64
}
