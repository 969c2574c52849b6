use rand::distr::uniform::SampleUniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random source owned by every generator instance. Never shared between generators.
pub type SimRng = StdRng;

/// Builds a random source from an explicit seed, or from OS entropy when no seed is given.
pub fn rng_from_seed(seed: Option<u64>) -> SimRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Derives an independent child random source from a parent one.
pub fn derive_rng(parent: &mut SimRng) -> SimRng {
    StdRng::seed_from_u64(parent.random::<u64>())
}

/// Draws from the half-open range `[min, max)`. A degenerate range yields `min`.
pub fn draw<T>(rng: &mut SimRng, min: T, max: T) -> T
where
    T: SampleUniform + PartialOrd + Copy,
{
    if min >= max { min } else { rng.random_range(min..max) }
}

/// Draws from the closed range `[min, max]`. A degenerate range yields `min`.
pub fn draw_inclusive<T>(rng: &mut SimRng, min: T, max: T) -> T
where
    T: SampleUniform + PartialOrd + Copy,
{
    if min >= max { min } else { rng.random_range(min..=max) }
}
