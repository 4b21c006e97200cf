use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::shared::RngKind;

/// Upper bound (exclusive) of every value a `RandomSource` produces.
const RANGE: u64 = 1 << 31;

/// A seeded stream of 31-bit pseudo-random values.
///
/// Policy generation draws from a single source in a fixed order, so two
/// generators built from sources with the same seed produce the same policies.
pub trait RandomSource {
    /// Next value, uniformly distributed on `[0, 2^31)`.
    fn next_u31(&mut self) -> u32;
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn next_u31(&mut self) -> u32 {
        (**self).next_u31()
    }
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn next_u31(&mut self) -> u32 {
        (**self).next_u31()
    }
}

/// The POSIX `srand48`/`lrand48` generator: a 48-bit linear congruential
/// sequence whose high 31 bits are returned on every draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lrand48 {
    state: u64,
}

impl Lrand48 {
    const MULTIPLIER: u64 = 0x5_DEEC_E66D;
    const INCREMENT: u64 = 0xB;
    const MASK: u64 = (1 << 48) - 1;

    /// Same as `srand48(seed)`: only the low 32 bits of the seed are used.
    pub fn new(seed: i64) -> Self {
        Lrand48 {
            state: (u64::from(seed as u32) << 16) | 0x330E,
        }
    }
}

impl RandomSource for Lrand48 {
    fn next_u31(&mut self) -> u32 {
        self.state = Self::MULTIPLIER
            .wrapping_mul(self.state)
            .wrapping_add(Self::INCREMENT)
            & Self::MASK;
        (self.state >> 17) as u32
    }
}

/// Adapts any `rand` generator to a `RandomSource` by keeping the top 31 bits
/// of each `u32` draw.
#[derive(Debug, Clone)]
pub struct StdRandomSource<R: RngCore> {
    rng: R,
}

impl<R: RngCore> StdRandomSource<R> {
    pub fn new(rng: R) -> Self {
        StdRandomSource { rng }
    }
}

impl StdRandomSource<StdRng> {
    pub fn seeded(seed: i64) -> Self {
        StdRandomSource::new(StdRng::seed_from_u64(seed as u64))
    }
}

impl<R: RngCore> RandomSource for StdRandomSource<R> {
    fn next_u31(&mut self) -> u32 {
        self.rng.next_u32() >> 1
    }
}

/// Build the source selected by `kind`, seeded once.
pub fn make_source(kind: RngKind, seed: i64) -> Box<dyn RandomSource + Send> {
    match kind {
        RngKind::Lrand48 => Box::new(Lrand48::new(seed)),
        RngKind::StdRng => Box::new(StdRandomSource::seeded(seed)),
    }
}

/// Unbiased draw from `[0, n)`.
///
/// Draws at or above the largest multiple of `n` below `2^31` are rejected
/// and redrawn before reducing modulo `n`. `n` must be in `1..=2^31`.
pub fn rand_below<R: RandomSource + ?Sized>(source: &mut R, n: usize) -> usize {
    debug_assert!(n >= 1 && n as u64 <= RANGE);
    let n = n as u64;
    let limit = RANGE - (RANGE % n);
    loop {
        let rnd = u64::from(source.next_u31());
        if rnd < limit {
            return (rnd % n) as usize;
        }
    }
}

/// Fisher–Yates shuffle, drawing an index in `[0, k)` for every prefix
/// length `k` from `items.len()` down to 2.
pub fn shuffle<T, R: RandomSource + ?Sized>(source: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rand_below(source, i + 1);
        items.swap(i, j);
    }
}
