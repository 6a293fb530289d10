//! Deterministic random number generation for exploration.
//!
//! All randomness in the engine flows through [`Rng`], a thin wrapper over
//! a seeded [`StdRng`]. The caller owns seeding; every draw mutates the
//! generator in place, so a `(model, seed)` pair replays identically.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng as _, SeedableRng};

/// Character set for generated identifier-ish strings.
const STRING_CHARSET: &[u8] = b"-ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789 _:$";

/// Deterministic PRNG wrapper.
///
/// Owns all generator state; a fixed 64-bit seed reproduces every draw.
pub struct Rng {
    inner: StdRng,
}

impl Rng {
    /// Create a generator from a 64-bit seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[lo, hi]` (inclusive).
    pub fn range_inclusive(&mut self, lo: i64, hi: i64) -> i64 {
        debug_assert!(lo <= hi);
        self.inner.gen_range(lo..=hi)
    }

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.inner.gen_range(0..len)
    }

    /// Fair coin flip.
    pub fn flip(&mut self) -> bool {
        self.inner.gen_bool(0.5)
    }

    /// Random string of `min..=max` chars drawn from the identifier-ish
    /// charset `[-A-Za-z0-9 _:$]`.
    pub fn string(&mut self, min: usize, max: usize) -> String {
        let len = self.range_inclusive(min as i64, max as i64) as usize;
        (0..len)
            .map(|_| STRING_CHARSET[self.index(STRING_CHARSET.len())] as char)
            .collect()
    }

    /// `0..len` in a uniformly shuffled order.
    pub fn shuffled_indices(&mut self, len: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(&mut self.inner);
        indices
    }

    /// Visit `0..len` exactly once each, in a pseudo-random order, without
    /// materializing a permutation: start anywhere and step by a stride
    /// coprime with `len`.
    pub fn stride_order(&mut self, len: usize) -> StrideOrder {
        if len == 0 {
            return StrideOrder {
                len: 0,
                start: 0,
                stride: 1,
                emitted: 0,
            };
        }
        let start = self.index(len);
        let stride = loop {
            let candidate = self.index(len) + 1;
            if gcd(candidate, len) == 1 {
                break candidate;
            }
        };
        StrideOrder {
            len,
            start,
            stride,
            emitted: 0,
        }
    }
}

/// Iterator over `0..len` with a coprime stride. Every index is emitted
/// exactly once.
pub struct StrideOrder {
    len: usize,
    start: usize,
    stride: usize,
    emitted: usize,
}

impl Iterator for StrideOrder {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.emitted >= self.len {
            return None;
        }
        let idx = (self.start + self.emitted * self.stride) % self.len;
        self.emitted += 1;
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.emitted;
        (remaining, Some(remaining))
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
