//! Mathematical helpers for qbvm builtins.
//!
//! Plain functions over `f64` that give BASIC's rounding and sign rules,
//! plus the QBasic-compatible random number generator.

// ============================================================================
// Rounding and Sign
// ============================================================================

/// Integer part (INT) - rounds toward negative infinity.
pub fn int(n: f64) -> f64 {
    n.floor()
}

/// FIX - truncates toward zero (unlike INT which floors).
pub fn fix(n: f64) -> f64 {
    n.trunc()
}

/// Sign function (SGN): -1, 0 or 1.
pub fn sgn(n: f64) -> i16 {
    if n < 0.0 {
        -1
    } else if n > 0.0 {
        1
    } else {
        0
    }
}

/// Rounds half to even, as CINT and CLNG do.
pub fn round_even(n: f64) -> f64 {
    n.round_ties_even()
}

/// Wraps an already-rounded value into 16 bits.
pub fn wrap_i16(n: f64) -> i16 {
    (n as i64) as i16
}

/// Wraps an already-rounded value into 32 bits.
pub fn wrap_i32(n: f64) -> i32 {
    (n as i64) as i32
}

// ============================================================================
// Timer
// ============================================================================

/// Seconds elapsed since midnight (TIMER).
pub fn timer() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let secs_today = now.as_secs() % 86_400;
    secs_today as f64 + (now.subsec_nanos() as f64 / 1_000_000_000.0)
}

// ============================================================================
// Random Numbers
// ============================================================================

const RND_MODULUS: u32 = 1 << 24;
const RND_MULTIPLIER: u64 = 16_598_013;
const RND_INCREMENT: u64 = 12_820_163;
const RND_POWER_ON_SEED: u32 = 0x5_0000;

/// QBasic's 24-bit linear congruential generator.
///
/// A fresh generator produces the same sequence as QBasic after power-on,
/// so `RND` output is reproducible across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rnd {
    state: u32,
}

impl Default for Rnd {
    fn default() -> Self {
        Self {
            state: RND_POWER_ON_SEED,
        }
    }
}

impl Rnd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the generator and returns a value in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        let next = (self.state as u64 * RND_MULTIPLIER + RND_INCREMENT) % RND_MODULUS as u64;
        self.state = next as u32;
        self.state as f64 / RND_MODULUS as f64
    }

    /// RANDOMIZE: folds the seed's high words into the middle 16 bits.
    pub fn randomize(&mut self, seed: f64) {
        let bits = seed.to_bits();
        let word = ((bits >> 48) ^ (bits >> 32)) & 0xFFFF;
        self.state = (self.state & 0xFF) | ((word as u32) << 8);
    }
}
