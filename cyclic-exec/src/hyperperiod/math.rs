/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: GCD and checked LCM.
//!
//! Free functions so table validation can call them without going through
//! [`derive_hyperperiod`](super::derive_hyperperiod).

use super::HyperperiodError;

/// Euclid's algorithm.  `gcd(0, 0) == 0`.
pub fn gcd(a: u64, b: u64) -> u64 {
    let (mut x, mut y) = (a, b);
    while y != 0 {
        (x, y) = (y, x % y);
    }
    x
}

/// LCM of two periods, or `HyperperiodError::Overflow` when it exceeds
/// `u64`.  Zero in either position yields zero.
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    match (a, b) {
        (0, _) | (_, 0) => Ok(0),
        _ => (a / gcd(a, b))
            .checked_mul(b)
            .ok_or(HyperperiodError::Overflow { a, b }),
    }
}

/// LCM of every period in `periods`; zero for an empty slice.
pub fn lcm_of_slice(periods: &[u64]) -> Result<u64, HyperperiodError> {
    let Some((&first, rest)) = periods.split_first() else {
        return Ok(0);
    };
    rest.iter().try_fold(first, |acc, &p| lcm(acc, p))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
