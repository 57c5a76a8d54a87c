/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hyperperiod derivation for a task set.
//!
//! The hyperperiod is the Least Common Multiple (LCM) of all task periods: the
//! smallest window after which a static schedule repeats.  Generated tables
//! declare it as `HYPER_PERIOD`; validation re-derives it from the periods and
//! compares.
//!
//! | Failure | Variant |
//! |---------|---------|
//! | no task with a non-zero period | [`HyperperiodError::NoValidPeriods`] |
//! | `u64` overflow while folding LCMs | [`HyperperiodError::Overflow`] |
//! | result above the configured limit | [`HyperperiodError::TooLarge`] |

pub mod math;

use tracing::{debug, warn};

use math::lcm_of_slice;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default upper limit on a hyperperiod, in ticks.
///
/// At a 1 ms tick this is a little under 50 days.
pub const DEFAULT_HYPERPERIOD_LIMIT: u64 = u32::MAX as u64;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during hyperperiod derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperperiodError {
    /// The period slice was empty or every period was zero.
    NoValidPeriods,

    /// LCM calculation overflowed `u64`.
    Overflow { a: u64, b: u64 },

    /// The hyperperiod exceeded the configured limit.
    TooLarge { value: u64, limit: u64 },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::NoValidPeriods => {
                write!(f, "no tasks with a valid (non-zero) period")
            }
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value, limit } => {
                write!(f, "hyperperiod {value} ticks exceeds limit {limit} ticks")
            }
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── HyperperiodInfo ───────────────────────────────────────────────────────────

/// Derived hyperperiod of a task set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperperiodInfo {
    /// LCM of all non-zero periods, in ticks.
    pub hyperperiod: u64,

    /// Distinct non-zero periods (sorted, deduplicated).
    pub unique_periods: Vec<u64>,

    /// Number of periods that contributed (zero periods excluded).
    pub task_count: usize,
}

impl HyperperiodInfo {
    /// Returns `true` if every contributing period divides `hyperperiod`.
    ///
    /// A declared hyperperiod that is a multiple of the LCM passes this check
    /// even though it is not minimal.
    pub fn divides(&self, hyperperiod: u64) -> bool {
        hyperperiod != 0 && hyperperiod % self.hyperperiod == 0
    }
}

/// Derive the hyperperiod of `periods`, rejecting results above `limit`.
///
/// Zero periods are ignored.
pub fn derive_hyperperiod(periods: &[u64], limit: u64) -> Result<HyperperiodInfo, HyperperiodError> {
    let valid: Vec<u64> = periods.iter().copied().filter(|&p| p > 0).collect();

    if valid.is_empty() {
        warn!("No tasks with valid periods");
        return Err(HyperperiodError::NoValidPeriods);
    }

    let unique_periods: Vec<u64> = {
        let mut v = valid.clone();
        v.sort_unstable();
        v.dedup();
        v
    };

    let hyperperiod = lcm_of_slice(&unique_periods)?;

    if hyperperiod > limit {
        warn!(hyperperiod, limit, "Hyperperiod exceeds configured limit");
        return Err(HyperperiodError::TooLarge {
            value: hyperperiod,
            limit,
        });
    }

    debug!(
        hyperperiod,
        task_count = valid.len(),
        unique_count = unique_periods.len(),
        "Derived hyperperiod"
    );

    Ok(HyperperiodInfo {
        hyperperiod,
        unique_periods,
        task_count: valid.len(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
