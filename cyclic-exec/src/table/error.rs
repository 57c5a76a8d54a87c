/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for schedule table validation.
//!
//! Two types model the two failure layers:
//!
//! * [`InconsistencyReason`] — exactly which declared count, length or
//!   ordering disagrees (carries the offending values).
//! * [`TableError`] — top-level failure returned from
//!   [`ScheduleTableBuilder::build()`](super::ScheduleTableBuilder::build).
//!
//! Every table error is fatal: the dispatcher must not be armed against a
//! table that failed validation.

use thiserror::Error;

use crate::hyperperiod::HyperperiodError;

// ── Inconsistency detail ──────────────────────────────────────────────────────

/// Why a table's declared counts and sequences disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InconsistencyReason {
    /// A per-task or per-core array does not have the declared length.
    ArrayLength {
        field: &'static str,
        declared: usize,
        actual: usize,
    },

    /// `tasks_insts_counts[task]` differs from `len(tasks_schedules[task])`.
    InstanceCount {
        task: String,
        declared: u32,
        actual: usize,
    },

    /// A scheduled instant lies outside `[0, hyperperiod)`.
    InstantOutOfRange {
        task: String,
        instant: u64,
        hyperperiod: u64,
    },

    /// Scheduled instants are not strictly ascending (includes duplicates).
    InstantsNotAscending {
        task: String,
        previous: u64,
        instant: u64,
    },

    /// The task's period is zero.
    ZeroPeriod { task: String },

    /// `sum(tasks_per_cores)` differs from `NUM_OF_TASKS`.
    TasksPerCoresSum { sum: u64, num_of_tasks: usize },

    /// `tasks_per_cores[core]` differs from the number of tasks whose
    /// `tasks_coreids` entry names that core.
    CoreTaskCount {
        core: u32,
        declared: u32,
        mapped: usize,
    },

    /// `cores_hyperperiods[core]` differs from `HYPER_PERIOD` while
    /// multi-hyperperiod cores are not enabled.
    CoreHyperperiod {
        core: u32,
        core_hyperperiod: u64,
        hyperperiod: u64,
    },

    /// A task's period does not divide its core's hyperperiod.
    PeriodNotDividing {
        task: String,
        period: u64,
        core_hyperperiod: u64,
    },
}

impl std::fmt::Display for InconsistencyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InconsistencyReason::ArrayLength {
                field,
                declared,
                actual,
            } => write!(
                f,
                "{field} has {actual} entries but {declared} are declared"
            ),

            InconsistencyReason::InstanceCount {
                task,
                declared,
                actual,
            } => write!(
                f,
                "task '{task}' declares {declared} instances but lists {actual}"
            ),

            InconsistencyReason::InstantOutOfRange {
                task,
                instant,
                hyperperiod,
            } => write!(
                f,
                "task '{task}' instant {instant} lies outside [0, {hyperperiod})"
            ),

            InconsistencyReason::InstantsNotAscending {
                task,
                previous,
                instant,
            } => write!(
                f,
                "task '{task}' instant {instant} does not follow {previous} in strictly ascending order"
            ),

            InconsistencyReason::ZeroPeriod { task } => {
                write!(f, "task '{task}' has a zero period")
            }

            InconsistencyReason::TasksPerCoresSum { sum, num_of_tasks } => write!(
                f,
                "tasks_per_cores sums to {sum} but NUM_OF_TASKS is {num_of_tasks}"
            ),

            InconsistencyReason::CoreTaskCount {
                core,
                declared,
                mapped,
            } => write!(
                f,
                "core {core} declares {declared} tasks but {mapped} are mapped to it"
            ),

            InconsistencyReason::CoreHyperperiod {
                core,
                core_hyperperiod,
                hyperperiod,
            } => write!(
                f,
                "core {core} hyperperiod {core_hyperperiod} differs from HYPER_PERIOD {hyperperiod}"
            ),

            InconsistencyReason::PeriodNotDividing {
                task,
                period,
                core_hyperperiod,
            } => write!(
                f,
                "task '{task}' period {period} does not divide core hyperperiod {core_hyperperiod}"
            ),
        }
    }
}

// ── Top-level table errors ────────────────────────────────────────────────────

/// Error returned when a schedule table fails validation.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    /// `NUM_OF_TASKS` or `MAPPED_CORE_COUNT` is zero.
    #[error("schedule table is empty: {0}")]
    Empty(&'static str),

    /// Declared counts disagree with actual sequence lengths or ordering.
    #[error("schedule inconsistency: {0}")]
    ScheduleInconsistency(InconsistencyReason),

    /// A task references a core index ≥ `MAPPED_CORE_COUNT`.
    #[error("task '{task}' is mapped to core {core_id} but only {mapped_core_count} core(s) are mapped")]
    UnmappedCore {
        task: String,
        core_id: u32,
        mapped_core_count: usize,
    },

    /// Two tasks share a label (e.g. a generator emitting `T3` twice).
    #[error("task name '{name}' is used by tasks {first} and {second}")]
    DuplicateTaskName {
        name: String,
        first: u32,
        second: u32,
    },

    /// A task has zero scheduled instances under a policy that rejects idle
    /// tasks.
    #[error("task '{task}' has no scheduled instances (period {period})")]
    IdleTask { task: String, period: u64 },

    /// `HYPER_PERIOD` does not equal the LCM of the task periods.
    #[error("HYPER_PERIOD {declared} does not match LCM of task periods {derived}")]
    HyperperiodMismatch { declared: u64, derived: u64 },

    /// LCM derivation itself failed.
    #[error("hyperperiod derivation failed: {0}")]
    Hyperperiod(#[from] HyperperiodError),
}

impl From<InconsistencyReason> for TableError {
    fn from(reason: InconsistencyReason) -> Self {
        TableError::ScheduleInconsistency(reason)
    }
}
