/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures for the cyclic executive.
//!
//! The generated tables describe a task set as parallel arrays indexed by task
//! ID (names, periods, core ids, instant lists).  Once a table has been
//! validated those arrays are collapsed into one ordered `Vec<ScheduledTask>`:
//!
//! ```text
//! tasks_names[i] ─┐
//! tasks_periods[i] ├──(ScheduleTableBuilder::build)──►  ScheduledTask { id: i, .. }
//! tasks_coreids[i] │
//! tasks_schedules[i]┘
//! ```
//!
//! # Ownership model
//! A `ScheduledTask` is owned by the [`ScheduleTable`] it belongs to and is
//! never mutated after construction.  Dispatchers refer to tasks by
//! [`TaskId`] and borrow the record from the shared table.
//!
//! [`ScheduleTable`]: crate::table::ScheduleTable

use std::fmt;

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Task identifier, equal to the task's index in the generated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u32);

impl TaskId {
    /// Index into the table's task sequence.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a mapped core (`0..MAPPED_CORE_COUNT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoreId(pub u32);

impl CoreId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core{}", self.0)
    }
}

// ── ScheduledTask ─────────────────────────────────────────────────────────────

/// One task of a validated schedule table.
///
/// `instance_count` is not stored: it is always `instants.len()`, so the
/// count/sequence disagreement the flat layout allows cannot survive
/// validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: TaskId,

    /// Human-readable label from `tasks_names`.  Not necessarily unique under
    /// a lenient validation policy.
    pub name: String,

    /// Period in ticks.
    pub period: u64,

    /// Core this task is mapped to.
    pub core: CoreId,

    /// Strictly ascending tick offsets within `[0, hyperperiod)`.
    pub instants: Vec<u64>,
}

impl ScheduledTask {
    /// Number of scheduled instances per hyperperiod.
    pub fn instance_count(&self) -> usize {
        self.instants.len()
    }

    /// `true` when the task has no scheduled instances and will never run.
    pub fn is_idle(&self) -> bool {
        self.instants.is_empty()
    }

    /// Number of releases the task's period implies within `hyperperiod`.
    ///
    /// Returns `0` when `period` is zero.
    pub fn expected_instances(&self, hyperperiod: u64) -> u64 {
        if self.period == 0 {
            0
        } else {
            hyperperiod / self.period
        }
    }

    /// Returns `true` if the task is scheduled at `offset`.
    pub fn fires_at(&self, offset: u64) -> bool {
        self.instants.binary_search(&offset).is_ok()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn t1() -> ScheduledTask {
        ScheduledTask {
            id: TaskId(0),
            name: "T1".into(),
            period: 5,
            core: CoreId(0),
            instants: vec![0, 6, 12, 15, 21, 27, 33],
        }
    }

    #[test]
    fn instance_count_is_instant_len() {
        assert_eq!(t1().instance_count(), 7);
        assert!(!t1().is_idle());
    }

    #[test]
    fn expected_instances_from_period() {
        assert_eq!(t1().expected_instances(35), 7);
    }

    #[test]
    fn expected_instances_zero_period_returns_zero() {
        let task = ScheduledTask {
            period: 0,
            ..t1()
        };
        assert_eq!(task.expected_instances(35), 0);
    }

    #[test]
    fn fires_at_matches_listed_offsets_only() {
        let task = t1();
        for off in 0..35u64 {
            let listed = [0, 6, 12, 15, 21, 27, 33].contains(&off);
            assert_eq!(task.fires_at(off), listed, "offset {off}");
        }
    }

    #[test]
    fn idle_task_has_no_instances() {
        let task = ScheduledTask {
            instants: vec![],
            ..t1()
        };
        assert!(task.is_idle());
        assert_eq!(task.instance_count(), 0);
    }

    #[test]
    fn ids_display_compactly() {
        assert_eq!(TaskId(3).to_string(), "#3");
        assert_eq!(CoreId(1).to_string(), "core1");
    }
}
