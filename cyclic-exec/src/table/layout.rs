/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Compile-time layout of a generated schedule table.
//!
//! [`StaticTable`] is field-for-field the flat layout the offline scheduler
//! emits (`NUM_OF_TASKS`, `tasks_names[]`, `tasks_schedules[]`, ...), with
//! `&'static` slices in place of C arrays so a generated table can be a plain
//! `static` item.  It is never dispatched directly: it is converted into a
//! [`ScheduleTableBuilder`](super::ScheduleTableBuilder) and validated.

/// Flat, read-only schedule table as emitted by the offline scheduler.
#[derive(Debug, Clone, Copy)]
pub struct StaticTable {
    pub num_of_tasks: usize,
    pub hyper_period: u64,
    pub mapped_core_count: usize,

    /// Task labels, index-aligned with task ID.
    pub tasks_names: &'static [&'static str],
    /// Number of tasks assigned to each core.
    pub tasks_per_cores: &'static [u32],
    /// Per-core hyperperiod (normally equal to `hyper_period`).
    pub cores_hyperperiods: &'static [u64],
    /// Core assignment per task.
    pub tasks_coreids: &'static [u32],
    /// Period per task, in ticks.
    pub tasks_periods: &'static [u64],
    /// Declared number of scheduled instants per task.
    pub tasks_insts_counts: &'static [u32],
    /// Ascending tick offsets per task.
    pub tasks_schedules: &'static [&'static [u64]],

    /// Input file named in the generator's header comment.
    pub source: Option<&'static str>,
    /// Task set utilization reported by the generator, in percent.
    pub utilization_percent: Option<f64>,
}
