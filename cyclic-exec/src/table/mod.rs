/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Validated, immutable schedule tables.
//!
//! ```text
//! StaticTable ──┐
//! YAML file  ───┼──► ScheduleTableBuilder ──(build + ValidationPolicy)──► ScheduleTable
//! fluent API ───┘        flat, unchecked                                   records, frozen
//! ```
//!
//! A [`ScheduleTable`] has no mutating methods and no public constructor
//! other than [`ScheduleTableBuilder::build`]; share it between cores with
//! `Arc<ScheduleTable>`.

pub mod builder;
pub mod error;
pub mod layout;
pub mod validate;

pub use builder::ScheduleTableBuilder;
pub use error::{InconsistencyReason, TableError};
pub use layout::StaticTable;
pub use validate::ValidationPolicy;

use crate::task::{CoreId, ScheduledTask, TaskId};

/// Generator metadata carried alongside the schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableMetadata {
    /// Task-set description the generator was run on.
    pub source: Option<String>,
    /// Scheduled task set utilization reported by the generator, in percent.
    pub utilization_percent: Option<f64>,
}

/// The tasks mapped onto one core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSlice {
    pub id: CoreId,
    /// Hyperperiod this core's dispatcher wraps at.
    pub hyperperiod: u64,
    /// Tasks mapped to this core, in ascending id order.
    pub tasks: Vec<TaskId>,
}

/// A validated schedule table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleTable {
    pub(crate) hyperperiod: u64,
    pub(crate) tasks: Vec<ScheduledTask>,
    pub(crate) cores: Vec<CoreSlice>,
    pub(crate) metadata: TableMetadata,
}

impl ScheduleTable {
    /// Global `HYPER_PERIOD`, in ticks.
    pub fn hyperperiod(&self) -> u64 {
        self.hyperperiod
    }

    /// All tasks, ordered by id.
    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&ScheduledTask> {
        self.tasks.get(id.index())
    }

    /// First task carrying `name`.
    pub fn task_by_name(&self, name: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn cores(&self) -> &[CoreSlice] {
        &self.cores
    }

    pub fn core(&self, id: CoreId) -> Option<&CoreSlice> {
        self.cores.get(id.index())
    }

    /// Tasks mapped to `core`, in id order.  Empty for an unknown core.
    pub fn tasks_on_core(&self, core: CoreId) -> impl Iterator<Item = &ScheduledTask> + '_ {
        self.core(core)
            .into_iter()
            .flat_map(|slice| slice.tasks.iter())
            .filter_map(move |&id| self.task(id))
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    /// Total scheduled instances per hyperperiod across all tasks.
    pub fn total_instances(&self) -> usize {
        self.tasks.iter().map(|t| t.instance_count()).sum()
    }

    /// `true` when no task has any scheduled instance.
    pub fn is_idle(&self) -> bool {
        self.tasks.iter().all(|t| t.is_idle())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{DEMO_TASKS, EXAMPLE2};

    fn demo() -> ScheduleTable {
        ScheduleTableBuilder::from(&DEMO_TASKS)
            .build(&ValidationPolicy::strict())
            .unwrap()
    }

    #[test]
    fn lookup_by_id_and_name() {
        let table = demo();
        assert_eq!(table.task(TaskId(1)).unwrap().name, "T2");
        assert_eq!(table.task_by_name("T1").unwrap().period, 5);
        assert!(table.task(TaskId(2)).is_none());
        assert!(table.task_by_name("T9").is_none());
    }

    #[test]
    fn tasks_on_core_follows_mapping() {
        let table = demo();
        let names: Vec<&str> = table.tasks_on_core(CoreId(0)).map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["T1", "T2"]);
        assert_eq!(table.tasks_on_core(CoreId(5)).count(), 0);
    }

    #[test]
    fn core_task_counts_sum_to_task_count() {
        let table = demo();
        let sum: usize = table.cores().iter().map(|c| c.tasks.len()).sum();
        assert_eq!(sum, table.tasks().len());
        assert!(table.cores().iter().all(|c| c.hyperperiod == table.hyperperiod()));
    }

    #[test]
    fn metadata_is_carried_through() {
        let table = demo();
        assert_eq!(table.metadata().source.as_deref(), Some("examples/demo_tasks.csv"));
        let util = table.metadata().utilization_percent.unwrap();
        assert!((util - 97.142_857).abs() < 1e-3);
    }

    #[test]
    fn instance_totals() {
        assert_eq!(demo().total_instances(), 12);
        assert!(!demo().is_idle());

        let idle = ScheduleTableBuilder::from(&EXAMPLE2)
            .build(&ValidationPolicy::lenient())
            .unwrap();
        assert_eq!(idle.total_instances(), 0);
        assert!(idle.is_idle());
    }
}
