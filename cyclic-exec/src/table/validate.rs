/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedule table validation.
//!
//! All checks run once, before a table is frozen, and the first failure is
//! returned.  Order:
//!
//! 1. header counts are non-zero
//! 2. every parallel array has its declared length
//! 3. per task: core mapped, period non-zero, declared count == listed count
//! 4. `tasks_per_cores` agrees with `tasks_coreids`
//! 5. `HYPER_PERIOD` against the LCM of the periods
//! 6. per core: hyperperiod, periods dividing it
//! 7. per task: instants in range and strictly ascending
//! 8. policy checks: duplicate names, idle tasks
//!
//! The utilization contract (`instances == hyperperiod / period`) is only
//! logged; generated tables are allowed to place fewer or more jobs than
//! their periods imply.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::builder::ScheduleTableBuilder;
use super::error::{InconsistencyReason, TableError};
use super::{CoreSlice, ScheduleTable, TableMetadata};
use crate::hyperperiod::{derive_hyperperiod, DEFAULT_HYPERPERIOD_LIMIT};
use crate::task::{CoreId, ScheduledTask, TaskId};

// ── ValidationPolicy ──────────────────────────────────────────────────────────

/// Which table irregularities are rejected.
///
/// [`ValidationPolicy::default()`] is [`strict`](Self::strict).  Structural
/// inconsistencies (`ScheduleInconsistency`, `UnmappedCore`) are always fatal
/// regardless of policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Reject tasks with zero scheduled instances.
    pub reject_idle_tasks: bool,

    /// Reject tables where two tasks share a name.
    pub reject_duplicate_names: bool,

    /// Require `HYPER_PERIOD` to equal the LCM of the task periods.  When
    /// `false`, any common multiple is accepted with a warning.
    pub require_lcm_hyperperiod: bool,

    /// Allow `cores_hyperperiods[c]` to differ from `HYPER_PERIOD`.
    pub allow_multi_hyperperiod_cores: bool,

    /// Upper bound for any hyperperiod, in ticks.
    pub max_hyperperiod: u64,
}

impl ValidationPolicy {
    pub fn strict() -> Self {
        Self {
            reject_idle_tasks: true,
            reject_duplicate_names: true,
            require_lcm_hyperperiod: true,
            allow_multi_hyperperiod_cores: false,
            max_hyperperiod: DEFAULT_HYPERPERIOD_LIMIT,
        }
    }

    /// Accept idle tasks, duplicate names and non-minimal hyperperiods,
    /// logging each occurrence.
    pub fn lenient() -> Self {
        Self {
            reject_idle_tasks: false,
            reject_duplicate_names: false,
            require_lcm_hyperperiod: false,
            ..Self::strict()
        }
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Validate `raw` against `policy` and collapse it into a [`ScheduleTable`].
pub(crate) fn validate(
    raw: &ScheduleTableBuilder,
    policy: &ValidationPolicy,
) -> Result<ScheduleTable, TableError> {
    let n = raw.num_of_tasks;
    let cores = raw.mapped_core_count;

    // ── 1. Header ─────────────────────────────────────────────────────────────
    if n == 0 {
        return Err(TableError::Empty("NUM_OF_TASKS is zero"));
    }
    if cores == 0 {
        return Err(TableError::Empty("MAPPED_CORE_COUNT is zero"));
    }

    // ── 2. Array shapes ───────────────────────────────────────────────────────
    check_len("tasks_names", n, raw.tasks_names.len())?;
    check_len("tasks_coreids", n, raw.tasks_coreids.len())?;
    check_len("tasks_periods", n, raw.tasks_periods.len())?;
    check_len("tasks_insts_counts", n, raw.tasks_insts_counts.len())?;
    check_len("tasks_schedules", n, raw.tasks_schedules.len())?;
    check_len("tasks_per_cores", cores, raw.tasks_per_cores.len())?;
    check_len("cores_hyperperiods", cores, raw.cores_hyperperiods.len())?;

    // ── 3. Per-task header fields ─────────────────────────────────────────────
    for i in 0..n {
        let name = &raw.tasks_names[i];
        let core_id = raw.tasks_coreids[i];

        if core_id as usize >= cores {
            return Err(TableError::UnmappedCore {
                task: name.clone(),
                core_id,
                mapped_core_count: cores,
            });
        }
        if raw.tasks_periods[i] == 0 {
            return Err(InconsistencyReason::ZeroPeriod { task: name.clone() }.into());
        }

        let declared = raw.tasks_insts_counts[i];
        let actual = raw.tasks_schedules[i].len();
        if declared as usize != actual {
            return Err(InconsistencyReason::InstanceCount {
                task: name.clone(),
                declared,
                actual,
            }
            .into());
        }
    }

    // ── 4. Core task counts ───────────────────────────────────────────────────
    let sum: u64 = raw.tasks_per_cores.iter().map(|&c| c as u64).sum();
    if sum != n as u64 {
        return Err(InconsistencyReason::TasksPerCoresSum {
            sum,
            num_of_tasks: n,
        }
        .into());
    }
    for (core, &declared) in raw.tasks_per_cores.iter().enumerate() {
        let mapped = raw
            .tasks_coreids
            .iter()
            .filter(|&&c| c as usize == core)
            .count();
        if declared as usize != mapped {
            return Err(InconsistencyReason::CoreTaskCount {
                core: core as u32,
                declared,
                mapped,
            }
            .into());
        }
    }

    // ── 5. Global hyperperiod ─────────────────────────────────────────────────
    let info = derive_hyperperiod(&raw.tasks_periods, policy.max_hyperperiod)?;
    let declared_hp = raw.hyper_period;

    if declared_hp != info.hyperperiod {
        if policy.require_lcm_hyperperiod || !info.divides(declared_hp) {
            return Err(TableError::HyperperiodMismatch {
                declared: declared_hp,
                derived: info.hyperperiod,
            });
        }
        warn!(
            declared = declared_hp,
            derived = info.hyperperiod,
            "HYPER_PERIOD is a multiple of the period LCM but not the LCM itself"
        );
    }
    if declared_hp > policy.max_hyperperiod {
        return Err(crate::hyperperiod::HyperperiodError::TooLarge {
            value: declared_hp,
            limit: policy.max_hyperperiod,
        }
        .into());
    }

    // ── 6. Per-core hyperperiods ──────────────────────────────────────────────
    for (core, &core_hp) in raw.cores_hyperperiods.iter().enumerate() {
        if core_hp == declared_hp {
            continue;
        }
        if !policy.allow_multi_hyperperiod_cores || core_hp == 0 || core_hp > policy.max_hyperperiod
        {
            return Err(InconsistencyReason::CoreHyperperiod {
                core: core as u32,
                core_hyperperiod: core_hp,
                hyperperiod: declared_hp,
            }
            .into());
        }
        debug!(
            core,
            core_hyperperiod = core_hp,
            hyperperiod = declared_hp,
            "Core runs its own hyperperiod"
        );
    }
    for i in 0..n {
        let core_hp = raw.cores_hyperperiods[raw.tasks_coreids[i] as usize];
        let period = raw.tasks_periods[i];
        if core_hp % period != 0 {
            return Err(InconsistencyReason::PeriodNotDividing {
                task: raw.tasks_names[i].clone(),
                period,
                core_hyperperiod: core_hp,
            }
            .into());
        }
    }

    // ── 7. Instants ───────────────────────────────────────────────────────────
    for i in 0..n {
        let name = &raw.tasks_names[i];
        let core_hp = raw.cores_hyperperiods[raw.tasks_coreids[i] as usize];
        check_instants(name, &raw.tasks_schedules[i], core_hp)?;
    }

    // ── 8. Policy checks ──────────────────────────────────────────────────────
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (i, name) in raw.tasks_names.iter().enumerate() {
        if let Some(&first) = seen.get(name.as_str()) {
            if policy.reject_duplicate_names {
                return Err(TableError::DuplicateTaskName {
                    name: name.clone(),
                    first: first as u32,
                    second: i as u32,
                });
            }
            warn!(
                name = %name,
                first,
                second = i,
                "Duplicate task name accepted by lenient policy"
            );
        } else {
            seen.insert(name.as_str(), i);
        }
    }

    for i in 0..n {
        if raw.tasks_schedules[i].is_empty() {
            if policy.reject_idle_tasks {
                return Err(TableError::IdleTask {
                    task: raw.tasks_names[i].clone(),
                    period: raw.tasks_periods[i],
                });
            }
            warn!(
                task = %raw.tasks_names[i],
                period = raw.tasks_periods[i],
                "Task has no scheduled instances and will never run"
            );
        }
    }

    // ── Freeze ────────────────────────────────────────────────────────────────
    let tasks: Vec<ScheduledTask> = (0..n)
        .map(|i| ScheduledTask {
            id: TaskId(i as u32),
            name: raw.tasks_names[i].clone(),
            period: raw.tasks_periods[i],
            core: CoreId(raw.tasks_coreids[i]),
            instants: raw.tasks_schedules[i].clone(),
        })
        .collect();

    for task in &tasks {
        let core_hp = raw.cores_hyperperiods[task.core.index()];
        let expected = task.expected_instances(core_hp);
        if !task.is_idle() && task.instance_count() as u64 != expected {
            warn!(
                task = %task.name,
                scheduled = task.instance_count(),
                expected,
                "Scheduled instances deviate from hyperperiod / period"
            );
        }
    }

    let core_slices: Vec<CoreSlice> = (0..cores)
        .map(|c| CoreSlice {
            id: CoreId(c as u32),
            hyperperiod: raw.cores_hyperperiods[c],
            tasks: tasks
                .iter()
                .filter(|t| t.core.index() == c)
                .map(|t| t.id)
                .collect(),
        })
        .collect();

    info!(
        tasks = n,
        cores,
        hyperperiod = declared_hp,
        source = raw.source.as_deref().unwrap_or("<unknown>"),
        "Schedule table validated"
    );

    Ok(ScheduleTable {
        hyperperiod: declared_hp,
        tasks,
        cores: core_slices,
        metadata: TableMetadata {
            source: raw.source.clone(),
            utilization_percent: raw.utilization_percent,
        },
    })
}

fn check_len(field: &'static str, declared: usize, actual: usize) -> Result<(), TableError> {
    if declared == actual {
        Ok(())
    } else {
        Err(InconsistencyReason::ArrayLength {
            field,
            declared,
            actual,
        }
        .into())
    }
}

fn check_instants(task: &str, instants: &[u64], hyperperiod: u64) -> Result<(), TableError> {
    let mut previous: Option<u64> = None;
    for &instant in instants {
        if instant >= hyperperiod {
            return Err(InconsistencyReason::InstantOutOfRange {
                task: task.to_string(),
                instant,
                hyperperiod,
            }
            .into());
        }
        if let Some(prev) = previous {
            if instant <= prev {
                return Err(InconsistencyReason::InstantsNotAscending {
                    task: task.to_string(),
                    previous: prev,
                    instant,
                }
                .into());
            }
        }
        previous = Some(instant);
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{DEMO_TASKS, EXAMPLE2};
    use crate::hyperperiod::HyperperiodError;

    fn demo() -> ScheduleTableBuilder {
        ScheduleTableBuilder::from(&DEMO_TASKS)
    }

    fn inconsistency(err: TableError) -> InconsistencyReason {
        match err {
            TableError::ScheduleInconsistency(reason) => reason,
            other => panic!("expected ScheduleInconsistency, got {other}"),
        }
    }

    // ── Accepted tables ───────────────────────────────────────────────────────

    #[test]
    fn demo_table_passes_strict_validation() {
        let table = demo().build(&ValidationPolicy::strict()).unwrap();
        assert_eq!(table.hyperperiod(), 35);
        assert_eq!(table.tasks().len(), 2);
        assert_eq!(table.cores().len(), 1);
        assert_eq!(table.cores()[0].tasks, vec![TaskId(0), TaskId(1)]);
    }

    #[test]
    fn example2_passes_lenient_validation() {
        let table = ScheduleTableBuilder::from(&EXAMPLE2)
            .build(&ValidationPolicy::lenient())
            .unwrap();
        assert_eq!(table.hyperperiod(), 36);
        assert_eq!(table.tasks().len(), 4);
        assert!(table.tasks().iter().all(|t| t.is_idle()));
    }

    #[test]
    fn every_validated_task_has_matching_count_and_ascending_instants() {
        let table = demo().build(&ValidationPolicy::strict()).unwrap();
        for (task, &declared) in table.tasks().iter().zip(DEMO_TASKS.tasks_insts_counts) {
            assert_eq!(task.instance_count(), declared as usize);
            assert!(task.instants.windows(2).all(|w| w[0] < w[1]));
            assert!(task.instants.iter().all(|&i| i < table.hyperperiod()));
        }
    }

    // ── Policy rejections ─────────────────────────────────────────────────────

    #[test]
    fn example2_duplicate_name_rejected_by_strict_policy() {
        let err = ScheduleTableBuilder::from(&EXAMPLE2)
            .build(&ValidationPolicy::strict())
            .unwrap_err();
        assert_eq!(
            err,
            TableError::DuplicateTaskName {
                name: "T3".into(),
                first: 2,
                second: 3,
            }
        );
    }

    #[test]
    fn idle_task_rejected_by_strict_policy() {
        let raw = ScheduleTableBuilder::new(10)
            .core(10)
            .task("busy", 5, 0, vec![0, 5])
            .task("idle", 10, 0, Vec::<u64>::new());
        let err = raw.build(&ValidationPolicy::strict()).unwrap_err();
        assert!(matches!(err, TableError::IdleTask { ref task, period: 10 } if task == "idle"));

        let table = raw.build(&ValidationPolicy::lenient()).unwrap();
        assert!(table.task(TaskId(1)).unwrap().is_idle());
    }

    #[test]
    fn non_minimal_hyperperiod_depends_on_policy() {
        let raw = ScheduleTableBuilder::new(70)
            .core(70)
            .task("T1", 5, 0, vec![0, 35])
            .task("T2", 7, 0, vec![2]);

        let err = raw.build(&ValidationPolicy::strict()).unwrap_err();
        assert_eq!(
            err,
            TableError::HyperperiodMismatch {
                declared: 70,
                derived: 35
            }
        );
        assert_eq!(raw.build(&ValidationPolicy::lenient()).unwrap().hyperperiod(), 70);
    }

    #[test]
    fn hyperperiod_not_multiple_of_lcm_rejected_even_when_lenient() {
        let raw = ScheduleTableBuilder::new(36)
            .core(36)
            .task("T1", 5, 0, vec![0])
            .task("T2", 7, 0, vec![2]);
        let err = raw.build(&ValidationPolicy::lenient()).unwrap_err();
        assert!(matches!(err, TableError::HyperperiodMismatch { declared: 36, derived: 35 }));
    }

    #[test]
    fn hyperperiod_above_limit_rejected() {
        let policy = ValidationPolicy {
            max_hyperperiod: 20,
            ..ValidationPolicy::strict()
        };
        let err = demo().build(&policy).unwrap_err();
        assert_eq!(
            err,
            TableError::Hyperperiod(HyperperiodError::TooLarge {
                value: 35,
                limit: 20
            })
        );
    }

    // ── Structural inconsistencies ────────────────────────────────────────────

    #[test]
    fn declared_instance_count_mismatch_is_inconsistency() {
        let mut raw = demo();
        raw.tasks_insts_counts[0] = 6;
        assert_eq!(
            inconsistency(raw.build(&ValidationPolicy::lenient()).unwrap_err()),
            InconsistencyReason::InstanceCount {
                task: "T1".into(),
                declared: 6,
                actual: 7
            }
        );
    }

    #[test]
    fn short_parallel_array_is_inconsistency() {
        let mut raw = demo();
        raw.tasks_periods.pop();
        assert_eq!(
            inconsistency(raw.build(&ValidationPolicy::strict()).unwrap_err()),
            InconsistencyReason::ArrayLength {
                field: "tasks_periods",
                declared: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn instant_at_hyperperiod_is_out_of_range() {
        let mut raw = demo();
        raw.tasks_schedules[1] = vec![2, 8, 17, 23, 35];
        assert_eq!(
            inconsistency(raw.build(&ValidationPolicy::strict()).unwrap_err()),
            InconsistencyReason::InstantOutOfRange {
                task: "T2".into(),
                instant: 35,
                hyperperiod: 35
            }
        );
    }

    #[test]
    fn duplicate_instant_is_not_ascending() {
        let mut raw = demo();
        raw.tasks_schedules[0] = vec![0, 6, 6, 15, 21, 27, 33];
        assert!(matches!(
            inconsistency(raw.build(&ValidationPolicy::strict()).unwrap_err()),
            InconsistencyReason::InstantsNotAscending {
                previous: 6,
                instant: 6,
                ..
            }
        ));
    }

    #[test]
    fn descending_instants_rejected() {
        let mut raw = demo();
        raw.tasks_schedules[1] = vec![8, 2, 17, 23, 29];
        assert!(matches!(
            inconsistency(raw.build(&ValidationPolicy::strict()).unwrap_err()),
            InconsistencyReason::InstantsNotAscending { .. }
        ));
    }

    #[test]
    fn tasks_per_cores_must_sum_to_task_count() {
        let mut raw = demo();
        raw.tasks_per_cores[0] = 3;
        assert_eq!(
            inconsistency(raw.build(&ValidationPolicy::strict()).unwrap_err()),
            InconsistencyReason::TasksPerCoresSum {
                sum: 3,
                num_of_tasks: 2
            }
        );
    }

    #[test]
    fn tasks_per_cores_must_match_mapping() {
        let raw = ScheduleTableBuilder {
            tasks_per_cores: vec![2, 0],
            tasks_coreids: vec![0, 1],
            cores_hyperperiods: vec![35, 35],
            mapped_core_count: 2,
            ..demo()
        };
        assert_eq!(
            inconsistency(raw.build(&ValidationPolicy::strict()).unwrap_err()),
            InconsistencyReason::CoreTaskCount {
                core: 0,
                declared: 2,
                mapped: 1
            }
        );
    }

    #[test]
    fn task_on_unmapped_core_is_rejected() {
        let mut raw = demo();
        raw.tasks_coreids[1] = 1;
        assert_eq!(
            raw.build(&ValidationPolicy::lenient()).unwrap_err(),
            TableError::UnmappedCore {
                task: "T2".into(),
                core_id: 1,
                mapped_core_count: 1
            }
        );
    }

    #[test]
    fn zero_period_is_inconsistency() {
        let mut raw = demo();
        raw.tasks_periods[0] = 0;
        assert_eq!(
            inconsistency(raw.build(&ValidationPolicy::strict()).unwrap_err()),
            InconsistencyReason::ZeroPeriod { task: "T1".into() }
        );
    }

    #[test]
    fn empty_table_is_rejected() {
        let raw = ScheduleTableBuilder::new(10).core(10);
        assert_eq!(
            raw.build(&ValidationPolicy::strict()).unwrap_err(),
            TableError::Empty("NUM_OF_TASKS is zero")
        );
    }

    // ── Core hyperperiods ─────────────────────────────────────────────────────

    fn two_core_table(core1_hp: u64) -> ScheduleTableBuilder {
        ScheduleTableBuilder::new(20)
            .core(20)
            .core(core1_hp)
            .task("fast", 4, 0, vec![0, 4, 8, 12, 16])
            .task("slow", 10, 1, vec![1])
            .task("slower", 20, 1, vec![5])
    }

    #[test]
    fn core_hyperperiod_must_equal_global_by_default() {
        let err = two_core_table(10).build(&ValidationPolicy::strict()).unwrap_err();
        assert_eq!(
            inconsistency(err),
            InconsistencyReason::CoreHyperperiod {
                core: 1,
                core_hyperperiod: 10,
                hyperperiod: 20
            }
        );
    }

    #[test]
    fn multi_hyperperiod_cores_check_period_divisibility() {
        let policy = ValidationPolicy {
            allow_multi_hyperperiod_cores: true,
            ..ValidationPolicy::strict()
        };
        let err = two_core_table(10).build(&policy).unwrap_err();
        assert_eq!(
            inconsistency(err),
            InconsistencyReason::PeriodNotDividing {
                task: "slower".into(),
                period: 20,
                core_hyperperiod: 10
            }
        );
    }

    #[test]
    fn multi_hyperperiod_cores_accepted_when_enabled() {
        let policy = ValidationPolicy {
            allow_multi_hyperperiod_cores: true,
            ..ValidationPolicy::strict()
        };
        let raw = ScheduleTableBuilder::new(20)
            .core(20)
            .core(10)
            .task("fast", 4, 0, vec![0, 4, 8, 12, 16])
            .task("slow", 10, 1, vec![1]);
        let table = raw.build(&policy).unwrap();
        assert_eq!(table.core(CoreId(1)).unwrap().hyperperiod, 10);
    }

    #[test]
    fn same_input_validates_identically_twice() {
        let a = demo().build(&ValidationPolicy::strict()).unwrap();
        let b = demo().build(&ValidationPolicy::strict()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: ValidationPolicy = serde_yaml::from_str("reject_idle_tasks: false\n").unwrap();
        assert!(!policy.reject_idle_tasks);
        assert!(policy.reject_duplicate_names);
        assert_eq!(policy.max_hyperperiod, DEFAULT_HYPERPERIOD_LIMIT);
    }
}
