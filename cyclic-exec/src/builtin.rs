/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Generated schedule tables compiled into the binary.
//!
//! Both were emitted by the offline SMT scheduler and are kept verbatim:
//! [`EXAMPLE2`] still carries the generator's duplicated `T3` entry and zero
//! scheduled instances, so it only validates under
//! [`ValidationPolicy::lenient`](crate::table::ValidationPolicy::lenient).

use crate::table::StaticTable;

const T1_SCHED_INSTS: [u64; 7] = [0, 6, 12, 15, 21, 27, 33];
const T2_SCHED_INSTS: [u64; 5] = [2, 8, 17, 23, 29];

/// Two tasks (periods 5 and 7) on one core, hyperperiod 35.
pub static DEMO_TASKS: StaticTable = StaticTable {
    num_of_tasks: 2,
    hyper_period: 35,
    mapped_core_count: 1,
    tasks_names: &["T1", "T2"],
    tasks_per_cores: &[2],
    cores_hyperperiods: &[35],
    tasks_coreids: &[0, 0],
    tasks_periods: &[5, 7],
    tasks_insts_counts: &[7, 5],
    tasks_schedules: &[&T1_SCHED_INSTS, &T2_SCHED_INSTS],
    source: Some("examples/demo_tasks.csv"),
    utilization_percent: Some(97.142_857_142_857_14),
};

/// Four tasks (periods 6, 9, 12, 18) on one core, hyperperiod 36, none of
/// which has a scheduled instance.
pub static EXAMPLE2: StaticTable = StaticTable {
    num_of_tasks: 4,
    hyper_period: 36,
    mapped_core_count: 1,
    tasks_names: &["T1", "T2", "T3", "T3"],
    tasks_per_cores: &[4],
    cores_hyperperiods: &[36],
    tasks_coreids: &[0, 0, 0, 0],
    tasks_periods: &[6, 9, 12, 18],
    tasks_insts_counts: &[0, 0, 0, 0],
    tasks_schedules: &[&[], &[], &[], &[]],
    source: Some("examples/example2.csv"),
    utilization_percent: Some(94.444_444_444_444_44),
};

/// Look up a built-in table by name (`demo` or `example2`).
pub fn by_name(name: &str) -> Option<&'static StaticTable> {
    match name {
        "demo" | "demo_tasks" => Some(&DEMO_TASKS),
        "example2" => Some(&EXAMPLE2),
        _ => None,
    }
}
