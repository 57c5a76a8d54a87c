/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-core dispatch timeline.
//!
//! The table stores instants per task; a dispatcher needs the transpose: for
//! each offset, which tasks fire.  [`CoreTimeline`] holds only the occupied
//! offsets, sorted, so a tick lookup is a binary search regardless of how long
//! the hyperperiod is.

use std::collections::BTreeMap;

use crate::table::ScheduleTable;
use crate::task::{CoreId, TaskId};

/// One occupied offset within the hyperperiod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub offset: u64,
    /// Tasks released at `offset`, in ascending id order.
    pub tasks: Vec<TaskId>,
}

/// Occupied offsets of one core, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreTimeline {
    core: CoreId,
    hyperperiod: u64,
    slots: Vec<Slot>,
}

impl CoreTimeline {
    /// Build the timeline for `core`.  An unknown core yields an empty
    /// timeline with a zero hyperperiod.
    pub fn for_core(table: &ScheduleTable, core: CoreId) -> Self {
        let hyperperiod = table.core(core).map(|c| c.hyperperiod).unwrap_or(0);

        let mut by_offset: BTreeMap<u64, Vec<TaskId>> = BTreeMap::new();
        for task in table.tasks_on_core(core) {
            for &instant in &task.instants {
                by_offset.entry(instant).or_default().push(task.id);
            }
        }

        let slots = by_offset
            .into_iter()
            .map(|(offset, mut tasks)| {
                tasks.sort_unstable();
                Slot { offset, tasks }
            })
            .collect();

        Self {
            core,
            hyperperiod,
            slots,
        }
    }

    pub fn core(&self) -> CoreId {
        self.core
    }

    pub fn hyperperiod(&self) -> u64 {
        self.hyperperiod
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Tasks released at `offset` (`0..hyperperiod`); empty if none.
    pub fn tasks_at(&self, offset: u64) -> &[TaskId] {
        match self.slots.binary_search_by_key(&offset, |s| s.offset) {
            Ok(i) => &self.slots[i].tasks,
            Err(_) => &[],
        }
    }

    /// Offsets with no release.
    pub fn idle_ticks(&self) -> u64 {
        self.hyperperiod - self.slots.len() as u64
    }

    /// Offsets where more than one task is released.
    pub fn shared_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.tasks.len() > 1)
    }
}
