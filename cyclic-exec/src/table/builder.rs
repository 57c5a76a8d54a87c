/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Owned, unvalidated schedule table.
//!
//! [`ScheduleTableBuilder`] is the only way to obtain a
//! [`ScheduleTable`](super::ScheduleTable).  It can be filled from a compiled-in
//! [`StaticTable`], from a YAML file using the generator's field names, or
//! programmatically with [`core`](ScheduleTableBuilder::core) /
//! [`task`](ScheduleTableBuilder::task).
//!
//! The expected YAML structure is:
//! ```yaml
//! NUM_OF_TASKS: 2
//! HYPER_PERIOD: 35
//! MAPPED_CORE_COUNT: 1
//! tasks_names: ["T1", "T2"]
//! tasks_per_cores: [2]
//! cores_hyperperiods: [35]
//! tasks_coreids: [0, 0]
//! tasks_periods: [5, 7]
//! tasks_insts_counts: [7, 5]
//! tasks_schedules:
//!   - [0, 6, 12, 15, 21, 27, 33]
//!   - [2, 8, 17, 23, 29]
//! source: "examples/demo_tasks.csv"   # optional
//! utilization_percent: 97.14          # optional
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use super::error::TableError;
use super::layout::StaticTable;
use super::validate::{validate, ValidationPolicy};
use super::ScheduleTable;

/// Flat schedule table with the same fields as the generated layout.
///
/// Nothing is checked until [`build`](Self::build); the fields are public so
/// callers (and tests) can describe any table the generator could emit,
/// including inconsistent ones.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScheduleTableBuilder {
    #[serde(rename = "NUM_OF_TASKS")]
    pub num_of_tasks: usize,
    #[serde(rename = "HYPER_PERIOD")]
    pub hyper_period: u64,
    #[serde(rename = "MAPPED_CORE_COUNT")]
    pub mapped_core_count: usize,

    #[serde(default)]
    pub tasks_names: Vec<String>,
    #[serde(default)]
    pub tasks_per_cores: Vec<u32>,
    #[serde(default)]
    pub cores_hyperperiods: Vec<u64>,
    #[serde(default)]
    pub tasks_coreids: Vec<u32>,
    #[serde(default)]
    pub tasks_periods: Vec<u64>,
    #[serde(default)]
    pub tasks_insts_counts: Vec<u32>,
    #[serde(default)]
    pub tasks_schedules: Vec<Vec<u64>>,

    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub utilization_percent: Option<f64>,
}

impl ScheduleTableBuilder {
    /// Start an empty table with the given `HYPER_PERIOD`.
    pub fn new(hyper_period: u64) -> Self {
        Self {
            hyper_period,
            ..Default::default()
        }
    }

    /// Append a core with its own hyperperiod.
    ///
    /// `tasks_per_cores` for the new core starts at zero and is incremented by
    /// every subsequent [`task`](Self::task) call that maps onto it.
    pub fn core(mut self, hyperperiod: u64) -> Self {
        self.mapped_core_count += 1;
        self.tasks_per_cores.push(0);
        self.cores_hyperperiods.push(hyperperiod);
        self
    }

    /// Append a task, keeping every parallel array and count in step.
    pub fn task(
        mut self,
        name: impl Into<String>,
        period: u64,
        core_id: u32,
        instants: impl Into<Vec<u64>>,
    ) -> Self {
        let instants = instants.into();
        self.num_of_tasks += 1;
        self.tasks_names.push(name.into());
        self.tasks_coreids.push(core_id);
        self.tasks_periods.push(period);
        self.tasks_insts_counts.push(instants.len() as u32);
        self.tasks_schedules.push(instants);
        if let Some(count) = self.tasks_per_cores.get_mut(core_id as usize) {
            *count += 1;
        }
        self
    }

    /// Parse a table from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse schedule table YAML")
    }

    /// Read and parse a table from a YAML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a structurally
    /// valid table description.  Semantic checks happen in
    /// [`build`](Self::build).
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        info!("Loading schedule table from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open schedule table: {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))
    }

    /// Validate the table against `policy` and freeze it.
    pub fn build(&self, policy: &ValidationPolicy) -> Result<ScheduleTable, TableError> {
        validate(self, policy)
    }
}

impl From<&StaticTable> for ScheduleTableBuilder {
    fn from(table: &StaticTable) -> Self {
        Self {
            num_of_tasks: table.num_of_tasks,
            hyper_period: table.hyper_period,
            mapped_core_count: table.mapped_core_count,
            tasks_names: table.tasks_names.iter().map(|s| s.to_string()).collect(),
            tasks_per_cores: table.tasks_per_cores.to_vec(),
            cores_hyperperiods: table.cores_hyperperiods.to_vec(),
            tasks_coreids: table.tasks_coreids.to_vec(),
            tasks_periods: table.tasks_periods.to_vec(),
            tasks_insts_counts: table.tasks_insts_counts.to_vec(),
            tasks_schedules: table.tasks_schedules.iter().map(|s| s.to_vec()).collect(),
            source: table.source.map(str::to_string),
            utilization_percent: table.utilization_percent,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
