/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runner configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! dispatcher:
//!   tick_period_us: 1000
//!   overrun_policy: skip      # or "halt"
//!   cycles: 10                # omit to run until Ctrl-C
//!   detect_overruns: true
//! validation:
//!   reject_idle_tasks: true
//!   reject_duplicate_names: true
//!   require_lcm_hyperperiod: true
//!   allow_multi_hyperperiod_cores: false
//!   max_hyperperiod: 4294967295
//! ```
//!
//! Every key is optional; absent keys and absent sections take their defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::dispatcher::OverrunPolicy;
use crate::executive::ExecutiveSettings;
use crate::table::ValidationPolicy;

/// Tick period used when none is configured: 1 ms.
pub const DEFAULT_TICK_PERIOD_US: u64 = 1_000;

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunnerConfigFile {
    #[serde(default)]
    dispatcher: DispatcherSection,
    #[serde(default)]
    validation: ValidationPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DispatcherSection {
    #[serde(default = "default_tick_period_us")]
    tick_period_us: u64,
    #[serde(default)]
    overrun_policy: OverrunPolicy,
    cycles: Option<u64>,
    #[serde(default = "default_detect_overruns")]
    detect_overruns: bool,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            tick_period_us: default_tick_period_us(),
            overrun_policy: OverrunPolicy::default(),
            cycles: None,
            detect_overruns: default_detect_overruns(),
        }
    }
}

fn default_tick_period_us() -> u64 {
    DEFAULT_TICK_PERIOD_US
}

fn default_detect_overruns() -> bool {
    true
}

// ── Public data structures ────────────────────────────────────────────────────

/// Timing settings for the executive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Length of one tick in microseconds.  Never zero.
    pub tick_period_us: u64,
    pub overrun_policy: OverrunPolicy,
    /// Hyperperiods to run; `None` runs until shutdown.
    pub cycles: Option<u64>,
    pub detect_overruns: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherSection::default().into()
    }
}

impl From<DispatcherSection> for DispatcherConfig {
    fn from(s: DispatcherSection) -> Self {
        Self {
            tick_period_us: s.tick_period_us,
            overrun_policy: s.overrun_policy,
            cycles: s.cycles,
            detect_overruns: s.detect_overruns,
        }
    }
}

impl DispatcherConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_period_us)
    }

    pub fn to_settings(&self) -> ExecutiveSettings {
        ExecutiveSettings {
            tick_period: self.tick_period(),
            overrun_policy: self.overrun_policy,
            cycles: self.cycles,
            detect_overruns: self.detect_overruns,
        }
    }
}

/// Everything the runner reads from its configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerConfig {
    pub dispatcher: DispatcherConfig,
    pub validation: ValidationPolicy,
}

impl RunnerConfig {
    /// Parse `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is malformed or
    /// has unknown keys, or `tick_period_us` is zero.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading runner configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        // An empty document deserializes as unit, not as a map.
        let file: RunnerConfigFile = if content.trim().is_empty() {
            warn!("Configuration file is empty, using defaults");
            RunnerConfigFile::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?
        };

        if file.dispatcher.tick_period_us == 0 {
            bail!("{}: dispatcher.tick_period_us must be positive", path.display());
        }

        let config = RunnerConfig {
            dispatcher: file.dispatcher.into(),
            validation: file.validation,
        };

        debug!(
            tick_period_us = config.dispatcher.tick_period_us,
            overrun_policy = ?config.dispatcher.overrun_policy,
            cycles = ?config.dispatcher.cycles,
            detect_overruns = config.dispatcher.detect_overruns,
            "Dispatcher configuration"
        );
        debug!(policy = ?config.validation, "Validation policy");

        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
