/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-core cyclic dispatcher.
//!
//! A [`CoreDispatcher`] owns the timeline of one core and releases the jobs
//! bound to that core's tasks at their scheduled offsets, wrapping every
//! hyperperiod.  It is synchronous and does not wait for time to pass: the
//! caller supplies ticks, either from a timer (see
//! [`Executive`](crate::executive::Executive)) or back-to-back for simulation.
//!
//! # State machine
//!
//! ```text
//!  Idle ──arm()──► Armed ──dispatch()──► Running ──dispatch()──► Running …
//!                                           │
//!                                           └─ overrun + OverrunPolicy::Halt ──► Faulted
//! ```
//!
//! # Guarantees
//! * ticks are dispatched in strictly increasing order;
//! * a task's job runs at most once per tick;
//! * idle tasks (zero instances) never run and need no job.

pub mod clock;
pub mod error;
pub mod job;
pub mod timeline;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::DispatchError;
pub use job::{Job, JobContext, JobSet};
pub use timeline::{CoreTimeline, Slot};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::table::ScheduleTable;
use crate::task::{CoreId, TaskId};

// ── Settings ──────────────────────────────────────────────────────────────────

/// What to do when a tick's work outlasts the tick budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrunPolicy {
    /// Log the overrun, skip the ticks whose deadline already passed, keep
    /// running.
    #[default]
    Skip,
    /// Stop this core: the dispatcher enters `Faulted`.
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatcherSettings {
    /// Maximum time a tick's jobs may take.  `None` disables overrun
    /// detection.
    pub tick_budget: Option<Duration>,
    pub overrun_policy: OverrunPolicy,
}

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Armed,
    Running,
    Faulted,
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatcherState::Idle => "idle",
            DispatcherState::Armed => "armed",
            DispatcherState::Running => "running",
            DispatcherState::Faulted => "faulted",
        };
        f.write_str(s)
    }
}

// ── Outcomes & statistics ─────────────────────────────────────────────────────

/// Measured overrun of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overrun {
    pub elapsed: Duration,
    pub budget: Duration,
}

/// Result of dispatching one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub tick: u64,
    pub offset: u64,
    pub cycle: u64,
    /// Tasks whose jobs ran, in release order.
    pub invoked: Vec<TaskId>,
    /// Ticks between the previous dispatched tick and this one that were not
    /// dispatched.
    pub skipped: u64,
    /// Set when the tick overran under `OverrunPolicy::Skip`.
    pub overrun: Option<Overrun>,
}

/// Running counters of one core dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreStats {
    pub ticks_dispatched: u64,
    pub ticks_skipped: u64,
    pub overruns: u64,
    pub invocations: BTreeMap<TaskId, u64>,
}

impl CoreStats {
    pub fn invocations_of(&self, task: TaskId) -> u64 {
        self.invocations.get(&task).copied().unwrap_or(0)
    }

    pub fn total_invocations(&self) -> u64 {
        self.invocations.values().sum()
    }
}

// ── CoreDispatcher ────────────────────────────────────────────────────────────

/// Cyclic dispatcher for one mapped core.
pub struct CoreDispatcher<C: Clock = MonotonicClock> {
    table: Arc<ScheduleTable>,
    timeline: CoreTimeline,
    clock: C,
    settings: DispatcherSettings,
    state: DispatcherState,
    /// Lowest tick that may be dispatched next.
    next_tick: u64,
    /// First tick whose deadline had not passed after an overrun.
    resume_tick: Option<u64>,
    stats: CoreStats,
}

impl<C: Clock> CoreDispatcher<C> {
    /// Create an `Idle` dispatcher for `core`.
    pub fn new(
        table: Arc<ScheduleTable>,
        core: CoreId,
        clock: C,
        settings: DispatcherSettings,
    ) -> Result<Self, DispatchError> {
        if table.core(core).is_none() {
            return Err(DispatchError::UnknownCore(core));
        }
        let timeline = CoreTimeline::for_core(&table, core);

        debug!(
            %core,
            hyperperiod = timeline.hyperperiod(),
            slots = timeline.slots().len(),
            idle_ticks = timeline.idle_ticks(),
            "Core timeline built"
        );

        Ok(Self {
            table,
            timeline,
            clock,
            settings,
            state: DispatcherState::Idle,
            next_tick: 0,
            resume_tick: None,
            stats: CoreStats::default(),
        })
    }

    pub fn core(&self) -> CoreId {
        self.timeline.core()
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn timeline(&self) -> &CoreTimeline {
        &self.timeline
    }

    pub fn stats(&self) -> &CoreStats {
        &self.stats
    }

    /// Tick [`step`](Self::step) will dispatch.
    pub fn next_tick(&self) -> u64 {
        self.resume_tick.unwrap_or(self.next_tick)
    }

    /// Check that every task with scheduled instances on this core has a job
    /// in `jobs`, then move `Idle → Armed`.
    pub fn arm(&mut self, jobs: &JobSet) -> Result<(), DispatchError> {
        if self.state != DispatcherState::Idle {
            return Err(self.invalid("arm"));
        }

        for task in self.table.tasks_on_core(self.core()) {
            if !task.is_idle() && !jobs.contains(task.id) {
                return Err(DispatchError::UnboundTask {
                    core: self.core(),
                    task: task.id,
                    name: task.name.clone(),
                });
            }
        }

        self.state = DispatcherState::Armed;
        info!(core = %self.core(), hyperperiod = self.timeline.hyperperiod(), "Dispatcher armed");
        Ok(())
    }

    /// Dispatch absolute tick `tick`.
    ///
    /// Ticks between the previously dispatched tick and `tick` are counted as
    /// skipped; their jobs do not run.
    pub fn dispatch(&mut self, tick: u64, jobs: &mut JobSet) -> Result<TickOutcome, DispatchError> {
        match self.state {
            DispatcherState::Running => {}
            DispatcherState::Armed => {
                self.state = DispatcherState::Running;
                info!(core = %self.core(), first_tick = tick, "Dispatcher running");
            }
            DispatcherState::Idle | DispatcherState::Faulted => {
                return Err(self.invalid("dispatch"));
            }
        }

        if tick < self.next_tick {
            return Err(DispatchError::TickOutOfOrder {
                core: self.core(),
                last: self.next_tick - 1,
                requested: tick,
            });
        }

        let skipped = tick - self.next_tick;

        let hyperperiod = self.timeline.hyperperiod();
        let offset = tick % hyperperiod;
        let cycle = tick / hyperperiod;
        let released = self.timeline.tasks_at(offset);

        // All-or-nothing: a slot never runs partially because of a missing job.
        for &id in released {
            if !jobs.contains(id) {
                let name = self.table.task(id).map(|t| t.name.clone()).unwrap_or_default();
                return Err(DispatchError::UnboundTask {
                    core: self.core(),
                    task: id,
                    name,
                });
            }
        }

        if skipped > 0 {
            warn!(core = %self.core(), tick, skipped, "Skipping missed ticks");
            self.stats.ticks_skipped += skipped;
        }
        self.resume_tick = None;

        let start = self.clock.now();
        let mut invoked = Vec::with_capacity(released.len());
        for &id in released {
            let name = self.table.task(id).map(|t| t.name.as_str()).unwrap_or("");
            let ctx = JobContext {
                task: id,
                name,
                core: self.timeline.core(),
                tick,
                offset,
                cycle,
            };
            if let Some(job) = jobs.get_mut(id) {
                job.run(&ctx);
                invoked.push(id);
                *self.stats.invocations.entry(id).or_insert(0) += 1;
            }
        }
        let elapsed = self.clock.now().saturating_sub(start);

        if !invoked.is_empty() {
            debug!(core = %self.core(), tick, offset, cycle, tasks = ?invoked, "Released slot");
        }

        self.next_tick = tick + 1;
        self.stats.ticks_dispatched += 1;

        let mut outcome = TickOutcome {
            tick,
            offset,
            cycle,
            invoked,
            skipped,
            overrun: None,
        };

        if let Some(budget) = self.settings.tick_budget {
            if elapsed > budget {
                self.stats.overruns += 1;
                match self.settings.overrun_policy {
                    OverrunPolicy::Skip => {
                        let missed = ticks_covered(elapsed, budget);
                        self.resume_tick = Some(tick + 1 + missed);
                        warn!(
                            core = %self.core(),
                            tick,
                            ?elapsed,
                            ?budget,
                            missed,
                            "Tick overran its budget, skipping missed ticks"
                        );
                        outcome.overrun = Some(Overrun { elapsed, budget });
                    }
                    OverrunPolicy::Halt => {
                        self.state = DispatcherState::Faulted;
                        error!(
                            core = %self.core(),
                            tick,
                            ?elapsed,
                            ?budget,
                            "Tick overran its budget, halting core"
                        );
                        return Err(DispatchError::TimingOverrun {
                            core: self.core(),
                            tick,
                            elapsed,
                            budget,
                        });
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Dispatch the next tick (after any ticks skipped by an overrun).
    pub fn step(&mut self, jobs: &mut JobSet) -> Result<TickOutcome, DispatchError> {
        let tick = self.next_tick();
        self.dispatch(tick, jobs)
    }

    /// Step through `cycles` whole hyperperiods without waiting for time.
    ///
    /// Arms the dispatcher first if it is still `Idle`.
    pub fn run_cycles(&mut self, jobs: &mut JobSet, cycles: u64) -> Result<(), DispatchError> {
        if self.state == DispatcherState::Idle {
            self.arm(jobs)?;
        }
        let target = self
            .next_tick()
            .saturating_add(cycles.saturating_mul(self.timeline.hyperperiod()));
        while self.next_tick() < target {
            self.step(jobs)?;
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> DispatchError {
        DispatchError::InvalidTransition {
            core: self.core(),
            state: self.state,
            action,
        }
    }
}

/// Whole tick periods of `budget` contained in `elapsed`.
fn ticks_covered(elapsed: Duration, budget: Duration) -> u64 {
    if budget.is_zero() {
        return 0;
    }
    u64::try_from(elapsed.as_nanos() / budget.as_nanos()).unwrap_or(u64::MAX)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::builtin::{DEMO_TASKS, EXAMPLE2};
    use crate::table::{ScheduleTableBuilder, ValidationPolicy};

    type Log = Arc<Mutex<Vec<(TaskId, u64, u64)>>>;

    fn demo_table() -> Arc<ScheduleTable> {
        Arc::new(
            ScheduleTableBuilder::from(&DEMO_TASKS)
                .build(&ValidationPolicy::strict())
                .unwrap(),
        )
    }

    fn recording_jobs(table: &ScheduleTable, log: &Log) -> JobSet {
        let mut jobs = JobSet::new();
        for task in table.tasks() {
            let log = log.clone();
            jobs.insert(task.id, move |ctx: &JobContext<'_>| {
                log.lock().unwrap().push((ctx.task, ctx.tick, ctx.offset));
            });
        }
        jobs
    }

    fn dispatcher(table: Arc<ScheduleTable>) -> CoreDispatcher<ManualClock> {
        CoreDispatcher::new(table, CoreId(0), ManualClock::new(), DispatcherSettings::default())
            .unwrap()
    }

    // ── Scenario A: demo table ────────────────────────────────────────────────

    #[test]
    fn demo_hyperperiod_fires_listed_offsets_exactly() {
        let table = demo_table();
        let log: Log = Default::default();
        let mut jobs = recording_jobs(&table, &log);
        let mut d = dispatcher(table);

        d.run_cycles(&mut jobs, 1).unwrap();

        let log = log.lock().unwrap();
        let t1: Vec<u64> = log.iter().filter(|e| e.0 == TaskId(0)).map(|e| e.1).collect();
        let t2: Vec<u64> = log.iter().filter(|e| e.0 == TaskId(1)).map(|e| e.1).collect();
        assert_eq!(t1, vec![0, 6, 12, 15, 21, 27, 33]);
        assert_eq!(t2, vec![2, 8, 17, 23, 29]);
        assert_eq!(d.stats().invocations_of(TaskId(0)), 7);
        assert_eq!(d.stats().invocations_of(TaskId(1)), 5);
        assert_eq!(d.stats().ticks_dispatched, 35);
    }

    #[test]
    fn demo_second_cycle_repeats_first() {
        let table = demo_table();
        let log: Log = Default::default();
        let mut jobs = recording_jobs(&table, &log);
        let mut d = dispatcher(table);

        d.run_cycles(&mut jobs, 2).unwrap();

        let log = log.lock().unwrap();
        let (first, second): (Vec<&(TaskId, u64, u64)>, Vec<&(TaskId, u64, u64)>) =
            log.iter().partition(|e| e.1 < 35);
        let first: Vec<(TaskId, u64)> = first.iter().map(|e| (e.0, e.2)).collect();
        let second: Vec<(TaskId, u64)> = second.iter().map(|e| (e.0, e.2)).collect();
        assert_eq!(first, second);

        // tick 35 is offset 0 of the next cycle
        assert!(log.contains(&(TaskId(0), 35, 0)));
    }

    #[test]
    fn outcome_reports_offset_and_cycle() {
        let table = demo_table();
        let log: Log = Default::default();
        let mut jobs = recording_jobs(&table, &log);
        let mut d = dispatcher(table);
        d.arm(&jobs).unwrap();

        let out = d.dispatch(37, &mut jobs).unwrap();
        assert_eq!(out.offset, 2);
        assert_eq!(out.cycle, 1);
        assert_eq!(out.invoked, vec![TaskId(1)]);
        assert_eq!(out.skipped, 37);
    }

    // ── Scenario B: idle table ────────────────────────────────────────────────

    #[test]
    fn idle_table_runs_without_jobs_or_faults() {
        let table = Arc::new(
            ScheduleTableBuilder::from(&EXAMPLE2)
                .build(&ValidationPolicy::lenient())
                .unwrap(),
        );
        let mut jobs = JobSet::new();
        let mut d = CoreDispatcher::new(
            table,
            CoreId(0),
            ManualClock::new(),
            DispatcherSettings {
                tick_budget: Some(Duration::from_millis(1)),
                overrun_policy: OverrunPolicy::Halt,
            },
        )
        .unwrap();

        d.run_cycles(&mut jobs, 1).unwrap();
        assert_eq!(d.stats().ticks_dispatched, 36);
        assert_eq!(d.stats().total_invocations(), 0);
        assert_eq!(d.stats().overruns, 0);
        assert_eq!(d.state(), DispatcherState::Running);
    }

    // ── State machine ─────────────────────────────────────────────────────────

    #[test]
    fn dispatch_before_arm_is_invalid() {
        let table = demo_table();
        let log: Log = Default::default();
        let mut jobs = recording_jobs(&table, &log);
        let mut d = dispatcher(table);
        let err = d.dispatch(0, &mut jobs).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidTransition {
                state: DispatcherState::Idle,
                ..
            }
        ));
    }

    #[test]
    fn arm_twice_is_invalid() {
        let table = demo_table();
        let log: Log = Default::default();
        let jobs = recording_jobs(&table, &log);
        let mut d = dispatcher(table);
        d.arm(&jobs).unwrap();
        assert_eq!(d.state(), DispatcherState::Armed);
        assert!(matches!(d.arm(&jobs), Err(DispatchError::InvalidTransition { .. })));
    }

    #[test]
    fn first_dispatch_moves_armed_to_running() {
        let table = demo_table();
        let log: Log = Default::default();
        let mut jobs = recording_jobs(&table, &log);
        let mut d = dispatcher(table);
        d.arm(&jobs).unwrap();
        d.step(&mut jobs).unwrap();
        assert_eq!(d.state(), DispatcherState::Running);
    }

    #[test]
    fn arm_requires_job_for_every_busy_task() {
        let table = demo_table();
        let mut jobs = JobSet::new();
        jobs.insert(TaskId(0), |_: &JobContext<'_>| {});
        let mut d = dispatcher(table);
        let err = d.arm(&jobs).unwrap_err();
        assert_eq!(
            err,
            DispatchError::UnboundTask {
                core: CoreId(0),
                task: TaskId(1),
                name: "T2".into()
            }
        );
        assert_eq!(d.state(), DispatcherState::Idle);
    }

    #[test]
    fn ticks_must_strictly_increase() {
        let table = demo_table();
        let log: Log = Default::default();
        let mut jobs = recording_jobs(&table, &log);
        let mut d = dispatcher(table);
        d.arm(&jobs).unwrap();
        d.dispatch(5, &mut jobs).unwrap();

        assert_eq!(
            d.dispatch(5, &mut jobs).unwrap_err(),
            DispatchError::TickOutOfOrder {
                core: CoreId(0),
                last: 5,
                requested: 5
            }
        );
        assert!(d.dispatch(4, &mut jobs).is_err());
        assert!(d.dispatch(6, &mut jobs).is_ok());
    }

    #[test]
    fn rejected_slot_does_not_count_skipped_ticks() {
        let table = demo_table();
        let log: Log = Default::default();
        let mut jobs = recording_jobs(&table, &log);
        let mut d = dispatcher(table);
        d.arm(&jobs).unwrap();
        d.dispatch(0, &mut jobs).unwrap();

        // T2 fires at offset 2
        let t2 = jobs.remove(TaskId(1)).unwrap();
        for _ in 0..2 {
            assert!(matches!(
                d.dispatch(2, &mut jobs),
                Err(DispatchError::UnboundTask { task: TaskId(1), .. })
            ));
        }
        assert_eq!(d.stats().ticks_skipped, 0);
        assert_eq!(d.next_tick(), 1);

        jobs.insert_boxed(TaskId(1), t2);
        let outcome = d.dispatch(2, &mut jobs).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(d.stats().ticks_skipped, 1);
    }

    #[test]
    fn unknown_core_is_rejected() {
        let result = CoreDispatcher::new(
            demo_table(),
            CoreId(1),
            ManualClock::new(),
            DispatcherSettings::default(),
        );
        assert!(matches!(result, Err(DispatchError::UnknownCore(CoreId(1)))));
    }

    // ── Overruns ──────────────────────────────────────────────────────────────

    /// Jobs for the demo table where T1 takes `t1_cost` of manual time.
    fn slow_jobs(clock: &ManualClock, t1_cost: Duration) -> JobSet {
        let mut jobs = JobSet::new();
        let c = clock.clone();
        jobs.insert(TaskId(0), move |_: &JobContext<'_>| c.advance(t1_cost));
        jobs.insert(TaskId(1), |_: &JobContext<'_>| {});
        jobs
    }

    #[test]
    fn overrun_with_halt_faults_the_core() {
        let clock = ManualClock::new();
        let mut jobs = slow_jobs(&clock, Duration::from_micros(1_500));
        let mut d = CoreDispatcher::new(
            demo_table(),
            CoreId(0),
            clock,
            DispatcherSettings {
                tick_budget: Some(Duration::from_millis(1)),
                overrun_policy: OverrunPolicy::Halt,
            },
        )
        .unwrap();
        d.arm(&jobs).unwrap();

        let err = d.step(&mut jobs).unwrap_err();
        assert_eq!(
            err,
            DispatchError::TimingOverrun {
                core: CoreId(0),
                tick: 0,
                elapsed: Duration::from_micros(1_500),
                budget: Duration::from_millis(1),
            }
        );
        assert_eq!(d.state(), DispatcherState::Faulted);
        assert!(matches!(
            d.step(&mut jobs),
            Err(DispatchError::InvalidTransition {
                state: DispatcherState::Faulted,
                ..
            })
        ));
    }

    #[test]
    fn overrun_with_skip_drops_missed_ticks_and_continues() {
        let clock = ManualClock::new();
        let mut jobs = slow_jobs(&clock, Duration::from_micros(2_500));
        let mut d = CoreDispatcher::new(
            demo_table(),
            CoreId(0),
            clock,
            DispatcherSettings {
                tick_budget: Some(Duration::from_millis(1)),
                overrun_policy: OverrunPolicy::Skip,
            },
        )
        .unwrap();
        d.arm(&jobs).unwrap();

        let first = d.step(&mut jobs).unwrap();
        assert_eq!(first.invoked, vec![TaskId(0)]);
        assert_eq!(
            first.overrun,
            Some(Overrun {
                elapsed: Duration::from_micros(2_500),
                budget: Duration::from_millis(1)
            })
        );

        // 2.5 budgets: ticks 1 and 2 missed, tick 3 is next (T2 at offset 2 lost)
        assert_eq!(d.next_tick(), 3);
        let next = d.step(&mut jobs).unwrap();
        assert_eq!(next.tick, 3);
        assert_eq!(next.skipped, 2);
        assert_eq!(d.stats().ticks_skipped, 2);
        assert_eq!(d.stats().overruns, 1);
        assert_eq!(d.stats().invocations_of(TaskId(1)), 0);
        assert_eq!(d.state(), DispatcherState::Running);
    }

    #[test]
    fn no_budget_means_no_overrun_detection() {
        let clock = ManualClock::new();
        let mut jobs = slow_jobs(&clock, Duration::from_secs(10));
        let mut d = CoreDispatcher::new(demo_table(), CoreId(0), clock, DispatcherSettings::default())
            .unwrap();
        d.run_cycles(&mut jobs, 1).unwrap();
        assert_eq!(d.stats().overruns, 0);
        assert_eq!(d.stats().ticks_skipped, 0);
    }

    #[test]
    fn identical_tables_replay_identically() {
        let run = || {
            let table = demo_table();
            let log: Log = Default::default();
            let mut jobs = recording_jobs(&table, &log);
            let mut d = dispatcher(table);
            d.run_cycles(&mut jobs, 3).unwrap();
            let v = log.lock().unwrap().clone();
            v
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn ticks_covered_rounds_down() {
        assert_eq!(ticks_covered(Duration::from_micros(2_500), Duration::from_millis(1)), 2);
        assert_eq!(ticks_covered(Duration::from_micros(1_001), Duration::from_millis(1)), 1);
        assert_eq!(ticks_covered(Duration::from_secs(1), Duration::ZERO), 0);
    }
}
