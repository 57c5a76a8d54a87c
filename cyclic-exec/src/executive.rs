/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Multi-core cyclic executive.
//!
//! [`Executive`] partitions the bound jobs by core, builds one
//! [`CoreDispatcher`] per mapped core and arms all of them before any core
//! starts: a wiring error on one core means no core runs.
//!
//! ```text
//!                     Arc<ScheduleTable> (read-only)
//!                    ┌──────────┴──────────┐
//!   sleep_until ─► core0 thread        core1 thread ◄─ sleep_until
//!                 │ CoreDispatcher       │ CoreDispatcher
//!                 │ JobSet (core0 only)  │ JobSet (core1 only)
//!                 └──────► FaultNotifier ◄┘
//! ```
//!
//! Jobs are plain blocking code, so each core runs on its own OS thread and
//! waits for its next tick on the tokio timer.  Nothing mutable is shared
//! between cores; a core that halts on an overrun reports through the fault
//! channel and the others continue.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::dispatcher::{
    Clock, CoreDispatcher, CoreStats, DispatchError, DispatcherSettings, DispatcherState, Job,
    JobSet, ManualClock, MonotonicClock, OverrunPolicy,
};
use crate::fault::{FaultKind, FaultNotifier, FaultReport};
use crate::table::ScheduleTable;
use crate::task::{CoreId, ScheduledTask, TaskId};

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutiveSettings {
    /// Wall-clock length of one tick.  Also the per-tick work budget.
    pub tick_period: Duration,
    pub overrun_policy: OverrunPolicy,
    /// Hyperperiods to run before stopping; `None` runs until shutdown.
    pub cycles: Option<u64>,
    /// Measure each tick's work against `tick_period`.
    pub detect_overruns: bool,
}

impl Default for ExecutiveSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(1),
            overrun_policy: OverrunPolicy::Skip,
            cycles: None,
            detect_overruns: true,
        }
    }
}

impl ExecutiveSettings {
    fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            tick_budget: self.detect_overruns.then_some(self.tick_period),
            overrun_policy: self.overrun_policy,
        }
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

/// How one core finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreReport {
    pub core: CoreId,
    pub state: DispatcherState,
    pub stats: CoreStats,
    /// Error that stopped the core, if any.
    pub fault: Option<DispatchError>,
    /// The core's task panicked inside a job.
    pub panicked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutiveReport {
    pub cores: Vec<CoreReport>,
}

impl ExecutiveReport {
    pub fn core(&self, core: CoreId) -> Option<&CoreReport> {
        self.cores.iter().find(|c| c.core == core)
    }

    /// Invocations of `task` across all cores.
    pub fn invocations_of(&self, task: TaskId) -> u64 {
        self.cores.iter().map(|c| c.stats.invocations_of(task)).sum()
    }

    pub fn faulted_cores(&self) -> impl Iterator<Item = CoreId> + '_ {
        self.cores
            .iter()
            .filter(|c| c.fault.is_some() || c.panicked)
            .map(|c| c.core)
    }
}

// ── Executive ─────────────────────────────────────────────────────────────────

/// Dispatches a whole schedule table, one dispatcher per mapped core.
pub struct Executive {
    table: Arc<ScheduleTable>,
    settings: ExecutiveSettings,
    jobs: JobSet,
    faults: Option<FaultNotifier>,
}

type CorePlan<C> = (CoreDispatcher<C>, JobSet);

impl Executive {
    pub fn new(table: Arc<ScheduleTable>, settings: ExecutiveSettings) -> Self {
        Self {
            table,
            settings,
            jobs: JobSet::new(),
            faults: None,
        }
    }

    /// Route fault reports from every core to `notifier`.
    pub fn with_fault_notifier(mut self, notifier: FaultNotifier) -> Self {
        self.faults = Some(notifier);
        self
    }

    pub fn table(&self) -> &Arc<ScheduleTable> {
        &self.table
    }

    /// Bind `job` to `task`, replacing any earlier binding.
    pub fn bind(&mut self, task: TaskId, job: impl Job + 'static) -> Result<(), DispatchError> {
        if self.table.task(task).is_none() {
            return Err(DispatchError::UnknownTask(task));
        }
        self.jobs.insert(task, job);
        Ok(())
    }

    /// Bind a job produced by `make` to every task that has scheduled
    /// instances.
    pub fn bind_each(&mut self, mut make: impl FnMut(&ScheduledTask) -> Box<dyn Job>) {
        for task in self.table.tasks().iter().filter(|t| !t.is_idle()) {
            self.jobs.insert_boxed(task.id, make(task));
        }
    }

    /// Split jobs by core, then build and arm every core dispatcher.
    fn prepare<C: Clock>(
        self,
        clock: impl Fn() -> C,
    ) -> Result<(Vec<CorePlan<C>>, Option<FaultNotifier>), DispatchError> {
        let Executive {
            table,
            settings,
            mut jobs,
            faults,
        } = self;

        let mut plans = Vec::with_capacity(table.cores().len());
        for slice in table.cores() {
            let core = slice.id;
            let core_jobs =
                jobs.split_off_where(|id| table.task(id).map(|t| t.core) == Some(core));

            let mut dispatcher = CoreDispatcher::new(
                table.clone(),
                core,
                clock(),
                settings.dispatcher_settings(),
            )?;
            dispatcher.arm(&core_jobs)?;
            plans.push((dispatcher, core_jobs));
        }

        Ok((plans, faults))
    }

    /// Run every core against the tick timer until `settings.cycles`
    /// hyperperiods have elapsed or `shutdown` turns `true`.
    ///
    /// Each core dispatches on its own OS thread, so a job that blocks only
    /// delays its own core.  A dropped `shutdown` sender means no shutdown
    /// can arrive; cores then run until the cycle limit.
    ///
    /// # Errors
    /// Fails before any core starts if a core cannot be armed.  Faults that
    /// happen while running are reported per core in the returned
    /// [`ExecutiveReport`] and through the fault notifier.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<ExecutiveReport, DispatchError> {
        let settings = self.settings;
        let (plans, faults) = self.prepare(MonotonicClock::new)?;

        info!(
            cores = plans.len(),
            tick_period = ?settings.tick_period,
            cycles = ?settings.cycles,
            policy = ?settings.overrun_policy,
            "Starting cyclic executive"
        );

        let runtime = Handle::current();
        let start = Instant::now();
        let mut started = Vec::with_capacity(plans.len());
        for (dispatcher, jobs) in plans {
            let core = dispatcher.core();
            let (done_tx, done_rx) = oneshot::channel();
            let core_loop = CoreLoop {
                settings,
                start,
                faults: faults.clone(),
                shutdown: Some(shutdown.clone()),
                runtime: runtime.clone(),
            };

            let spawned = thread::Builder::new()
                .name(format!("cyclic-{core}"))
                .spawn(move || {
                    let report = core_loop.run(dispatcher, jobs);
                    let _ = done_tx.send(report);
                });

            match spawned {
                Ok(_) => started.push((core, Ok(done_rx))),
                Err(e) => {
                    let err = DispatchError::ThreadSpawn {
                        core,
                        reason: e.to_string(),
                    };
                    error!(%core, "{err}");
                    if let Some(notifier) = &faults {
                        notifier.notify(FaultReport {
                            core,
                            tick: 0,
                            kind: FaultKind::Dispatch(err.clone()),
                        });
                    }
                    started.push((
                        core,
                        Err(CoreReport {
                            core,
                            state: DispatcherState::Armed,
                            stats: CoreStats::default(),
                            fault: Some(err),
                            panicked: false,
                        }),
                    ));
                }
            }
        }

        let mut report = ExecutiveReport::default();
        for (core, outcome) in started {
            let core_report = match outcome {
                Ok(done_rx) => match done_rx.await {
                    Ok(core_report) => core_report,
                    // The sender only disappears unsent if the thread unwound.
                    Err(_) => {
                        error!(%core, "Core thread panicked");
                        CoreReport {
                            core,
                            state: DispatcherState::Faulted,
                            stats: CoreStats::default(),
                            fault: None,
                            panicked: true,
                        }
                    }
                },
                Err(failed) => failed,
            };
            report.cores.push(core_report);
        }

        info!(faulted = report.faulted_cores().count(), "Cyclic executive stopped");
        Ok(report)
    }

    /// Step every core through `cycles` hyperperiods back-to-back, without a
    /// timer.  Time never advances, so no overrun can occur.
    pub fn simulate(self, cycles: u64) -> Result<ExecutiveReport, DispatchError> {
        let (plans, faults) = self.prepare(ManualClock::new)?;

        let mut report = ExecutiveReport::default();
        for (mut dispatcher, mut jobs) in plans {
            let fault = dispatcher.run_cycles(&mut jobs, cycles).err();
            if let (Some(err), Some(notifier)) = (&fault, &faults) {
                notifier.notify(FaultReport {
                    core: dispatcher.core(),
                    tick: dispatcher.next_tick(),
                    kind: FaultKind::Dispatch(err.clone()),
                });
            }
            report.cores.push(CoreReport {
                core: dispatcher.core(),
                state: dispatcher.state(),
                stats: dispatcher.stats().clone(),
                fault,
                panicked: false,
            });
        }
        Ok(report)
    }
}

// ── Core loop ─────────────────────────────────────────────────────────────────

/// Everything a core thread needs besides its dispatcher and jobs.
struct CoreLoop {
    settings: ExecutiveSettings,
    start: Instant,
    faults: Option<FaultNotifier>,
    /// `None` once the sender is gone.
    shutdown: Option<watch::Receiver<bool>>,
    runtime: Handle,
}

impl CoreLoop {
    fn run<C: Clock>(mut self, mut dispatcher: CoreDispatcher<C>, mut jobs: JobSet) -> CoreReport {
        let core = dispatcher.core();
        let period = self.settings.tick_period;
        let end_tick = self
            .settings
            .cycles
            .map(|c| c.saturating_mul(dispatcher.timeline().hyperperiod()));

        let mut fault = None;
        loop {
            let next = dispatcher.next_tick();
            if end_tick.is_some_and(|end| next >= end) {
                break;
            }

            // A tick is never released before its instant.
            let deadline = tick_instant(self.start, next, period);
            let runtime = self.runtime.clone();
            if runtime.block_on(self.wait_for(deadline)) {
                info!(%core, "Shutdown requested");
                break;
            }

            // Woken more than a period late: release the tick due now.
            let tick = ticks_between(self.start, Instant::now(), period).max(next);
            if end_tick.is_some_and(|end| tick >= end) {
                break;
            }

            match dispatcher.dispatch(tick, &mut jobs) {
                Ok(outcome) => {
                    if let Some(overrun) = outcome.overrun {
                        self.report(FaultReport {
                            core,
                            tick,
                            kind: FaultKind::TimingOverrun {
                                elapsed: overrun.elapsed,
                                budget: overrun.budget,
                                halted: false,
                            },
                        });
                    }
                }
                Err(err) => {
                    error!(%core, tick, "Core stopped: {err}");
                    let kind = match &err {
                        DispatchError::TimingOverrun { elapsed, budget, .. } => {
                            FaultKind::TimingOverrun {
                                elapsed: *elapsed,
                                budget: *budget,
                                halted: true,
                            }
                        }
                        other => FaultKind::Dispatch(other.clone()),
                    };
                    self.report(FaultReport { core, tick, kind });
                    fault = Some(err);
                    break;
                }
            }
        }

        let stats = dispatcher.stats().clone();
        info!(
            %core,
            state = %dispatcher.state(),
            ticks = stats.ticks_dispatched,
            skipped = stats.ticks_skipped,
            overruns = stats.overruns,
            "Core finished"
        );

        CoreReport {
            core,
            state: dispatcher.state(),
            stats,
            fault,
            panicked: false,
        }
    }

    /// Sleep until `deadline`.  Returns `true` if shutdown was requested first.
    async fn wait_for(&mut self, deadline: Instant) -> bool {
        loop {
            let Some(rx) = self.shutdown.as_mut() else {
                tokio::time::sleep_until(deadline).await;
                return false;
            };
            if *rx.borrow_and_update() {
                return true;
            }

            let closed = tokio::select! {
                biased;

                changed = rx.changed() => changed.is_err(),
                _ = tokio::time::sleep_until(deadline) => return false,
            };
            if closed {
                debug!("Shutdown sender dropped, running until the cycle limit");
                self.shutdown = None;
            }
        }
    }

    fn report(&self, report: FaultReport) {
        if let Some(notifier) = &self.faults {
            notifier.notify(report);
        }
    }
}

/// Far enough ahead to never be reached by a running executive.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Instant at which absolute tick `tick` is due.
fn tick_instant(start: Instant, tick: u64, period: Duration) -> Instant {
    let nanos = period.as_nanos().saturating_mul(u128::from(tick));
    let offset = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));
    start
        .checked_add(offset)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
}

/// Whole tick periods between `start` and `at`.
fn ticks_between(start: Instant, at: Instant, period: Duration) -> u64 {
    let nanos = period.as_nanos().max(1);
    u64::try_from(at.saturating_duration_since(start).as_nanos() / nanos).unwrap_or(u64::MAX)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
