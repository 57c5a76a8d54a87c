/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Work items bound to table tasks.

use std::collections::BTreeMap;
use std::fmt;

use crate::task::{CoreId, TaskId};

/// Everything a job learns about the instant it was released at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobContext<'a> {
    pub task: TaskId,
    pub name: &'a str,
    pub core: CoreId,
    /// Absolute tick since the dispatcher started.
    pub tick: u64,
    /// `tick % hyperperiod` — the scheduled instant that matched.
    pub offset: u64,
    /// Number of completed hyperperiods before this tick.
    pub cycle: u64,
}

/// A task's work function.
///
/// Jobs run to completion on the dispatching core; a job that runs past the
/// tick budget is reported as a timing overrun.
pub trait Job: Send {
    fn run(&mut self, ctx: &JobContext<'_>);
}

impl<F> Job for F
where
    F: FnMut(&JobContext<'_>) + Send,
{
    fn run(&mut self, ctx: &JobContext<'_>) {
        self(ctx)
    }
}

/// Jobs keyed by task id.
#[derive(Default)]
pub struct JobSet {
    jobs: BTreeMap<TaskId, Box<dyn Job>>,
}

impl JobSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `job` to `task`, returning the job it replaced.
    pub fn insert(&mut self, task: TaskId, job: impl Job + 'static) -> Option<Box<dyn Job>> {
        self.jobs.insert(task, Box::new(job))
    }

    pub fn insert_boxed(&mut self, task: TaskId, job: Box<dyn Job>) -> Option<Box<dyn Job>> {
        self.jobs.insert(task, job)
    }

    pub fn remove(&mut self, task: TaskId) -> Option<Box<dyn Job>> {
        self.jobs.remove(&task)
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.jobs.contains_key(&task)
    }

    pub fn get_mut(&mut self, task: TaskId) -> Option<&mut (dyn Job + 'static)> {
        self.jobs.get_mut(&task).map(|job| job.as_mut())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Move out every job whose task satisfies `pred`.
    pub fn split_off_where(&mut self, mut pred: impl FnMut(TaskId) -> bool) -> JobSet {
        let ids: Vec<TaskId> = self.jobs.keys().copied().filter(|&id| pred(id)).collect();
        let mut out = JobSet::new();
        for id in ids {
            if let Some(job) = self.jobs.remove(&id) {
                out.jobs.insert(id, job);
            }
        }
        out
    }
}

impl fmt::Debug for JobSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.jobs.keys()).finish()
    }
}
