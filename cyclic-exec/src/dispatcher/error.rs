/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runtime errors of a core dispatcher.
//!
//! Table structure is validated before a dispatcher exists, so everything here
//! is either a wiring mistake (unbound or unknown task, wrong state) or a
//! timing fault.

use std::time::Duration;

use thiserror::Error;

use super::DispatcherState;
use crate::task::{CoreId, TaskId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A tick's jobs did not finish within the tick budget and the overrun
    /// policy is `Halt`.  The dispatcher is now `Faulted`.
    #[error("{core}: tick {tick} overran its budget ({elapsed:?} > {budget:?})")]
    TimingOverrun {
        core: CoreId,
        tick: u64,
        elapsed: Duration,
        budget: Duration,
    },

    /// A tick at or before the last dispatched tick was requested.
    #[error("{core}: tick {requested} requested after tick {last}")]
    TickOutOfOrder {
        core: CoreId,
        last: u64,
        requested: u64,
    },

    /// The operation is not allowed in the dispatcher's current state.
    #[error("{core}: cannot {action} while {state}")]
    InvalidTransition {
        core: CoreId,
        state: DispatcherState,
        action: &'static str,
    },

    /// A task with scheduled instances on this core has no job bound.
    #[error("{core}: task '{name}' ({task}) has scheduled instances but no job")]
    UnboundTask {
        core: CoreId,
        task: TaskId,
        name: String,
    },

    /// A job was bound to a task id the table does not contain.
    #[error("task {0} is not in the schedule table")]
    UnknownTask(TaskId),

    /// A dispatcher was requested for a core the table does not map.
    #[error("{0} is not mapped by the schedule table")]
    UnknownCore(CoreId),

    /// The OS refused to start the core's dispatch thread.
    #[error("{core}: cannot start dispatch thread: {reason}")]
    ThreadSpawn { core: CoreId, reason: String },
}
