/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runtime fault reporting.
//!
//! Core loops never stop one another.  When a core observes a timing overrun
//! (or halts for any other reason) it pushes a [`FaultReport`] into an
//! unbounded channel and, depending on the overrun policy, keeps going or
//! stops itself.  Whoever holds the [`FaultReceiver`] decides what a fault
//! means for the deployment.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dispatcher::DispatchError;
use crate::task::CoreId;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// A tick's jobs outlasted the tick budget.
    TimingOverrun {
        elapsed: Duration,
        budget: Duration,
        /// `true` when the core stopped because of it.
        halted: bool,
    },

    /// The core loop stopped on a dispatcher error other than an overrun.
    Dispatch(DispatchError),
}

/// One fault observed on one core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub core: CoreId,
    pub tick: u64,
    pub kind: FaultKind,
}

impl FaultReport {
    /// `true` if the reporting core is no longer dispatching.
    pub fn is_fatal(&self) -> bool {
        match &self.kind {
            FaultKind::TimingOverrun { halted, .. } => *halted,
            FaultKind::Dispatch(_) => true,
        }
    }
}

pub type FaultReceiver = mpsc::UnboundedReceiver<FaultReport>;

/// Sending half of the fault channel, cloned once per core.
#[derive(Debug, Clone)]
pub struct FaultNotifier {
    tx: mpsc::UnboundedSender<FaultReport>,
}

impl FaultNotifier {
    /// Forward `report`.  A closed channel is not an error: faults are still
    /// logged by the core that raised them.
    pub fn notify(&self, report: FaultReport) {
        if self.tx.send(report).is_err() {
            debug!("Fault receiver dropped, report discarded");
        }
    }
}

/// Create a connected notifier/receiver pair.
pub fn fault_channel() -> (FaultNotifier, FaultReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FaultNotifier { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrun(halted: bool) -> FaultReport {
        FaultReport {
            core: CoreId(0),
            tick: 7,
            kind: FaultKind::TimingOverrun {
                elapsed: Duration::from_millis(3),
                budget: Duration::from_millis(1),
                halted,
            },
        }
    }

    #[test]
    fn reports_arrive_in_order() {
        let (tx, mut rx) = fault_channel();
        tx.notify(overrun(false));
        tx.clone().notify(overrun(true));
        assert_eq!(rx.try_recv().unwrap(), overrun(false));
        assert_eq!(rx.try_recv().unwrap(), overrun(true));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn notify_after_receiver_dropped_does_not_panic() {
        let (tx, rx) = fault_channel();
        drop(rx);
        tx.notify(overrun(true));
    }

    #[test]
    fn fatality_follows_halt_flag() {
        assert!(!overrun(false).is_fatal());
        assert!(overrun(true).is_fatal());
        let dispatch = FaultReport {
            core: CoreId(1),
            tick: 0,
            kind: FaultKind::Dispatch(DispatchError::UnknownCore(CoreId(1))),
        };
        assert!(dispatch.is_fatal());
    }
}
