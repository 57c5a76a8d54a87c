/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cyclic executive for statically scheduled task tables.
//!
//! An offline generator emits a schedule table: for every task, its period,
//! its core and the exact offsets within one hyperperiod at which it is
//! released.  This crate validates such a table once at startup and then
//! replays it, hyperperiod after hyperperiod, one dispatcher per core.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task          – task/core ids and validated task records
//! ├── hyperperiod/  – LCM / GCD helpers, hyperperiod derivation
//! ├── table/        – raw layout, builder, validation, frozen ScheduleTable
//! ├── builtin       – generated demo tables as constant data
//! ├── dispatcher/   – per-core timeline and tick state machine
//! ├── executive     – one thread per core, shutdown, simulation
//! ├── fault         – fault reports from cores to the supervisor
//! └── config/       – YAML runner configuration
//! ```

pub mod builtin;
pub mod config;
pub mod dispatcher;
pub mod executive;
pub mod fault;
pub mod hyperperiod;
pub mod table;
pub mod task;
