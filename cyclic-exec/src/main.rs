/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use cyclic_exec::builtin;
use cyclic_exec::config::RunnerConfig;
use cyclic_exec::dispatcher::{Job, JobContext};
use cyclic_exec::executive::{Executive, ExecutiveReport};
use cyclic_exec::fault::{fault_channel, FaultKind};
use cyclic_exec::table::{ScheduleTable, ScheduleTableBuilder, ValidationPolicy};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Cyclic executive: replays a static schedule table, one dispatcher per core.
///
/// Example:
///   cyclic-exec --builtin demo --cycles 3 --tick-us 1000
///   cyclic-exec --table schedule.yaml --config runner.yaml
#[derive(Debug, Parser)]
#[command(
    name = "cyclic-exec",
    about = "Cyclic executive for statically scheduled task tables",
    long_about = None,
)]
struct Cli {
    /// YAML schedule table to load.
    #[arg(short = 't', long = "table", conflicts_with = "builtin")]
    table: Option<PathBuf>,

    /// Built-in schedule table (demo, example2).
    #[arg(short = 'b', long = "builtin", default_value = "demo")]
    builtin: String,

    /// Path to the YAML runner configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Hyperperiods to run (overrides the configuration file).
    #[arg(short = 'n', long = "cycles")]
    cycles: Option<u64>,

    /// Tick period in microseconds (overrides the configuration file).
    #[arg(long = "tick-us")]
    tick_us: Option<u64>,

    /// Step through the table without real time.
    #[arg(short = 's', long = "simulate", default_value_t = false)]
    simulate: bool,

    /// Accept idle tasks, duplicate names and non-minimal hyperperiods.
    #[arg(short = 'l', long = "lenient", default_value_t = false)]
    lenient: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        table    = ?cli.table,
        builtin  = %cli.builtin,
        config   = ?cli.config,
        cycles   = ?cli.cycles,
        tick_us  = ?cli.tick_us,
        simulate = cli.simulate,
        lenient  = cli.lenient,
        "Cyclic executive starting up..."
    );

    match run(cli).await {
        Ok(true) => info!("All cores finished cleanly"),
        Ok(false) => {
            error!("One or more cores faulted");
            process::exit(1);
        }
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` if any core faulted.
async fn run(cli: Cli) -> Result<bool> {
    // ── Configuration ─────────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => RunnerConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using default runner settings");
            RunnerConfig::default()
        }
    };
    if let Some(cycles) = cli.cycles {
        config.dispatcher.cycles = Some(cycles);
    }
    if let Some(tick_us) = cli.tick_us {
        if tick_us == 0 {
            return Err(anyhow!("--tick-us must be positive"));
        }
        config.dispatcher.tick_period_us = tick_us;
    }
    if cli.lenient {
        config.validation = ValidationPolicy {
            max_hyperperiod: config.validation.max_hyperperiod,
            allow_multi_hyperperiod_cores: config.validation.allow_multi_hyperperiod_cores,
            ..ValidationPolicy::lenient()
        };
    }

    // ── Schedule table ────────────────────────────────────────────────────────
    let table = Arc::new(load_table(&cli, &config.validation)?);
    log_table(&table);

    // ── Executive ─────────────────────────────────────────────────────────────
    let (notifier, mut faults) = fault_channel();
    let mut exec =
        Executive::new(table, config.dispatcher.to_settings()).with_fault_notifier(notifier);
    exec.bind_each(|_| {
        Box::new(|ctx: &JobContext<'_>| {
            info!(
                task = ctx.name,
                id = %ctx.task,
                core = %ctx.core,
                tick = ctx.tick,
                offset = ctx.offset,
                cycle = ctx.cycle,
                "Job released"
            );
        }) as Box<dyn Job>
    });

    let drain = tokio::spawn(async move {
        let mut count = 0_u64;
        while let Some(report) = faults.recv().await {
            count += 1;
            match &report.kind {
                FaultKind::TimingOverrun {
                    elapsed,
                    budget,
                    halted,
                } => warn!(
                    core = %report.core,
                    tick = report.tick,
                    ?elapsed,
                    ?budget,
                    halted,
                    "Timing overrun reported"
                ),
                FaultKind::Dispatch(e) => {
                    error!(core = %report.core, tick = report.tick, "Core fault: {e}")
                }
            }
        }
        count
    });

    let report = if cli.simulate {
        let cycles = config.dispatcher.cycles.unwrap_or(1);
        info!(cycles, "Simulating without real time");
        exec.simulate(cycles)?
    } else {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, shutting down");
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => {
                    error!("Cannot listen for Ctrl-C: {e}");
                    // Dropping the sender would read as a shutdown request.
                    let _keep = shutdown_tx;
                    std::future::pending::<()>().await;
                }
            }
        });
        exec.run(shutdown_rx).await?
    };

    let fault_count = drain.await.context("Fault drain task failed")?;
    log_report(&report, fault_count);

    let clean = report.faulted_cores().next().is_none();
    Ok(clean)
}

fn load_table(cli: &Cli, policy: &ValidationPolicy) -> Result<ScheduleTable> {
    let raw = match &cli.table {
        Some(path) => ScheduleTableBuilder::from_yaml_file(path)?,
        None => {
            let table = builtin::by_name(&cli.builtin)
                .ok_or_else(|| anyhow!("Unknown built-in table '{}'", cli.builtin))?;
            ScheduleTableBuilder::from(table)
        }
    };
    let table = raw
        .build(policy)
        .context("Schedule table failed validation")?;
    Ok(table)
}

fn log_table(table: &ScheduleTable) {
    let meta = table.metadata();
    info!(
        hyperperiod = table.hyperperiod(),
        tasks = table.tasks().len(),
        cores = table.cores().len(),
        instances = table.total_instances(),
        source = ?meta.source,
        utilization_percent = ?meta.utilization_percent,
        "Schedule table loaded"
    );
    for task in table.tasks() {
        info!(
            "  [{name}]  id={id}  period={period}  core={core}  instants={instants:?}",
            name = task.name,
            id = task.id,
            period = task.period,
            core = task.core,
            instants = task.instants,
        );
    }
    if table.is_idle() {
        warn!("No task has scheduled instances; the executive will only tick");
    }
}

fn log_report(report: &ExecutiveReport, fault_count: u64) {
    for core in &report.cores {
        info!(
            core = %core.core,
            state = %core.state,
            ticks = core.stats.ticks_dispatched,
            skipped = core.stats.ticks_skipped,
            overruns = core.stats.overruns,
            invocations = core.stats.total_invocations(),
            panicked = core.panicked,
            "Core summary"
        );
    }
    info!(faults = fault_count, "Run complete");
}
