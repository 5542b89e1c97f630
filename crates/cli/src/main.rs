// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! loom: the orchestrator binary the scheduler's local launcher
//! re-execs, plus a handful of operator-facing commands
//! (`enqueue`/`dequeue`/`status`/`list`) for interacting with the run
//! history directly.
//!
//! `start`/`retry`/`restart` each run the DAG's single shell step
//! (see [`step`]) — `start` and `retry` are launched already-supervised
//! by the scheduler (it owns the attempt record and only needs this
//! process's exit status), while `restart` is dispatched unsupervised
//! and so owns its own attempt lifecycle end to end.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod exit_error;
mod params;
mod step;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use loom_core::{DagRef, RunId};
use loom_storage::FileHistoryStore;

use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "loom", about = "Workflow scheduler orchestrator binary")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a DAG's step for a fresh scheduler-initiated attempt. Exit
    /// status mirrors the step's own.
    Start(RunArgs),
    /// Re-run a previously queued attempt. Exit status mirrors the
    /// step's own.
    Retry(RunArgs),
    /// Run a DAG's step outside of scheduler supervision, owning the
    /// attempt's full lifecycle.
    Restart(RunArgs),
    /// Best-effort stop signal. The step graph's control socket is out
    /// of scope here, so this is a no-op.
    Stop(RunArgs),
    /// Persist a queue item for a DAG, creating a fresh attempt first
    /// unless `--run-id` names an existing one.
    Enqueue(RunArgs),
    /// Remove a queue item by run id.
    Dequeue(RunArgs),
    /// Show a single attempt's recorded state.
    Status(StatusArgs),
    /// List attempts currently running.
    List(ListArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Run id assigned by the dispatcher, when one already exists.
    #[arg(long = "run-id")]
    run_id: Option<String>,

    /// `key=value` parameters forwarded to the step as environment
    /// variables, with `\r`/`\n` escapes reversed.
    #[arg(long = "params", value_parser = params::parse_param)]
    params: Vec<(String, String)>,

    /// Path to the scheduler config, for commands that need the shared
    /// history store location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the DAG's YAML file.
    dag_path: PathBuf,
}

#[derive(Args)]
struct StatusArgs {
    /// Run id to look up.
    run_id: String,

    /// Path to the scheduler config, for the shared history store
    /// location.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ListArgs {
    /// Only list running attempts for this DAG.
    dag_name: Option<String>,

    /// Path to the scheduler config, for the shared history store
    /// location.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("error: {e}");
            exit_code(e.code)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code.clamp(0, 255) as u8)
}

fn run(command: Command) -> Result<i32, ExitError> {
    match command {
        Command::Start(args) | Command::Retry(args) => run_supervised_step(&args),
        Command::Restart(args) => run_restart(&args),
        Command::Stop(_) => {
            // The step graph's control socket is owned by the (out of
            // scope) execution engine; nothing to do here.
            Ok(0)
        }
        Command::Enqueue(args) => run_enqueue(&args),
        Command::Dequeue(args) => run_dequeue(&args),
        Command::Status(args) => run_status(&args),
        Command::List(args) => run_list(&args),
    }
}

fn run_supervised_step(args: &RunArgs) -> Result<i32, ExitError> {
    let status = step::run(&args.dag_path, &args.params)
        .map_err(|e| ExitError::new(1, format!("running step: {e}")))?;
    Ok(status.code().unwrap_or(1))
}

fn history_store(args: &RunArgs) -> Result<FileHistoryStore, ExitError> {
    let config = load_config(args.config.as_deref())?;
    open_history_store(&config)
}

fn open_history_store(config: &loom_scheduler::config::SchedulerConfig) -> Result<FileHistoryStore, ExitError> {
    FileHistoryStore::open(config.history_dir())
        .map_err(|e| ExitError::new(1, format!("opening history store: {e}")))
}

fn load_config(config_flag: Option<&std::path::Path>) -> Result<loom_scheduler::config::SchedulerConfig, ExitError> {
    use loom_scheduler::config::SchedulerConfig;
    let path = SchedulerConfig::resolve_path(config_flag)
        .map_err(|e| ExitError::new(1, format!("resolving config path: {e}")))?;
    SchedulerConfig::load(&path)
        .map_err(|e| ExitError::new(1, format!("loading config {}: {e}", path.display())))
}

fn parse_dag(dag_path: &std::path::Path) -> Result<loom_core::Dag, ExitError> {
    let content = std::fs::read_to_string(dag_path)
        .map_err(|e| ExitError::new(1, format!("reading DAG file {}: {e}", dag_path.display())))?;
    loom_dag::parse_dag(dag_path, &content)
        .map_err(|e| ExitError::new(1, format!("parsing DAG file: {e}")))
}

fn dag_ref(dag: &loom_core::Dag) -> DagRef {
    DagRef { name: dag.name.clone(), proc_group: dag.proc_group(), worker_selector: dag.worker_selector.clone() }
}

fn run_restart(args: &RunArgs) -> Result<i32, ExitError> {
    let history = history_store(args)?;
    let dag = parse_dag(&args.dag_path)?;

    let now_ms = epoch_ms();
    let run_id = history
        .create_attempt(dag_ref(&dag), now_ms)
        .map_err(|e| ExitError::new(1, format!("creating attempt: {e}")))?;
    history
        .record_pid(run_id, std::process::id())
        .map_err(|e| ExitError::new(1, format!("recording pid: {e}")))?;
    history
        .update_status(run_id, loom_core::RunStatus::Running, now_ms)
        .map_err(|e| ExitError::new(1, format!("marking attempt running: {e}")))?;

    let result = step::run(&args.dag_path, &args.params);

    let terminal_ms = epoch_ms();
    let (terminal, code) = match &result {
        Ok(status) if status.success() => (loom_core::RunStatus::Success, 0),
        Ok(status) => (loom_core::RunStatus::Error, status.code().unwrap_or(1)),
        Err(_) => (loom_core::RunStatus::Error, 1),
    };
    if let Err(e) = history.update_status(run_id, terminal, terminal_ms) {
        eprintln!("warning: failed to record terminal status for {run_id}: {e}");
    }
    if let Err(e) = history.close() {
        eprintln!("warning: failed to close history store: {e}");
    }

    result.map(|_| code).map_err(|e| ExitError::new(1, format!("running step: {e}")))
}

fn run_enqueue(args: &RunArgs) -> Result<i32, ExitError> {
    let history = history_store(args)?;
    let dag = parse_dag(&args.dag_path)?;
    let now_ms = epoch_ms();

    let run_id = match &args.run_id {
        Some(s) => s.parse::<RunId>().map_err(|e| ExitError::new(2, format!("invalid --run-id: {e}")))?,
        None => history
            .create_attempt(dag_ref(&dag), now_ms)
            .map_err(|e| ExitError::new(1, format!("creating attempt: {e}")))?,
    };

    let queue_name = dag.queue_name().to_string();
    history
        .enqueue(run_id, dag_ref(&dag), queue_name, now_ms)
        .map_err(|e| ExitError::new(1, format!("enqueuing: {e}")))?;
    println!("{run_id}");
    Ok(0)
}

fn run_dequeue(args: &RunArgs) -> Result<i32, ExitError> {
    let run_id = args
        .run_id
        .as_deref()
        .ok_or_else(|| ExitError::new(2, "dequeue requires --run-id"))?
        .parse::<RunId>()
        .map_err(|e| ExitError::new(2, format!("invalid --run-id: {e}")))?;

    let history = history_store(args)?;
    history.dequeue(run_id).map_err(|e| ExitError::new(1, format!("dequeuing: {e}")))?;
    Ok(0)
}

fn run_status(args: &StatusArgs) -> Result<i32, ExitError> {
    let run_id =
        args.run_id.parse::<RunId>().map_err(|e| ExitError::new(2, format!("invalid run id: {e}")))?;
    let config = load_config(args.config.as_deref())?;
    let history = open_history_store(&config)?;

    match history.find_attempt(run_id) {
        Some(attempt) => {
            println!("run_id:     {}", attempt.run_id);
            println!("dag:        {}", attempt.dag.name);
            println!("status:     {}", attempt.status);
            println!("started_at: {}", attempt.started_at_ms);
            if let Some(finished_at_ms) = attempt.finished_at_ms {
                println!("finished_at: {finished_at_ms}");
            }
            if let Some(pid) = attempt.pid {
                println!("pid:        {pid}");
            }
            Ok(0)
        }
        None => {
            eprintln!("no attempt found for run id {run_id}");
            Ok(1)
        }
    }
}

fn run_list(args: &ListArgs) -> Result<i32, ExitError> {
    let config = load_config(args.config.as_deref())?;
    let history = open_history_store(&config)?;

    let mut running = history.list_running();
    if let Some(dag_name) = &args.dag_name {
        running.retain(|a| a.dag.name.as_str() == dag_name);
    }

    if running.is_empty() {
        println!("no running attempts");
        return Ok(0);
    }
    for attempt in running {
        println!("{}  {}  pid={:?}", attempt.run_id, attempt.dag.name, attempt.pid);
    }
    Ok(0)
}

fn epoch_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
