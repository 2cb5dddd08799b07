//! migrate: the CLI surface over the planner and executor. Commands map
//! directly to the public operations: `plan` annotates, `apply` executes,
//! `abort` signals a running plan, `ledger show`/`events tail` are
//! read-only diagnostics.

mod streaming_log;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use migrate_core::model::{Mode, PlanInput};
use migrate_core::{plan as annotate, EventLog};
use migrate_exec::{Executor, ExecutorConfig, PlanState};
use migrate_persistence::{PgAbortPollingGovernor, PgDriver, PgEventLog, PgLedger, PgPlanStore, PgSerializationLock, PoolProvider};

use streaming_log::StreamingEventLog;

#[derive(Parser, Debug)]
#[command(name = "migrate", about = "Zero-downtime schema-migration planner and executor")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Annotate a PlanInput document, printing the resulting AnnotatedPlan.
    Plan {
        plan_file: PathBuf,
        #[arg(long, value_enum)]
        mode: Option<CliMode>,
    },
    /// Execute an AnnotatedPlan, streaming events to stdout as they occur.
    Apply {
        annotated_plan_file: PathBuf,
        /// Serialization-lock and advisory-lock scope; typically the target database name.
        #[arg(long)]
        scope: String,
        #[arg(long, default_value = "migrate-cli")]
        applied_by: String,
    },
    /// Request that a running plan abort. Idempotent; a no-op on a terminal plan.
    Abort { plan_id: String },
    /// Diagnostic read-only views.
    #[command(subcommand)]
    Ledger(LedgerCommand),
    #[command(subcommand)]
    Events(EventsCommand),
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    Show { plan_id: String },
}

#[derive(Subcommand, Debug)]
enum EventsCommand {
    Tail {
        plan_id: String,
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliMode {
    Chaos,
    Ci,
    Strict,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Chaos => Mode::Chaos,
            CliMode::Ci => Mode::Ci,
            CliMode::Strict => Mode::Strict,
        }
    }
}

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    migrate_persistence::init_dotenv();

    match Cli::parse().cmd {
        Command::Plan { plan_file, mode } => run_plan(plan_file, mode),
        Command::Apply { annotated_plan_file, scope, applied_by } => run_apply(annotated_plan_file, scope, applied_by),
        Command::Abort { plan_id } => run_abort(plan_id),
        Command::Ledger(LedgerCommand::Show { plan_id }) => run_ledger_show(plan_id),
        Command::Events(EventsCommand::Tail { plan_id, since }) => run_events_tail(plan_id, since),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("parsing {}: {e}", path.display()))
}

fn run_plan(plan_file: PathBuf, mode: Option<CliMode>) -> ExitCode {
    let mut input: PlanInput = match read_json(&plan_file) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    if let Some(mode) = mode {
        input.mode = mode.into();
    }

    match annotate(input) {
        Ok(annotated) => {
            println!("{}", serde_json::to_string_pretty(&annotated).expect("AnnotatedPlan serializes"));
            ExitCode::from(0)
        }
        Err(rejection) => {
            eprintln!("{}", serde_json::to_string_pretty(&rejection).expect("PlanRejection serializes"));
            ExitCode::from(2)
        }
    }
}

fn build_pool_or_exit() -> Result<migrate_persistence::PgPool, ExitCode> {
    migrate_persistence::build_dev_pool_from_env().map_err(|e| {
        eprintln!("error: could not connect to database: {e}");
        ExitCode::from(1)
    })
}

fn run_apply(annotated_plan_file: PathBuf, scope: String, applied_by: String) -> ExitCode {
    let annotated = match read_json(&annotated_plan_file) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let pool = match build_pool_or_exit() {
        Ok(p) => p,
        Err(code) => return code,
    };

    let plan_store = PgPlanStore::new(PoolProvider { pool: pool.clone() });
    let _ = plan_store.start(&plan_id_of(&annotated));

    let mut driver = PgDriver::new(PoolProvider { pool: pool.clone() });
    let mut ledger = PgLedger::new(PoolProvider { pool: pool.clone() });
    match migrate_exec::reconcile_pending(&mut driver, &mut ledger, &annotated) {
        Ok(0) => {}
        Ok(n) => tracing::info!(reconciled = n, "resolved pending ledger rows left by a prior run"),
        Err(e) => {
            eprintln!("error: reconciliation failed: {e}");
            return ExitCode::from(1);
        }
    }

    let config = ExecutorConfig { applied_by, ..ExecutorConfig::default() };
    let mut executor = Executor::new(
        driver,
        ledger,
        StreamingEventLog::new(PgEventLog::new(PoolProvider { pool: pool.clone() })),
        PgAbortPollingGovernor::new(PoolProvider { pool: pool.clone() }, plan_id_of(&annotated)),
        PgSerializationLock::new(pool.clone()),
        config,
    );

    match executor.execute(&annotated, &scope) {
        Ok(result) => {
            let _ = plan_store.terminate(&plan_id_of(&annotated), terminal_state_tag(result.terminal_state));
            match result.terminal_state {
                PlanState::Completed => ExitCode::from(0),
                PlanState::Failed => ExitCode::from(1),
                // A governor pause-cap/abort directive and an external abort
                // request both land the plan in `Aborted`; the failure kind
                // recorded by `record_failure` is what tells them apart.
                PlanState::Aborted if result.first_failure.as_ref().map(|f| f.kind.as_str()) == Some("GovernorAbort") => ExitCode::from(5),
                PlanState::Aborted => ExitCode::from(3),
                PlanState::Annotated | PlanState::Running => {
                    eprintln!("error: executor returned a non-terminal state");
                    ExitCode::from(1)
                }
            }
        }
        Err(migrate_exec::ExecError::LockUnavailable(scope)) => {
            eprintln!("error: serialization lock unavailable for scope {scope}");
            ExitCode::from(4)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

fn plan_id_of(annotated: &migrate_core::model::AnnotatedPlan) -> String {
    annotated.plan_id.clone()
}

fn terminal_state_tag(state: PlanState) -> &'static str {
    match state {
        PlanState::Completed => "completed",
        PlanState::Failed => "failed",
        PlanState::Aborted => "aborted",
        PlanState::Annotated | PlanState::Running => "running",
    }
}

fn run_abort(plan_id: String) -> ExitCode {
    let pool = match build_pool_or_exit() {
        Ok(p) => p,
        Err(code) => return code,
    };
    let plan_store = PgPlanStore::new(PoolProvider { pool });
    match plan_store.request_abort(&plan_id) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

fn run_ledger_show(plan_id: String) -> ExitCode {
    let pool = match build_pool_or_exit() {
        Ok(p) => p,
        Err(code) => return code,
    };
    let ledger = PgLedger::new(PoolProvider { pool });
    for entry in ledger.list_for_plan(&plan_id) {
        println!("{}", serde_json::to_string(&entry).expect("LedgerEntry serializes"));
    }
    ExitCode::from(0)
}

fn run_events_tail(plan_id: String, since: u64) -> ExitCode {
    let pool = match build_pool_or_exit() {
        Ok(p) => p,
        Err(code) => return code,
    };
    let log = PgEventLog::new(PoolProvider { pool });
    for event in log.tail(&plan_id, since) {
        println!("{}", serde_json::to_string(&event).expect("Event serializes"));
    }
    ExitCode::from(0)
}
