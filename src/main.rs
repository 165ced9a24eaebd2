// src/main.rs
//
// =============================================================================
// SAFEBOX: COMMANDER & ENTRY POINT
// =============================================================================
//
// The thin CLI driver spec §6 describes as the core's external interface:
// `submit`, `state`, `release`, each printing `JobResult`/state-snapshot JSON
// and exiting with the code spec §6 assigns. Everything else — the colored
// dashboard, the web front end, Python packaging — is out of scope (spec §1)
// and lives, if anywhere, downstream of this binary.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use safebox::coordinator::exit_code;
use safebox::{Config, JobCoordinator, JobSpec, ResourceVector};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "safebox",
    version = "0.1.0",
    about = "Deadlock-avoiding admission control, cgroup-v2 resource limits, and namespace/seccomp isolation for running untrusted executables"
)]
struct Cli {
    /// Comma-separated resource totals for this host, e.g. "100,8192" for
    /// cpu_percent,memory_mib. Fixes arity for the lifetime of the process.
    #[arg(long, global = true, default_value = "100,8192")]
    totals: String,

    /// Comma-separated names for each resource in `--totals`, in the same
    /// order; arity must match or the admission engine refuses to
    /// initialize.
    #[arg(long = "resource-names", global = true, default_value = "cpu_percent,memory_mib")]
    resource_names: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job: run `exec` under enforced limits, inside the sandbox,
    /// only if doing so keeps the host in a safe state.
    Submit {
        #[arg(long)]
        exec: PathBuf,

        /// Space-separated argv passed to the target (the exec path is
        /// argv[0] and is not repeated here).
        #[arg(long, default_value = "")]
        args: String,

        /// Declared maximum resource vector, e.g. "50,1024".
        #[arg(long)]
        max: String,

        /// Initial allocation requested at submit time, e.g. "10,256".
        #[arg(long)]
        alloc: String,

        /// cgroup `cpu.max` quota in microseconds per period; omit for
        /// unlimited.
        #[arg(long = "limit-cpu")]
        limit_cpu: Option<u64>,

        /// `cpu.max` period in microseconds.
        #[arg(long = "cpu-period", default_value_t = 100_000)]
        cpu_period: u64,

        /// cgroup `memory.max` in bytes; omit for unlimited.
        #[arg(long = "limit-mem")]
        limit_mem: Option<u64>,

        /// Wall-clock timeout in seconds before escalating SIGTERM/SIGKILL.
        #[arg(long)]
        timeout: Option<u64>,

        /// Grace period in seconds between `SIGTERM` and the follow-up
        /// `SIGKILL` once `--timeout` elapses. Ignored without `--timeout`.
        #[arg(long = "grace-period", default_value_t = 5)]
        grace_period: u64,

        /// Omit CLONE_NEWNET (for WSL-style hosts where it is unavailable).
        #[arg(long = "no-net")]
        no_net: bool,

        /// Append the job result to a JSON-lines audit log at this path.
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },

    /// Print a JSON snapshot of the SafetyEngine's current state. Only
    /// meaningful within the lifetime of a single process, since the
    /// JobTable is in-memory and ephemeral (spec §6: "Persisted state: none").
    State,

    /// Release a job's cgroup and return its allocation. Present for CLI
    /// completeness against spec §6; a single-shot `submit` already performs
    /// release as its final step, so this is only reachable for a job this
    /// process still holds a handle to.
    Release {
        job_id: u64,
    },
}

fn parse_vector(raw: &str) -> Result<ResourceVector> {
    let values: Result<Vec<u64>, _> = raw.split(',').map(|s| s.trim().parse::<u64>()).collect();
    let values = values.with_context(|| format!("invalid resource vector {raw:?}"))?;
    Ok(ResourceVector::new(values))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("safebox: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    if !cfg!(target_os = "linux") {
        return Err(anyhow!(
            "safebox is Linux-only (cgroup-v2 and namespaces have no equivalent elsewhere)"
        ));
    }

    let cli = Cli::parse();
    let totals = parse_vector(&cli.totals)?;
    let resource_names: Vec<String> = cli.resource_names.split(',').map(|s| s.trim().to_string()).collect();
    let mut config = Config::from_env();
    if let Commands::Submit { no_net: true, .. } = &cli.command {
        config.allow_newnet = false;
    }
    let coordinator =
        JobCoordinator::new(config, totals, resource_names).context("initializing admission engine")?;

    let result = run_command(&coordinator, cli.command);
    // Single-shot CLI process: whatever this command left open (normally
    // nothing — `submit` tears its own job down) is destroyed here rather
    // than leaked to process exit, per spec §4.2's shutdown guarantee.
    coordinator.shutdown();
    result
}

fn run_command(coordinator: &JobCoordinator, command: Commands) -> Result<i32> {
    match command {
        Commands::Submit {
            exec,
            args,
            max,
            alloc,
            limit_cpu,
            cpu_period,
            limit_mem,
            timeout,
            grace_period,
            no_net: _,
            audit_log,
        } => {
            let argv: Vec<String> = args.split_whitespace().map(str::to_string).collect();
            let spec = JobSpec {
                job_id: None,
                name: exec.display().to_string(),
                exec_path: exec,
                argv,
                max: parse_vector(&max)?,
                initial_alloc: parse_vector(&alloc)?,
                memory_max_bytes: limit_mem,
                cpu_quota_us: limit_cpu,
                cpu_period_us: cpu_period,
                timeout: timeout.map(Duration::from_secs),
                grace_period: Duration::from_secs(grace_period),
            };

            let result = coordinator.submit(spec);

            if let Some(path) = audit_log {
                let log = safebox::audit::AuditLog::new(path);
                if let Err(e) = log.append(&result) {
                    log::warn!("audit log append failed: {e}");
                }
            }

            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(exit_code_for(&result))
        }
        Commands::State => {
            // A freshly constructed coordinator has no live jobs outside this
            // process; `state` is meant to be called against the same
            // long-lived process that performed the submits (the HTTP/daemon
            // front end out of scope here). Printed as-is for CLI parity with
            // spec §6.
            let snapshot = coordinator.state_snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(exit_code::SUCCESS)
        }
        Commands::Release { job_id } => match coordinator.release(job_id) {
            Ok(()) => {
                println!("{{\"job_id\":{job_id},\"released\":true}}");
                Ok(exit_code::SUCCESS)
            }
            Err(e) => {
                eprintln!("safebox: release {job_id}: {e}");
                Ok(exit_code::ADMISSION_REJECTED)
            }
        },
    }
}

fn exit_code_for(result: &safebox::JobResult) -> i32 {
    use safebox::coordinator::FailureStage;
    use safebox::RuntimeError;

    if !result.admitted {
        return match result.failure_stage {
            Some(FailureStage::Cgroup) => exit_code::CGROUP_SETUP_FAILED,
            Some(FailureStage::Spawn) => exit_code::SPAWN_FAILED,
            Some(FailureStage::Admission) | None => exit_code::ADMISSION_REJECTED,
        };
    }
    let Some(exit) = result.exit.as_ref() else {
        return exit_code::SUCCESS;
    };
    if exit.kind == "setup_failed" {
        return exit_code::CHILD_SETUP_FAILURE;
    }
    match runtime_error_from_exit(exit) {
        None => exit_code::SUCCESS,
        Some(RuntimeError::ExitedNonZero(code)) => code,
        Some(RuntimeError::KilledBySeccomp) => exit_code::CHILD_KILLED_BY_SECCOMP,
        Some(RuntimeError::OomKilled) => 128 + libc::SIGKILL,
        Some(RuntimeError::SignaledBy(signo)) => 128 + signo,
    }
}

/// Reconstructs the typed `RuntimeError` classification from the
/// JSON-crossed `ExitInfo`, mirroring `coordinator::classify_runtime`'s
/// kind/code split on the other side of the process boundary.
fn runtime_error_from_exit(exit: &safebox::coordinator::ExitInfo) -> Option<safebox::RuntimeError> {
    use safebox::RuntimeError;
    match exit.kind.as_str() {
        "exited" if exit.code == 0 => None,
        "exited" => Some(RuntimeError::ExitedNonZero(exit.code)),
        "signaled" if exit.code == libc::SIGSYS => Some(RuntimeError::KilledBySeccomp),
        "signaled" => Some(RuntimeError::SignaledBy(exit.code)),
        _ => None,
    }
}
