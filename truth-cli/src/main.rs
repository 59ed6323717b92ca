// truth-cli/src/main.rs
// ============================================================================
// Module: Truth Pipeline CLI Entry Point
// Description: Command dispatcher for the extractor, composer, releaser,
//              and watchdog stages (§6 CLI surface).
// Purpose: Give an operator a way to drive each pipeline stage by hand
//          without standing up a queue-polling worker.
// Dependencies: clap, truth-cli, truth-config, truth-core, truth-llm,
//              truth-pipeline, truth-queue, truth-watchdog.
// ============================================================================

//! ## Overview
//! Each subcommand loads a [`TruthConfig`], builds the shared collaborators
//! via [`truth_cli::runtime::Runtime`], and drives exactly one stage
//! operation. Exit codes follow §6: `0` on success, non-zero on a hard-gate
//! failure (a release gate rejection, a rollback refusal, or a watchdog
//! report containing a CRITICAL check) with a one-line reason printed to
//! stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use time::OffsetDateTime;
use truth_cli::runtime::Runtime;
use truth_cli::t;
use truth_config::EnvOverrides;
use truth_config::ProcessEnv as ConfigProcessEnv;
use truth_config::TruthConfig;
use truth_core::EvidenceId;
use truth_core::OutcomeStatus;
use truth_core::ReleaseRepository;
use truth_core::RuleId;
use truth_core::Version;
use truth_llm::AgentType;
use truth_llm::ProcessEnv as LlmProcessEnv;
use truth_llm::resolve_embedding_endpoint;
use truth_llm::resolve_extraction_endpoint;
use truth_pipeline::Composer;
use truth_pipeline::Extractor;
use truth_pipeline::QUEUE_COMPOSE;
use truth_pipeline::QUEUE_EXTRACT;
use truth_pipeline::QUEUE_RELEASE;
use truth_pipeline::QUEUE_REVIEW;
use truth_pipeline::Releaser;
use truth_pipeline::ReleaserError;
use truth_pipeline::StaticSourceAuthorityResolver;
use truth_queue::generate_job_id;
use truth_watchdog::CheckStatus;
use truth_watchdog::ProviderTarget;
use truth_watchdog::Watchdog;
use truth_watchdog::WatchdogTargets;

/// Identifier used as the circuit-breaker key and `AgentRun.provider_id`
/// for every stage (§1 Non-goals: Ollama is the sole supported family).
const PROVIDER_ID: &str = "ollama";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "truth-pipeline-cli",
    disable_help_subcommand = true,
    disable_version_flag = true,
    arg_required_else_help = true
)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Path to `truth-pipeline.toml` (defaults to `TRUTH_PIPELINE_CONFIG`
    /// or `truth-pipeline.toml` in the working directory).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extractor (C5) operations.
    Extractor {
        /// Selected extractor subcommand.
        #[command(subcommand)]
        command: ExtractorCommand,
    },
    /// Composer (C6) operations.
    Composer {
        /// Selected composer subcommand.
        #[command(subcommand)]
        command: ComposerCommand,
    },
    /// Releaser (C8) operations.
    Releaser {
        /// Selected releaser subcommand.
        #[command(subcommand)]
        command: ReleaserCommand,
    },
    /// Watchdog (C10) operations.
    Watchdog {
        /// Selected watchdog subcommand.
        #[command(subcommand)]
        command: WatchdogCommand,
    },
}

/// Extractor subcommands.
#[derive(Subcommand, Debug)]
enum ExtractorCommand {
    /// Run the extractor on a single Evidence row.
    Run(ExtractorRunCommand),
    /// Run the extractor over every Evidence row not yet linked to a
    /// CandidateFact, up to `--limit`.
    Batch(ExtractorBatchCommand),
}

/// Arguments for `extractor run`.
#[derive(Args, Debug)]
struct ExtractorRunCommand {
    /// Evidence id to extract from.
    #[arg(long, value_name = "ID")]
    evidence_id: String,
}

/// Arguments for `extractor batch`.
#[derive(Args, Debug)]
struct ExtractorBatchCommand {
    /// Maximum number of Evidence rows to process.
    #[arg(long, default_value_t = 50)]
    limit: usize,
}

/// Composer subcommands.
#[derive(Subcommand, Debug)]
enum ComposerCommand {
    /// Run the composer over every ungrouped CandidateFact domain.
    Batch,
}

/// Releaser subcommands.
#[derive(Subcommand, Debug)]
enum ReleaserCommand {
    /// Cut a Release from the given Rules.
    Release(ReleaserReleaseCommand),
    /// Roll back the current latest Release.
    Rollback(ReleaserRollbackCommand),
}

/// Arguments for `releaser release`.
#[derive(Args, Debug)]
struct ReleaserReleaseCommand {
    /// Comma-separated Rule ids to release.
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    rules: Vec<String>,
}

/// Arguments for `releaser rollback`.
#[derive(Args, Debug)]
struct ReleaserRollbackCommand {
    /// Version of the release expected to be the current latest
    /// (major.minor.patch); refused if it no longer is.
    #[arg(long, value_name = "SEMVER")]
    version: String,
    /// Report what would happen without mutating any state.
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
}

/// Watchdog subcommands.
#[derive(Subcommand, Debug)]
enum WatchdogCommand {
    /// Run every check, persist deduplicated alerts, and notify on
    /// CRITICAL results.
    Run(WatchdogTargetArgs),
    /// Run every check and print the report without persisting or
    /// notifying anything.
    Audit(WatchdogTargetArgs),
}

/// Shared target arguments for `watchdog run`/`watchdog audit`.
#[derive(Args, Debug, Default)]
struct WatchdogTargetArgs {
    /// Source ids to check for staleness and scraper failure rate.
    /// Repeatable; defaults to none.
    #[arg(long = "source", value_name = "ID")]
    sources: Vec<String>,
    /// Worker ids to check for drainer stall. Repeatable; defaults to
    /// none.
    #[arg(long = "worker", value_name = "ID")]
    workers: Vec<String>,
    /// Queue names to check for backlog depth. Repeatable; defaults to
    /// the four pipeline queues.
    #[arg(long = "queue", value_name = "NAME")]
    queues: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self { message }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version)).map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Extractor { command } => match command {
            ExtractorCommand::Run(args) => command_extractor_run(&config, &args),
            ExtractorCommand::Batch(args) => command_extractor_batch(&config, &args),
        },
        Commands::Composer { command } => match command {
            ComposerCommand::Batch => command_composer_batch(&config),
        },
        Commands::Releaser { command } => match command {
            ReleaserCommand::Release(args) => command_releaser_release(&config, &args),
            ReleaserCommand::Rollback(args) => command_releaser_rollback(&config, &args),
        },
        Commands::Watchdog { command } => match command {
            WatchdogCommand::Run(args) => command_watchdog_run(&config, &args),
            WatchdogCommand::Audit(args) => command_watchdog_audit(&config, &args),
        },
    }
}

/// Loads configuration, wrapping failures as a localized [`CliError`].
fn load_config(path: Option<&Path>) -> CliResult<TruthConfig> {
    TruthConfig::load(path).map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Builds the shared runtime collaborators, wrapping failures as a
/// localized [`CliError`].
fn build_runtime(config: &TruthConfig) -> CliResult<Runtime> {
    Runtime::build(config).map_err(|err| CliError::new(t!("runtime.build_failed", error = err)))
}

// ============================================================================
// SECTION: Extractor Commands
// ============================================================================

/// Executes `extractor run`.
fn command_extractor_run(config: &TruthConfig, args: &ExtractorRunCommand) -> CliResult<ExitCode> {
    let runtime = build_runtime(config)?;
    let extractor = build_extractor(&runtime);

    let evidence_id = EvidenceId::new(args.evidence_id.clone());
    let run_id = truth_core::RunId::new(format!("run-extract-{}", evidence_id.as_str()));
    let job_id = generate_job_id();

    match extractor.run(&evidence_id, run_id, job_id) {
        Ok(outcome) => {
            write_stdout_line(&t!(
                "extractor.run.ok",
                evidence_id = evidence_id.as_str(),
                status = outcome_status_label(outcome.status),
                count = outcome.items_produced,
            ))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            write_stderr_line(&t!("extractor.run.failed", error = err)).map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes `extractor batch`.
fn command_extractor_batch(config: &TruthConfig, args: &ExtractorBatchCommand) -> CliResult<ExitCode> {
    let runtime = build_runtime(config)?;
    let extractor = build_extractor(&runtime);

    match extractor.run_batch(args.limit) {
        Ok(outcome) => {
            write_stdout_line(&t!("extractor.batch.summary", succeeded = outcome.succeeded, failed = outcome.failed))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            for error in &outcome.errors {
                write_stdout_line(&t!("extractor.batch.error_line", error = error)).map_err(|err| CliError::new(output_error("stdout", &err)))?;
            }
            Ok(if outcome.failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Err(err) => {
            write_stderr_line(&t!("extractor.batch.failed", error = err)).map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Renders an [`OutcomeStatus`] as a stable lowercase label.
const fn outcome_status_label(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::SuccessApplied => "success_applied",
        OutcomeStatus::SuccessNoChange => "success_no_change",
        OutcomeStatus::Failure => "failure",
        OutcomeStatus::Partial => "partial",
    }
}

/// Builds an [`Extractor`] from the shared runtime.
fn build_extractor(runtime: &Runtime) -> Extractor {
    Extractor::new(
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.llm.clone(),
        runtime.sleeper.clone(),
        runtime.endpoint.clone(),
        runtime.api_key.clone(),
        runtime.model.clone(),
        PROVIDER_ID,
    )
}

// ============================================================================
// SECTION: Composer Commands
// ============================================================================

/// Executes `composer batch`.
fn command_composer_batch(config: &TruthConfig) -> CliResult<ExitCode> {
    let runtime = build_runtime(config)?;
    let authority = Arc::new(StaticSourceAuthorityResolver::new());
    let composer = Composer::new(
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        authority,
        runtime.llm.clone(),
        runtime.sleeper.clone(),
        runtime.endpoint.clone(),
        runtime.api_key.clone(),
        runtime.model.clone(),
        PROVIDER_ID,
    );

    match composer.run_batch() {
        Ok(outcome) => {
            write_stdout_line(&t!("composer.batch.summary", succeeded = outcome.succeeded, failed = outcome.failed))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            for error in &outcome.errors {
                write_stdout_line(&t!("composer.batch.error_line", error = error)).map_err(|err| CliError::new(output_error("stdout", &err)))?;
            }
            Ok(if outcome.failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Err(err) => {
            write_stderr_line(&t!("composer.batch.failed", error = err)).map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// SECTION: Releaser Commands
// ============================================================================

/// Executes `releaser release`.
fn command_releaser_release(config: &TruthConfig, args: &ReleaserReleaseCommand) -> CliResult<ExitCode> {
    let runtime = build_runtime(config)?;
    let releaser = build_releaser(&runtime);

    let rule_ids: Vec<RuleId> = args.rules.iter().map(|id| RuleId::new(id.clone())).collect();
    let run_id = truth_core::RunId::new("run-release-cli".to_string());
    let job_id = generate_job_id();

    match releaser.release(&rule_ids, run_id, job_id) {
        Ok(release) => {
            write_stdout_line(&t!("releaser.release.ok", release_id = release.id.as_str(), version = release.version))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            write_stderr_line(&t!("releaser.release.failed", error = err)).map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes `releaser rollback`.
fn command_releaser_rollback(config: &TruthConfig, args: &ReleaserRollbackCommand) -> CliResult<ExitCode> {
    let Some(target_version) = parse_version(&args.version) else {
        write_stderr_line(&t!("releaser.rollback.version_invalid", version = &args.version))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(ExitCode::FAILURE);
    };

    let runtime = build_runtime(config)?;
    let releaser = build_releaser(&runtime);

    let Some(latest) = runtime.store.latest().map_err(|err| CliError::new(err.to_string()))? else {
        write_stderr_line(&t!("releaser.rollback.no_releases")).map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(ExitCode::FAILURE);
    };

    if latest.version != target_version {
        write_stderr_line(&t!(
            "releaser.rollback.not_latest",
            release_id = latest.id.as_str(),
            version = latest.version,
        ))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(ExitCode::FAILURE);
    }

    if args.dry_run {
        let previous = runtime.store.previous().map_err(|err| CliError::new(err.to_string()))?;
        let previous_label = previous.map_or_else(|| t!("releaser.rollback.dry_run.no_previous"), |release| release.id.as_str().to_string());
        write_stdout_line(&t!("releaser.rollback.dry_run", release_id = latest.id.as_str(), version = latest.version, previous = previous_label))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    match releaser.rollback(&latest.id) {
        Ok(_restored) => {
            write_stdout_line(&t!("releaser.rollback.ok", release_id = latest.id.as_str(), version = latest.version))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            write_stderr_line(&t!("releaser.rollback.failed", error = err)).map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Builds a [`Releaser`] from the shared runtime.
fn build_releaser(runtime: &Runtime) -> Releaser {
    Releaser::new(
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.queue.clone(),
        runtime.llm.clone(),
        runtime.endpoint.clone(),
        runtime.api_key.clone(),
        runtime.model.clone(),
        PROVIDER_ID,
    )
}

/// Parses a strict `major.minor.patch` version string.
fn parse_version(raw: &str) -> Option<Version> {
    let mut parts = raw.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Version { major, minor, patch })
}

// ============================================================================
// SECTION: Watchdog Commands
// ============================================================================

/// Executes `watchdog run`.
fn command_watchdog_run(config: &TruthConfig, args: &WatchdogTargetArgs) -> CliResult<ExitCode> {
    let runtime = build_runtime(config)?;
    let notifier = Runtime::notifier(config).map_err(|err| CliError::new(t!("watchdog.notifier.failed", error = err)))?;
    let watchdog = build_watchdog(&runtime, notifier, args, config);

    match watchdog.run_cadence(OffsetDateTime::now_utc()) {
        Ok(report) => print_watchdog_report(&report),
        Err(err) => {
            write_stderr_line(&t!("watchdog.run.failed", error = err)).map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes `watchdog audit`.
fn command_watchdog_audit(config: &TruthConfig, args: &WatchdogTargetArgs) -> CliResult<ExitCode> {
    let runtime = build_runtime(config)?;
    let notifier = Arc::new(truth_watchdog::LogNotifier);
    let watchdog = build_watchdog(&runtime, notifier, args, config);

    match watchdog.audit(OffsetDateTime::now_utc()) {
        Ok(report) => print_watchdog_report(&report),
        Err(err) => {
            write_stderr_line(&t!("watchdog.audit.failed", error = err)).map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Builds a [`Watchdog`] from the shared runtime, the resolved targets, and
/// the §6 `WATCHDOG_*`/`ALERT_DEDUP_WINDOW_MINUTES` environment overrides.
fn build_watchdog(runtime: &Runtime, notifier: Arc<dyn truth_watchdog::Notifier>, args: &WatchdogTargetArgs, config: &TruthConfig) -> Watchdog {
    let overrides = EnvOverrides::resolve(&ConfigProcessEnv);
    let thresholds = config.resolved_watchdog_thresholds(&overrides);

    let queue_names = if args.queues.is_empty() {
        vec![QUEUE_EXTRACT.to_string(), QUEUE_COMPOSE.to_string(), QUEUE_REVIEW.to_string(), QUEUE_RELEASE.to_string()]
    } else {
        args.queues.clone()
    };

    let agent_types = [AgentType::Extractor, AgentType::Composer, AgentType::Reviewer, AgentType::Arbiter, AgentType::Releaser]
        .iter()
        .map(|agent_type| agent_type.as_str().to_string())
        .collect();

    let extraction = resolve_extraction_endpoint(&LlmProcessEnv);
    let embedding = resolve_embedding_endpoint(&LlmProcessEnv);
    let llm_providers = vec![
        ProviderTarget { provider_id: "extraction".to_string(), endpoint: extraction.endpoint, api_key: extraction.api_key },
        ProviderTarget { provider_id: "embedding".to_string(), endpoint: embedding.endpoint, api_key: embedding.api_key },
    ];

    let targets = WatchdogTargets {
        sources: args.sources.iter().cloned().map(truth_core::SourceId::new).collect(),
        agent_types,
        worker_ids: args.workers.clone(),
        queue_names,
        llm_providers,
    };

    Watchdog::new(
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.store.clone(),
        runtime.queue.clone(),
        runtime.store.clone(),
        notifier,
        targets,
        thresholds,
    )
}

/// Prints a watchdog report and returns its exit code (§6: non-zero with a
/// one-line reason on any CRITICAL check).
fn print_watchdog_report(report: &truth_watchdog::WatchdogReport) -> CliResult<ExitCode> {
    write_stdout_line(&t!("watchdog.report.header", count = report.results.len())).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    for result in &report.results {
        let status = match result.status {
            CheckStatus::Healthy => "HEALTHY",
            CheckStatus::Warning => "WARNING",
            CheckStatus::Critical => "CRITICAL",
        };
        write_stdout_line(&t!(
            "watchdog.report.line",
            status = status,
            alert_type = result.alert_type,
            entity_id = &result.entity_id,
            message = &result.message,
        ))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }

    if report.has_critical() {
        let critical_count = report.results.iter().filter(|result| result.status == CheckStatus::Critical).count();
        write_stderr_line(&t!("watchdog.report.critical_summary", count = critical_count)).map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::OutcomeStatus;
    use super::Version;
    use super::outcome_status_label;
    use super::parse_version;

    #[test]
    fn parse_version_accepts_strict_triple() {
        assert_eq!(parse_version("1.2.3"), Some(Version { major: 1, minor: 2, patch: 3 }));
    }

    #[test]
    fn parse_version_rejects_missing_components() {
        assert_eq!(parse_version("1.2"), None);
    }

    #[test]
    fn parse_version_rejects_extra_components() {
        assert_eq!(parse_version("1.2.3.4"), None);
    }

    #[test]
    fn parse_version_rejects_non_numeric_components() {
        assert_eq!(parse_version("1.x.3"), None);
    }

    #[test]
    fn outcome_status_label_covers_every_variant() {
        assert_eq!(outcome_status_label(OutcomeStatus::SuccessApplied), "success_applied");
        assert_eq!(outcome_status_label(OutcomeStatus::SuccessNoChange), "success_no_change");
        assert_eq!(outcome_status_label(OutcomeStatus::Failure), "failure");
        assert_eq!(outcome_status_label(OutcomeStatus::Partial), "partial");
    }
}
