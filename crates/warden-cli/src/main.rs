//! Warden command-line interface.
//!
//! `warden hook --event <kind>` is the entry point the host agent runtime
//! invokes around every session start, prompt submission, tool proposal,
//! and tool result. It reads one JSON event on stdin and answers through
//! the exit code: 0 allows, 1 blocks a prompt, 2 blocks a tool call, with
//! the reason on stderr. `check` and `status` serve the wrapper and
//! health-check scripts that babysit the agent.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use warden_audit::{read_last_record_time, AuditLogger, FileStorage, StatusReport};
use warden_core::{EventKind, WardenConfig};
use warden_engine::Dispatcher;
use warden_rules::{RuleSet, Scanner};

#[derive(Parser, Debug)]
#[command(
    name = "warden",
    version,
    about = "Governance layer for autonomous coding agents"
)]
struct Cli {
    /// Path to warden.yaml. Defaults apply when unset.
    #[arg(long, env = "WARDEN_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host hook entry point: reads one event JSON on stdin and exits
    /// 0 (allow), 1 (prompt blocked), or 2 (tool blocked).
    Hook {
        /// Hook event name, in the host runtime's spelling.
        #[arg(long, value_enum)]
        event: HookEvent,
    },

    /// Validate configuration and rule set.
    Check,

    /// Print a JSON liveness report for external health-check scripts.
    Status,

    /// Scan text from stdin for PII and print the findings.
    Scan,
}

/// Hook event names as the host runtime sends them.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum HookEvent {
    #[value(name = "SessionStart")]
    SessionStart,
    #[value(name = "UserPromptSubmit")]
    UserPromptSubmit,
    #[value(name = "PreToolUse")]
    PreToolUse,
    #[value(name = "PostToolUse")]
    PostToolUse,
}

impl HookEvent {
    fn kind(self) -> EventKind {
        match self {
            Self::SessionStart => EventKind::SessionStarted,
            Self::UserPromptSubmit => EventKind::PromptSubmitted,
            Self::PreToolUse => EventKind::ToolUseProposed,
            Self::PostToolUse => EventKind::ToolResultReported,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr; stdout and the exit code belong to the
    // host protocol.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Hook { event } => run_hook(cli.config.as_deref(), event).await,
        Command::Check => run_check(cli.config.as_deref()),
        Command::Status => run_status(cli.config.as_deref()),
        Command::Scan => run_scan(cli.config.as_deref()),
    }
}

fn build_dispatcher(config_path: Option<&Path>) -> anyhow::Result<Dispatcher> {
    let config = WardenConfig::load_or_default(config_path).context("loading configuration")?;
    let rules = Arc::new(RuleSet::resolve(&config.rules).context("loading rule set")?);
    let logger = AuditLogger::new(&config.audit).context("opening audit log")?;
    let agent_version = std::env::var("WARDEN_AGENT_VERSION").ok();
    Ok(Dispatcher::new(&config, rules, logger).with_agent_version(agent_version))
}

/// Exit code when an event must be refused before the pipeline could run.
fn block_code(kind: EventKind) -> i32 {
    match kind {
        EventKind::ToolUseProposed => 2,
        _ => 1,
    }
}

async fn run_hook(config_path: Option<&Path>, event: HookEvent) -> anyhow::Result<()> {
    let kind = event.kind();

    // A hook that cannot assemble a validated pipeline must not serve
    // events; refuse with the block code rather than a generic failure.
    let dispatcher = match build_dispatcher(config_path) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            eprintln!("warden: cannot start governance pipeline: {err:#}");
            std::process::exit(block_code(kind));
        }
    };

    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("warden: cannot read host event: {err}");
        std::process::exit(block_code(kind));
    }

    let response = dispatcher.dispatch_raw(kind, &input).await;
    if response.verdict.is_block() {
        eprintln!("warden: blocked: {}", response.verdict.reason);
    } else if kind == EventKind::SessionStarted {
        eprintln!("warden: governance active, session audited");
    }
    std::process::exit(response.exit_code());
}

fn run_check(config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut failures = 0usize;

    let config = match WardenConfig::load_or_default(config_path) {
        Ok(config) => {
            match config_path {
                Some(path) => println!("✔ Configuration loaded: {}", path.display()),
                None => println!("✔ No configuration file; using defaults"),
            }
            Some(config)
        }
        Err(err) => {
            println!("✖ Configuration invalid: {err}");
            failures += 1;
            None
        }
    };

    if let Some(config) = &config {
        match RuleSet::resolve(&config.rules) {
            Ok(rules) => println!(
                "✔ Rule set valid: {} rules ({} PII, {} prompt, {} tool)",
                rules.len(),
                rules.pii_rules().len(),
                rules.prompt_rules().len(),
                rules.tool_rules().len()
            ),
            Err(err) => {
                println!("✖ Rule set invalid: {err}");
                failures += 1;
            }
        }

        if config.audit.enabled {
            match FileStorage::new(config.audit.log_path()) {
                Ok(storage) => println!("✔ Audit log writable: {}", storage.path().display()),
                Err(err) => {
                    println!("✖ Audit log unwritable: {err}");
                    failures += 1;
                }
            }
        } else {
            println!("  (note) audit logging is disabled in configuration");
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} check(s) failed");
    }
    Ok(())
}

fn run_status(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = WardenConfig::load_or_default(config_path)?;
    let audit_log = config.audit.log_path();
    let last_record_at = read_last_record_time(&audit_log)?;

    let (rules_ok, rule_count, rules_error) = match RuleSet::resolve(&config.rules) {
        Ok(rules) => (true, rules.len(), None),
        Err(err) => (false, 0, Some(err.to_string())),
    };

    let report = StatusReport {
        rules_ok,
        rule_count,
        rules_error,
        audit_log,
        last_record_at,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_scan(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = WardenConfig::load_or_default(config_path)?;
    let rules = Arc::new(RuleSet::resolve(&config.rules)?);
    let scanner = Scanner::new(rules);

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let result = scanner.scan(&input);

    let report = serde_json::json!({
        "has_pii": result.has_pii(),
        "categories": result.categories(),
        "rules": result.rule_ids(),
        "redacted": result.redacted,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
