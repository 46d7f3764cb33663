//! Planlock: plan-locked policy enforcement for AI coding agents.
//!
//! Planlock sits between a human operator and a coding agent as a set of host hooks.
//! The operator drives a small workflow with message keywords; the agent's tool calls
//! are allowed or blocked against the plan the operator approved.
//!
//! # Workflow
//!
//! - `propose: <description>`: the agent drafts `.planlock/changes/<id>/{proposal,tasks}.md`.
//! - `apply: <id>`: the work item's branch (`feature/<id>`) is checked out and its
//!   task checklist becomes the locked baseline. The branch is now **Locked**.
//! - `checkpoint:`: the agent appends progress to the work item's worklog.
//! - `archive`: review and close. `planlock archive <id>` unlocks the branch.
//!
//! # Enforcement
//!
//! On a Locked branch the baseline documents are frozen and the agent's todo list may
//! only mark approved tasks complete. Adding or removing tasks is a scope change and is
//! blocked. Unrestricted branches allow everything unless `strict_discussion_mode` is
//! set in `.planlock/config.toml`, in which case only read-only shell commands run.
//!
//! Every gate decision is fail-open: an internal error allows the call and logs a warning.
//!
//! # Crate Structure
//!
//! - [`core`]: state store, task parsing, plan diffing, shell classification, keyword
//!   dispatch, the enforcement gate and hook I/O.

pub mod core;

use crate::core::{
    bash_safety, config,
    dispatch::{KeywordDispatcher, StartPlan, started_message},
    error::PlanlockError,
    git::GitCli,
    hooks,
    status::{StatusReport, build_status},
    store::{FileStateStore, StateRepository},
    time::CommandEnvelope,
    workitems,
};

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

pub const ROOT_ENV: &str = "PLANLOCK_ROOT";

#[derive(Parser, Debug)]
#[clap(
    name = "planlock",
    version = env!("CARGO_PKG_VERSION"),
    about = "Plan-locked policy enforcement for AI coding agents"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host hook entry points (JSON on stdin, JSON on stdout).
    Hook {
        #[clap(subcommand)]
        event: HookCommand,
    },
    /// Lock a work item to its branch, creating the branch if asked.
    Start {
        /// Work item id (exact or unique substring).
        id: String,
        #[clap(long)]
        create_branch: bool,
    },
    /// Unlock a work item and move it under `changes/archive/`.
    Archive { id: String },
    /// Show the enforcement state of the current branch.
    Status {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Classify a shell command as read-only (exit 0) or write-like (exit 1).
    CheckCommand {
        command: String,
        /// Treat unknown commands as read-only.
        #[clap(long)]
        lenient: bool,
    },
}

#[derive(Subcommand, Debug)]
enum HookCommand {
    /// Authorize a tool invocation.
    PreToolUse,
    /// Dispatch workflow keywords in a user message.
    UserPrompt,
    /// Sync task completion after a tool invocation.
    PostToolUse,
}

fn project_root() -> Result<PathBuf, PlanlockError> {
    match std::env::var_os(ROOT_ENV) {
        Some(root) if !root.is_empty() => Ok(PathBuf::from(root)),
        _ => Ok(std::env::current_dir()?),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), PlanlockError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub fn run() -> Result<ExitCode, PlanlockError> {
    let cli = Cli::parse();
    let root = project_root()?;

    match cli.command {
        Command::Hook { event } => {
            let config = config::load_config_or_default(&root);
            let store = FileStateStore::for_project(&root);
            let git = GitCli::new(&root, config.io_timeout());
            let raw = hooks::read_stdin_bounded(config.io_timeout());
            match event {
                HookCommand::PreToolUse => {
                    let verdict = hooks::pre_tool_use(raw.as_deref(), &root, &store, &git, &config);
                    print_json(&verdict)?;
                }
                HookCommand::UserPrompt => {
                    let response = hooks::user_prompt(raw.as_deref(), &root, &store, &git, &config)?;
                    print_json(&response)?;
                }
                HookCommand::PostToolUse => {
                    if let Some(advisory) = hooks::post_tool_use(raw.as_deref(), &root, &store, &git)? {
                        println!("{advisory}");
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Start { id, create_branch } => {
            let config = config::load_config(&root)?;
            let store = FileStateStore::for_project(&root);
            let git = GitCli::new(&root, config.io_timeout());
            let dispatcher = KeywordDispatcher::new(&root, &store, &git, &config);
            let state = store.load();
            match dispatcher.prepare_start(&id, &state, create_branch)? {
                StartPlan::AlreadyActive { work_item_id, branch } => {
                    println!(
                        "{} {} is already locked on {}",
                        "▸".bright_yellow(),
                        work_item_id.bold(),
                        branch.cyan()
                    );
                }
                StartPlan::NeedsBranchConfirmation { branch, .. } => {
                    println!(
                        "{} branch {} does not exist; re-run with {} to create it",
                        "▸".bright_yellow(),
                        branch.cyan(),
                        "--create-branch".bright_cyan().bold()
                    );
                    return Ok(ExitCode::FAILURE);
                }
                StartPlan::Ready(item) => {
                    store.upsert_active_work_item(item.clone())?;
                    tracing::info!(work_item = %item.work_item_id, branch = %item.branch, "work item locked");
                    println!("{}", started_message(&item));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Archive { id } => {
            workitems::validate_work_item_id(&id)?;
            let store = FileStateStore::for_project(&root);
            let target = workitems::close_work_item(&root, &store, &id)?;
            tracing::info!(work_item = %id, target = %target.display(), "work item archived");
            println!(
                "{} archived {} to {}",
                "✓".bright_green(),
                id.bold(),
                target.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { format } => {
            let config = config::load_config(&root)?;
            let store = FileStateStore::for_project(&root);
            let git = GitCli::new(&root, config.io_timeout());
            let report = build_status(&root, &store.load(), &git, &config);
            match format.as_str() {
                "json" => print_json(&CommandEnvelope::new("status", "ok", &report))?,
                "text" => print_status_text(&report),
                other => {
                    return Err(PlanlockError::ValidationError(format!(
                        "unknown format '{other}' (expected 'text' or 'json')"
                    )));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckCommand { command, lenient } => {
            let strict = if lenient {
                false
            } else {
                config::load_config_or_default(&root).strict_shell_classification
            };
            match bash_safety::check_command(&command, strict) {
                Ok(()) => {
                    println!("read-only");
                    Ok(ExitCode::SUCCESS)
                }
                Err(reason) => {
                    println!("write-like: {reason}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn print_status_text(report: &StatusReport) {
    let enforcement = match report.enforcement() {
        "locked" => "LOCKED".bright_red().bold(),
        other => other.to_uppercase().bright_green().bold(),
    };
    println!(
        "{} {} ({})",
        "▸".bright_cyan(),
        enforcement,
        format!("{:?}", report.mode).to_lowercase()
    );
    println!(
        "  branch: {}",
        report.branch.as_deref().unwrap_or("(unknown)").cyan()
    );
    if let Some(locked) = &report.locked {
        println!(
            "  work item: {} [{}/{} tasks]",
            locked.work_item_id.bold(),
            locked.completed,
            locked.total
        );
        for task in &locked.open_tasks {
            println!("    - [ ] {task}");
        }
        for doc in &locked.drifted_docs {
            println!(
                "  {} baseline {} changed since the work item was started",
                "!".bright_yellow().bold(),
                doc
            );
        }
    }
    if let (Some(ahead), Some(behind)) = (report.ahead, report.behind) {
        println!(
            "  {} ahead, {} behind {}",
            ahead,
            behind,
            report.base_branch.cyan()
        );
    }
    if !report.changed_files.is_empty() {
        println!("  changed files ({}):", report.changed_files.len());
        for file in &report.changed_files {
            println!("    {file}");
        }
    }
    if !report.active_work_items.is_empty() {
        println!("  active work items: {}", report.active_work_items.join(", "));
    }
    if !report.work_items.is_empty() {
        println!("  work items: {}", report.work_items.join(", ").dimmed());
    }
}
