use clap::{Args, Subcommand};
use serde::Serialize;

use infragen::tools::{self, ToolOutcome, ToolStatus};

use super::CmdResult;

#[derive(Args)]
pub struct ToolsArgs {
    #[command(subcommand)]
    command: ToolsCommand,
}

#[derive(Subcommand)]
enum ToolsCommand {
    /// Report whether each tool is installed and its service running
    Check {
        /// Tools to check: git, docker, jenkins (default: all)
        tools: Vec<String>,
    },
    /// Install missing tools via apt and start their services
    Install {
        /// Tools to install: git, docker, jenkins (default: all)
        tools: Vec<String>,

        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct ToolsOutput {
    command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    statuses: Option<Vec<ToolStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcomes: Option<Vec<ToolOutcome>>,
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    dry_run: Option<bool>,
}

pub fn run(args: ToolsArgs) -> CmdResult<ToolsOutput> {
    match args.command {
        ToolsCommand::Check { tools } => check(&tools),
        ToolsCommand::Install { tools, dry_run } => install(&tools, dry_run),
    }
}

fn check(names: &[String]) -> CmdResult<ToolsOutput> {
    let statuses: Vec<ToolStatus> = tools::parse_tools(names)?
        .into_iter()
        .map(tools::check)
        .collect();
    let ready = statuses.iter().all(ToolStatus::ready);

    Ok((
        ToolsOutput {
            command: "tools.check",
            statuses: Some(statuses),
            outcomes: None,
            ready,
            dry_run: None,
        },
        0,
    ))
}

fn install(names: &[String], dry_run: bool) -> CmdResult<ToolsOutput> {
    let mut outcomes = Vec::new();
    for tool in tools::parse_tools(names)? {
        outcomes.push(tools::ensure(tool, dry_run)?);
    }

    let ready = if dry_run {
        outcomes.iter().all(|o| o.before.ready())
    } else {
        outcomes.iter().all(|o| tools::check(o.tool).ready())
    };

    Ok((
        ToolsOutput {
            command: "tools.install",
            statuses: None,
            outcomes: Some(outcomes),
            ready,
            dry_run: Some(dry_run),
        },
        0,
    ))
}
