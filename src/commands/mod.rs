use serde::Serialize;
use std::path::Path;

use infragen::scaffold::{self, FileOutcome, ScaffoldSummary};
use infragen::utils::validation;

pub type CmdResult<T> = infragen::Result<(T, i32)>;

/// Output shared by the commands that render files into a directory.
#[derive(Debug, Serialize)]
pub struct ScaffoldOutput<S: Serialize> {
    pub command: &'static str,
    pub dir: String,
    pub generated_at: String,
    pub dry_run: bool,
    pub settings: S,
    pub files: Vec<FileOutcome>,
    pub summary: ScaffoldSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
}

impl<S: Serialize> ScaffoldOutput<S> {
    pub fn new(
        command: &'static str,
        dir: &Path,
        dry_run: bool,
        settings: S,
        files: Vec<FileOutcome>,
    ) -> Self {
        Self {
            command,
            dir: dir.display().to_string(),
            generated_at: generated_at(),
            dry_run,
            settings,
            summary: scaffold::summarize(&files),
            files,
            next_steps: Vec::new(),
        }
    }
}

pub(crate) fn generated_at() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Prompting is allowed unless `--no-input` was passed or no terminal is attached.
pub(crate) fn interactive(no_input: bool) -> bool {
    !no_input && crate::tty::can_prompt()
}

/// Resolve a value: the flag, else a prompt seeded with `default`, else `default`.
pub(crate) fn resolve_input(
    flag: Option<String>,
    label: &str,
    default: Option<String>,
    interactive: bool,
) -> infragen::Result<Option<String>> {
    if let Some(value) = flag {
        return Ok(Some(value));
    }
    if interactive {
        let answer = crate::tty::prompt_with_default(label, default.as_deref().unwrap_or(""))?;
        return Ok(if answer.is_empty() { None } else { Some(answer) });
    }
    Ok(default)
}

pub(crate) fn resolve_port(
    flag: Option<u32>,
    label: &str,
    default: u16,
    interactive: bool,
) -> infragen::Result<u16> {
    let raw = resolve_input(
        flag.map(|p| p.to_string()),
        label,
        Some(default.to_string()),
        interactive,
    )?
    .unwrap_or_else(|| default.to_string());

    let port: u32 = raw.trim().parse().map_err(|_| {
        infragen::Error::validation_invalid_argument(
            "app_port",
            "Port must be a number between 1 and 65535",
            Some(raw.clone()),
        )
    })?;
    validation::require_port(port, "app_port")
}

pub mod config;
pub mod dockerfile;
pub mod jenkinsfile;
pub mod pipeline;
pub mod terraform;
pub mod tools;
pub mod webhook;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args))
    };
}

pub(crate) fn run_json(command: crate::Commands) -> (infragen::Result<serde_json::Value>, i32) {
    crate::tty::status("infragen is working...");

    match command {
        crate::Commands::Terraform(args) => dispatch!(args, terraform),
        crate::Commands::Dockerfile(args) => dispatch!(args, dockerfile),
        crate::Commands::Jenkinsfile(args) => dispatch!(args, jenkinsfile),
        crate::Commands::Webhook(args) => dispatch!(args, webhook),
        crate::Commands::Pipeline(args) => dispatch!(args, pipeline),
        crate::Commands::Tools(args) => dispatch!(args, tools),
        crate::Commands::Config(args) => dispatch!(args, config),
    }
}
