//! CI bootstrap: tools, Dockerfile, Jenkinsfile, git push, webhook.
//!
//! Steps run in a fixed order. The first failure stops the run and every
//! later step is reported as skipped.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;

use crate::container::{self, DockerfileSettings};
use crate::error::{Error, Result};
use crate::git::{self, RepoSlug};
use crate::github::{self, GitHubClient, WebhookRequest, WebhookStatus};
use crate::jenkins::{self, JenkinsfileSettings};
use crate::scaffold::{self, FileOutcome, FileStatus, ScaffoldFile, WriteMode};
use crate::tools::{self, Tool, ToolAction};

pub const DEFAULT_COMMIT_MESSAGE: &str = "Add CI pipeline";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "main";

const PREVIOUS_FAILED: &str = "previous step failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Tools,
    Dockerfile,
    Jenkinsfile,
    Git,
    Webhook,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Tools => "tools",
            Step::Dockerfile => "dockerfile",
            Step::Jenkinsfile => "jenkinsfile",
            Step::Git => "git",
            Step::Webhook => "webhook",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Done,
    Skipped,
    Planned,
    Failed,
}

/// What a step body reports back on success.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub reason: Option<String>,
    pub data: Value,
}

impl StepOutcome {
    pub fn done(data: Value) -> Self {
        Self {
            status: StepStatus::Done,
            reason: None,
            data,
        }
    }

    pub fn planned(data: Value) -> Self {
        Self {
            status: StepStatus::Planned,
            reason: None,
            data,
        }
    }

    pub fn skipped(reason: impl Into<String>, data: Value) -> Self {
        Self {
            status: StepStatus::Skipped,
            reason: Some(reason.into()),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
}

#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub dir: String,
    pub dry_run: bool,
    pub steps: Vec<StepReport>,
    #[serde(skip)]
    failure: Option<Error>,
}

impl PipelineReport {
    pub fn new(dir: impl Into<String>, dry_run: bool) -> Self {
        Self {
            dir: dir.into(),
            dry_run,
            steps: Vec::new(),
            failure: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failed_step(&self) -> Option<Step> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Failed)
            .map(|s| s.step)
    }

    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }

    /// Run `body` unless an earlier step failed, recording the result either way.
    pub fn run_step<F>(&mut self, step: Step, body: F)
    where
        F: FnOnce() -> Result<StepOutcome>,
    {
        if !self.succeeded() {
            self.steps.push(StepReport {
                step,
                status: StepStatus::Skipped,
                reason: Some(PREVIOUS_FAILED.to_string()),
                data: Value::Null,
                error: None,
            });
            return;
        }

        match body() {
            Ok(outcome) => self.steps.push(StepReport {
                step,
                status: outcome.status,
                reason: outcome.reason,
                data: outcome.data,
                error: None,
            }),
            Err(err) => {
                crate::log_status!("pipeline", "{} failed: {}", step.as_str(), err.message);
                self.steps.push(StepReport {
                    step,
                    status: StepStatus::Failed,
                    reason: None,
                    data: Value::Null,
                    error: Some(StepError {
                        code: err.code.as_str().to_string(),
                        message: err.message.clone(),
                    }),
                });
                self.failure = Some(err);
            }
        }
    }

    /// Turn a failed run into the failing step's error, carrying the step reports in its details.
    pub fn into_result(mut self) -> Result<PipelineReport> {
        let Some(mut err) = self.failure.take() else {
            return Ok(self);
        };

        let mut details = match std::mem::take(&mut err.details) {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("cause".to_string(), other);
                map
            }
        };
        if let Some(step) = self.failed_step() {
            details.insert("failed_step".to_string(), json!(step));
        }
        details.insert(
            "steps".to_string(),
            serde_json::to_value(&self.steps).unwrap_or(Value::Null),
        );
        err.details = Value::Object(details);
        Err(err)
    }
}

#[derive(Debug, Clone)]
pub struct GitStepOptions {
    pub remote_name: String,
    /// Set (or add) the remote to this URL before pushing.
    pub remote_url: Option<String>,
    /// Branch for a freshly initialised repository.
    pub branch: String,
    pub message: String,
    pub push: bool,
}

impl Default for GitStepOptions {
    fn default() -> Self {
        Self {
            remote_name: DEFAULT_REMOTE.to_string(),
            remote_url: None,
            branch: DEFAULT_BRANCH.to_string(),
            message: DEFAULT_COMMIT_MESSAGE.to_string(),
            push: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookStepOptions {
    pub api_url: String,
    pub request: WebhookRequest,
    /// Explicit repository; otherwise derived from the remote URL.
    pub repo: Option<RepoSlug>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub dir: PathBuf,
    pub ensure_tools: bool,
    pub dockerfile: DockerfileSettings,
    pub jenkinsfile: JenkinsfileSettings,
    pub git: GitStepOptions,
    /// `None` skips the webhook step.
    pub webhook: Option<WebhookStepOptions>,
    pub dry_run: bool,
}

impl PipelineOptions {
    /// Checks that need no side effects, run before the first step.
    pub fn validate(&self) -> Result<()> {
        self.dockerfile.validate()?;
        self.jenkinsfile.validate()?;
        if self.git.message.trim().is_empty() {
            return Err(Error::validation_invalid_argument(
                "message",
                "Commit message cannot be empty",
                None,
            ));
        }
        if let Some(webhook) = &self.webhook {
            webhook.request.hook_url()?;
        }
        Ok(())
    }
}

/// Run every step in order. `token` is only called when the webhook is actually created.
pub fn run<T>(options: &PipelineOptions, token: T) -> Result<PipelineReport>
where
    T: FnOnce() -> Result<String>,
{
    options.validate()?;

    let mut report = PipelineReport::new(options.dir.display().to_string(), options.dry_run);

    report.run_step(Step::Tools, || tools_step(options));
    report.run_step(Step::Dockerfile, || {
        file_step(options, container::files(&options.dockerfile)?, container::DOCKERFILE)
    });
    report.run_step(Step::Jenkinsfile, || {
        file_step(options, jenkins::files(&options.jenkinsfile)?, jenkins::JENKINSFILE)
    });
    report.run_step(Step::Git, || git_step(options));
    report.run_step(Step::Webhook, || webhook_step(options, token));

    Ok(report)
}

fn tools_step(options: &PipelineOptions) -> Result<StepOutcome> {
    if !options.ensure_tools {
        return Ok(StepOutcome::skipped("tool setup disabled", Value::Null));
    }

    let mut outcomes = Vec::new();
    for tool in Tool::ALL {
        outcomes.push(tools::ensure(tool, options.dry_run)?);
    }

    let data = json!({ "tools": outcomes });
    let nothing_to_do = outcomes.iter().all(|o| o.action == ToolAction::None);
    Ok(if nothing_to_do {
        StepOutcome::skipped("all tools installed and running", data)
    } else if options.dry_run {
        StepOutcome::planned(data)
    } else {
        StepOutcome::done(data)
    })
}

fn file_step(options: &PipelineOptions, files: Vec<ScaffoldFile>, primary: &str) -> Result<StepOutcome> {
    let outcomes = scaffold::write_files(&options.dir, &files, WriteMode::SkipExisting, options.dry_run)?;
    let wrote = outcomes.iter().any(FileOutcome::wrote);
    let planned = outcomes.iter().any(|o| o.status == FileStatus::Planned);
    let data = json!({ "files": outcomes });

    Ok(if wrote {
        StepOutcome::done(data)
    } else if planned {
        StepOutcome::planned(data)
    } else {
        StepOutcome::skipped(format!("{} already exists", primary), data)
    })
}

fn git_step(options: &PipelineOptions) -> Result<StepOutcome> {
    let dir = &options.dir;
    let opts = &options.git;
    let is_repo = git::is_repo(dir);

    if options.dry_run {
        let branch = if is_repo {
            git::current_branch(dir).ok()
        } else {
            Some(opts.branch.clone())
        };
        return Ok(StepOutcome::planned(json!({
            "init": !is_repo,
            "branch": branch,
            "message": opts.message,
            "remote": opts.remote_name,
            "remote_url": opts.remote_url.clone().or_else(|| git::remote_url(dir, &opts.remote_name)),
            "push": opts.push,
        })));
    }

    tools::require(Tool::Git)?;

    if !is_repo {
        crate::log_status!("git", "Initialising repository on {}", opts.branch);
        git::init(dir, &opts.branch)?;
    }

    git::stage_all(dir)?;
    let commit = git::commit(dir, &opts.message)?;

    let remote_change = match &opts.remote_url {
        Some(url) => Some(git::set_remote(dir, &opts.remote_name, url)?),
        None => None,
    };

    let branch = git::current_branch(dir)?;
    if opts.push {
        if git::remote_url(dir, &opts.remote_name).is_none() {
            return Err(Error::validation_missing_argument(vec!["remote".to_string()])
                .with_hint(format!(
                    "Pass --remote <url> or add a '{}' remote",
                    opts.remote_name
                ))
                .with_hint("Or rerun with --no-push"));
        }
        git::push(dir, &opts.remote_name, &branch)?;
    }

    Ok(StepOutcome::done(json!({
        "initialized": !is_repo,
        "commit": commit,
        "branch": branch,
        "remote": opts.remote_name,
        "remote_change": remote_change,
        "pushed": opts.push,
    })))
}

/// Repository for the webhook: explicit, then the remote being set, then the existing remote.
pub fn webhook_repo(options: &PipelineOptions, explicit: Option<&RepoSlug>) -> Result<RepoSlug> {
    if let Some(slug) = explicit {
        return Ok(slug.clone());
    }
    let url = options
        .git
        .remote_url
        .clone()
        .or_else(|| git::remote_url(&options.dir, &options.git.remote_name))
        .ok_or_else(|| {
            Error::validation_missing_argument(vec!["repo".to_string()])
                .with_hint("Pass --repo owner/name or --remote <github url>")
        })?;
    git::parse_github_remote(&url)
}

fn webhook_step<T>(options: &PipelineOptions, token: T) -> Result<StepOutcome>
where
    T: FnOnce() -> Result<String>,
{
    let Some(webhook) = &options.webhook else {
        return Ok(StepOutcome::skipped("webhook disabled", Value::Null));
    };

    let slug = webhook_repo(options, webhook.repo.as_ref())?;

    if options.dry_run {
        let outcome = github::plan_push_webhook(&slug, &webhook.request)?;
        return Ok(StepOutcome::planned(json!(outcome)));
    }

    let token = token()?;
    let client = GitHubClient::new(&webhook.api_url, &token)?;
    let outcome = github::ensure_push_webhook(&client, &slug, &webhook.request)?;

    Ok(match outcome.status {
        WebhookStatus::Exists => StepOutcome::skipped("webhook already registered", json!(outcome)),
        _ => StepOutcome::done(json!(outcome)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn options(dir: &std::path::Path) -> PipelineOptions {
        PipelineOptions {
            dir: dir.to_path_buf(),
            ensure_tools: false,
            dockerfile: DockerfileSettings {
                base_image: "node:18-alpine".to_string(),
                app_port: 3000,
                start_command: "npm start".to_string(),
            },
            jenkinsfile: JenkinsfileSettings {
                docker_hub_user: "acmeci".to_string(),
                repo_name: "billing-api".to_string(),
                app_port: 3000,
                credentials_id: "dockerhub-credentials".to_string(),
            },
            git: GitStepOptions::default(),
            webhook: Some(WebhookStepOptions {
                api_url: "https://api.github.com".to_string(),
                request: WebhookRequest {
                    jenkins_url: "http://ci.example.com:8080".to_string(),
                    secret: None,
                },
                repo: Some(RepoSlug::parse("acme/billing-api").unwrap()),
            }),
            dry_run: true,
        }
    }

    fn statuses(report: &PipelineReport) -> Vec<(Step, StepStatus)> {
        report.steps.iter().map(|s| (s.step, s.status)).collect()
    }

    #[test]
    fn failure_skips_remaining_steps() {
        let mut report = PipelineReport::new("/tmp/app", false);
        report.run_step(Step::Tools, || Ok(StepOutcome::done(Value::Null)));
        report.run_step(Step::Dockerfile, || Err(Error::git_command_failed("boom")));
        let mut ran = false;
        report.run_step(Step::Jenkinsfile, || {
            ran = true;
            Ok(StepOutcome::done(Value::Null))
        });

        assert!(!ran);
        assert!(!report.succeeded());
        assert_eq!(report.failed_step(), Some(Step::Dockerfile));
        let skipped = report.step(Step::Jenkinsfile).unwrap();
        assert_eq!(skipped.status, StepStatus::Skipped);
        assert_eq!(skipped.reason.as_deref(), Some("previous step failed"));
    }

    #[test]
    fn into_result_attaches_steps_to_error() {
        let mut report = PipelineReport::new("/tmp/app", false);
        report.run_step(Step::Tools, || Err(Error::tool_not_found("docker")));
        report.run_step(Step::Dockerfile, || Ok(StepOutcome::done(Value::Null)));

        let err = report.into_result().unwrap_err();

        assert_eq!(err.code, ErrorCode::ToolNotFound);
        assert_eq!(err.details["failed_step"], "tools");
        assert_eq!(err.details["steps"][1]["status"], "skipped");
        assert_eq!(err.details["tool"], "docker");
    }

    #[test]
    fn dry_run_plans_every_step_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());

        let report = run(&opts, || panic!("token must not be requested in dry run")).unwrap();

        assert_eq!(
            statuses(&report),
            vec![
                (Step::Tools, StepStatus::Skipped),
                (Step::Dockerfile, StepStatus::Planned),
                (Step::Jenkinsfile, StepStatus::Planned),
                (Step::Git, StepStatus::Planned),
                (Step::Webhook, StepStatus::Planned),
            ]
        );
        assert!(!dir.path().join("Dockerfile").exists());
        assert!(!dir.path().join("Jenkinsfile").exists());
        assert_eq!(
            report.step(Step::Webhook).unwrap().data["url"],
            "http://ci.example.com:8080/github-webhook/"
        );
    }

    #[test]
    fn existing_dockerfile_is_reported_as_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::write(dir.path().join(".dockerignore"), "node_modules\n").unwrap();
        let mut opts = options(dir.path());
        opts.webhook = None;

        let report = run(&opts, || unreachable!()).unwrap();

        let step = report.step(Step::Dockerfile).unwrap();
        assert_eq!(step.status, StepStatus::Skipped);
        assert_eq!(step.reason.as_deref(), Some("Dockerfile already exists"));
        assert_eq!(report.step(Step::Webhook).unwrap().status, StepStatus::Skipped);
    }

    #[test]
    fn file_step_is_done_when_a_companion_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(container::DOCKERFILE), "FROM scratch\n").unwrap();
        let mut opts = options(dir.path());
        opts.dry_run = false;

        let files = container::files(&opts.dockerfile).unwrap();
        let outcome = file_step(&opts, files, container::DOCKERFILE).unwrap();

        assert_eq!(outcome.status, StepStatus::Done);
        assert!(outcome.reason.is_none());
        assert!(dir.path().join(container::DOCKERIGNORE).is_file());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(container::DOCKERFILE)).unwrap(),
            "FROM scratch\n"
        );
    }

    #[test]
    fn invalid_settings_fail_before_any_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.jenkinsfile.docker_hub_user = "Not Valid".to_string();

        let err = run(&opts, || unreachable!()).unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
    }

    #[test]
    fn webhook_repo_falls_back_to_remote_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.git.remote_url = Some("git@github.com:acme/other.git".to_string());

        assert_eq!(webhook_repo(&opts, None).unwrap().to_string(), "acme/other");
        assert!(webhook_repo(&options(dir.path()), None).is_err());
    }
}
