use clap::Args;
use serde::Serialize;

use infragen::container::DockerfileSettings;
use infragen::defaults;
use infragen::git::RepoSlug;
use infragen::github::WebhookRequest;
use infragen::paths;
use infragen::pipeline::{
    self, GitStepOptions, PipelineOptions, PipelineReport, WebhookStepOptions,
    DEFAULT_BRANCH, DEFAULT_COMMIT_MESSAGE, DEFAULT_REMOTE,
};

use super::CmdResult;

#[derive(Args)]
pub struct PipelineArgs {
    /// Repository directory (default: current directory)
    #[arg(long)]
    pub dir: Option<String>,

    /// Docker Hub user that owns the image
    #[arg(long)]
    pub docker_hub_user: Option<String>,

    /// Repository name used for the image and container (default: directory name)
    #[arg(long)]
    pub repo_name: Option<String>,

    /// Port the application listens on
    #[arg(long)]
    pub app_port: Option<u32>,

    /// Jenkins base URL the webhook points at
    #[arg(long)]
    pub jenkins_url: Option<String>,

    /// Set the remote to this URL before pushing
    #[arg(long)]
    pub remote: Option<String>,

    /// Remote name to push to
    #[arg(long, default_value = DEFAULT_REMOTE)]
    pub remote_name: String,

    /// Branch for a newly initialised repository
    #[arg(long, default_value = DEFAULT_BRANCH)]
    pub branch: String,

    /// Commit message for the generated files
    #[arg(long, default_value = DEFAULT_COMMIT_MESSAGE)]
    pub message: String,

    /// GitHub repository as owner/name (default: derived from the remote)
    #[arg(long)]
    pub repo: Option<String>,

    /// GitHub personal access token (falls back to GITHUB_TOKEN, keychain, prompt)
    #[arg(long)]
    pub token: Option<String>,

    /// Secret GitHub signs deliveries with
    #[arg(long)]
    pub secret: Option<String>,

    /// Do not check or install git, Docker and Jenkins
    #[arg(long)]
    pub skip_tools: bool,

    /// Commit but do not push
    #[arg(long)]
    pub no_push: bool,

    /// Do not register the GitHub webhook
    #[arg(long)]
    pub skip_webhook: bool,

    /// Plan every step without side effects
    #[arg(long)]
    pub dry_run: bool,

    /// Never prompt; use flags and configured defaults only
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Debug, Serialize)]
pub struct PipelineOutput {
    pub command: &'static str,
    pub generated_at: String,
    #[serde(flatten)]
    pub report: PipelineReport,
}

pub fn run(args: PipelineArgs) -> CmdResult<PipelineOutput> {
    let dir = paths::target_dir(args.dir.as_deref())?;
    let defaults = defaults::load_defaults();
    let interactive = super::interactive(args.no_input);

    let jenkinsfile = super::jenkinsfile::resolve_settings(
        &dir,
        &defaults,
        args.docker_hub_user,
        args.repo_name,
        args.app_port,
        None,
        interactive,
    )?;

    let dockerfile = DockerfileSettings {
        base_image: defaults.container.base_image.clone(),
        app_port: jenkinsfile.app_port,
        start_command: defaults.container.start_command.clone(),
    };

    let webhook = if args.skip_webhook {
        None
    } else {
        Some(WebhookStepOptions {
            api_url: defaults.github.api_url.clone(),
            request: WebhookRequest {
                jenkins_url: args.jenkins_url.unwrap_or(defaults.jenkins.url.clone()),
                secret: args.secret,
            },
            repo: args.repo.as_deref().map(RepoSlug::parse).transpose()?,
        })
    };

    let options = PipelineOptions {
        dir,
        ensure_tools: !args.skip_tools,
        dockerfile,
        jenkinsfile,
        git: GitStepOptions {
            remote_name: args.remote_name,
            remote_url: args.remote,
            branch: args.branch,
            message: args.message,
            push: !args.no_push,
        },
        webhook,
        dry_run: args.dry_run,
    };

    let token_flag = args.token;
    let report = pipeline::run(&options, || {
        super::webhook::resolve_token(token_flag, interactive).map(|(token, _)| token)
    })?
    .into_result()?;

    Ok((
        PipelineOutput {
            command: "pipeline",
            generated_at: super::generated_at(),
            report,
        },
        0,
    ))
}
