use clap::Args;
use std::path::Path;

use infragen::defaults::{self, Defaults};
use infragen::jenkins::{self, JenkinsfileSettings};
use infragen::paths;
use infragen::scaffold::{self, WriteMode};
use infragen::utils::validation;

use super::{CmdResult, ScaffoldOutput};

#[derive(Args)]
pub struct JenkinsfileArgs {
    /// Target directory (default: current directory)
    #[arg(long)]
    pub dir: Option<String>,

    /// Docker Hub user that owns the image
    #[arg(long)]
    pub docker_hub_user: Option<String>,

    /// Repository name used for the image and container (default: directory name)
    #[arg(long)]
    pub repo_name: Option<String>,

    /// Port published by the deployed container
    #[arg(long)]
    pub app_port: Option<u32>,

    /// Jenkins username/password credentials id for Docker Hub
    #[arg(long)]
    pub credentials_id: Option<String>,

    /// Overwrite an existing Jenkinsfile
    #[arg(long)]
    pub force: bool,

    /// Show what would be written without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Never prompt; use flags and configured defaults only
    #[arg(long)]
    pub no_input: bool,
}

/// Settings shared with `pipeline`: flags, then config, then prompts.
pub(crate) fn resolve_settings(
    dir: &Path,
    defaults: &Defaults,
    docker_hub_user: Option<String>,
    repo_name: Option<String>,
    app_port: Option<u32>,
    credentials_id: Option<String>,
    interactive: bool,
) -> infragen::Result<JenkinsfileSettings> {
    let docker_hub_user = super::resolve_input(
        docker_hub_user,
        "Docker Hub user",
        defaults.jenkins.docker_hub_user.clone(),
        interactive,
    )?;
    let repo_name = super::resolve_input(repo_name, "Repository name", paths::dir_name(dir), interactive)?;
    let app_port = super::resolve_port(
        app_port,
        "Application port",
        defaults.container.app_port,
        interactive,
    )?;

    Ok(JenkinsfileSettings {
        docker_hub_user: validation::require(docker_hub_user, "docker_hub_user")?,
        repo_name: validation::require(repo_name, "repo_name")?,
        app_port,
        credentials_id: credentials_id.unwrap_or_else(|| defaults.jenkins.credentials_id.clone()),
    })
}

pub fn run(args: JenkinsfileArgs) -> CmdResult<ScaffoldOutput<JenkinsfileSettings>> {
    let dir = paths::target_dir(args.dir.as_deref())?;
    let defaults = defaults::load_defaults();

    let settings = resolve_settings(
        &dir,
        &defaults,
        args.docker_hub_user,
        args.repo_name,
        args.app_port,
        args.credentials_id,
        super::interactive(args.no_input),
    )?;

    let files = jenkins::files(&settings)?;
    let outcomes = scaffold::write_files(&dir, &files, WriteMode::from_force(args.force), args.dry_run)?;

    let mut output = ScaffoldOutput::new("jenkinsfile", &dir, args.dry_run, settings, outcomes);
    output.next_steps = vec![format!(
        "Add a Docker Hub username/password credential '{}' in Jenkins",
        output.settings.credentials_id
    )];

    Ok((output, 0))
}
