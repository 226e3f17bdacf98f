use clap::Args;

use infragen::container::{self, DockerfileSettings};
use infragen::defaults;
use infragen::paths;
use infragen::scaffold::{self, WriteMode};
use infragen::utils::validation;

use super::{CmdResult, ScaffoldOutput};

#[derive(Args)]
pub struct DockerfileArgs {
    /// Target directory (default: current directory)
    #[arg(long)]
    pub dir: Option<String>,

    /// Port the application listens on
    #[arg(long)]
    pub app_port: Option<u32>,

    /// Base image (e.g. node:18-alpine)
    #[arg(long)]
    pub base_image: Option<String>,

    /// Command that starts the application (e.g. "npm start")
    #[arg(long)]
    pub start_command: Option<String>,

    /// Overwrite an existing Dockerfile
    #[arg(long)]
    pub force: bool,

    /// Show what would be written without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: DockerfileArgs) -> CmdResult<ScaffoldOutput<DockerfileSettings>> {
    let dir = paths::target_dir(args.dir.as_deref())?;
    let container = defaults::load_defaults().container;

    let app_port = match args.app_port {
        Some(port) => validation::require_port(port, "app_port")?,
        None => container.app_port,
    };

    let settings = DockerfileSettings {
        base_image: args.base_image.unwrap_or(container.base_image),
        app_port,
        start_command: args.start_command.unwrap_or(container.start_command),
    };

    let files = container::files(&settings)?;
    let outcomes = scaffold::write_files(&dir, &files, WriteMode::from_force(args.force), args.dry_run)?;

    Ok((
        ScaffoldOutput::new("dockerfile", &dir, args.dry_run, settings, outcomes),
        0,
    ))
}
