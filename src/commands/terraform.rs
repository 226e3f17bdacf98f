use clap::Args;

use infragen::defaults;
use infragen::paths;
use infragen::scaffold::{self, WriteMode};
use infragen::terraform::{self, TerraformSettings};
use infragen::utils::validation;

use super::{CmdResult, ScaffoldOutput};

#[derive(Args)]
pub struct TerraformArgs {
    /// Target directory (default: current directory)
    #[arg(long)]
    pub dir: Option<String>,

    /// AWS region (e.g. us-east-1)
    #[arg(long)]
    pub region: Option<String>,

    /// EC2 instance type (e.g. t2.micro)
    #[arg(long)]
    pub instance_type: Option<String>,

    /// Name of the EC2 key pair to create; the private key is saved as <name>.pem
    #[arg(long)]
    pub key_name: Option<String>,

    /// Value of the instance's Name tag
    #[arg(long)]
    pub instance_name: Option<String>,

    /// CIDR allowed to reach port 22
    #[arg(long)]
    pub ssh_cidr: Option<String>,

    /// Application port opened in the security group
    #[arg(long)]
    pub app_port: Option<u32>,

    /// Overwrite files that already exist
    #[arg(long)]
    pub force: bool,

    /// Show what would be written without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Never prompt; use flags and configured defaults only
    #[arg(long)]
    pub no_input: bool,
}

pub fn run(args: TerraformArgs) -> CmdResult<ScaffoldOutput<TerraformSettings>> {
    let dir = paths::target_dir(args.dir.as_deref())?;
    let defaults = defaults::load_defaults();
    let tf = defaults.terraform;
    let interactive = super::interactive(args.no_input);

    let region = super::resolve_input(args.region, "AWS region", Some(tf.region.clone()), interactive)?;
    let instance_type = super::resolve_input(
        args.instance_type,
        "Instance type",
        Some(tf.instance_type.clone()),
        interactive,
    )?;
    let key_name = super::resolve_input(args.key_name, "Key pair name", tf.key_name.clone(), interactive)?;
    let instance_name = super::resolve_input(
        args.instance_name,
        "Instance name",
        Some(tf.instance_name.clone()),
        interactive,
    )?;
    let ssh_cidr = super::resolve_input(args.ssh_cidr, "SSH CIDR", Some(tf.ssh_cidr.clone()), interactive)?;
    let app_port = super::resolve_port(
        args.app_port,
        "Application port",
        defaults.container.app_port,
        interactive,
    )?;

    let settings = TerraformSettings {
        region: region.unwrap_or(tf.region),
        instance_type: instance_type.unwrap_or(tf.instance_type),
        key_name: validation::require(key_name, "key_name")?,
        instance_name: instance_name.unwrap_or(tf.instance_name),
        ssh_cidr: ssh_cidr.unwrap_or(tf.ssh_cidr),
        app_port,
        aws_provider_version: tf.aws_provider_version,
    };

    let files = terraform::render(&settings)?;
    let outcomes = scaffold::write_files(&dir, &files, WriteMode::from_force(args.force), args.dry_run)?;

    let mut output = ScaffoldOutput::new("terraform", &dir, args.dry_run, settings, outcomes);
    output.next_steps = vec![
        format!("cd {}", dir.display()),
        "terraform init".to_string(),
        "terraform plan".to_string(),
        "terraform apply".to_string(),
    ];

    Ok((output, 0))
}
