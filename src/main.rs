use clap::{Parser, Subcommand};

mod commands;
mod output;
mod tty;

use commands::{config, dockerfile, jenkinsfile, pipeline, terraform, tools, webhook};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "infragen")]
#[command(version = VERSION)]
#[command(about = "Scaffold EC2 Terraform and bootstrap Docker + Jenkins CI for a repository")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a Terraform scaffold for a single EC2 instance
    Terraform(terraform::TerraformArgs),
    /// Write a Dockerfile (and .dockerignore) if absent
    Dockerfile(dockerfile::DockerfileArgs),
    /// Write a Jenkinsfile that builds, pushes and deploys the image if absent
    Jenkinsfile(jenkinsfile::JenkinsfileArgs),
    /// Register a GitHub push webhook pointing at Jenkins
    Webhook(webhook::WebhookArgs),
    /// Run the full CI bootstrap: tools, Dockerfile, Jenkinsfile, push, webhook
    Pipeline(pipeline::PipelineArgs),
    /// Check or install git, Docker and Jenkins
    Tools(tools::ToolsArgs),
    /// Manage infragen configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let (json_result, exit_code) = commands::run_json(cli.command);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
