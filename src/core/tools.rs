//! Presence checks and apt-based installation for git, Docker and Jenkins.

use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{CommandFailedDetails, Error, Result};
use crate::utils::{command, shell};

const JENKINS_KEY_URL: &str = "https://pkg.jenkins.io/debian-stable/jenkins.io-2023.key";
const JENKINS_KEYRING: &str = "/usr/share/keyrings/jenkins-keyring.asc";
const JENKINS_APT_SOURCE: &str = "/etc/apt/sources.list.d/jenkins.list";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Git,
    Docker,
    Jenkins,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Git, Tool::Docker, Tool::Jenkins];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Git => "git",
            Tool::Docker => "docker",
            Tool::Jenkins => "jenkins",
        }
    }

    pub fn parse(name: &str) -> Result<Tool> {
        match name.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(Tool::Git),
            "docker" => Ok(Tool::Docker),
            "jenkins" => Ok(Tool::Jenkins),
            _ => Err(Error::validation_invalid_argument(
                "tool",
                "Unknown tool (expected git, docker or jenkins)",
                Some(name.to_string()),
            )),
        }
    }

    fn binary(&self) -> &'static str {
        self.as_str()
    }

    /// Files that prove an install even when the binary is not on PATH.
    fn marker_paths(&self) -> &'static [&'static str] {
        match self {
            Tool::Jenkins => &["/usr/share/java/jenkins.war"],
            Tool::Git | Tool::Docker => &[],
        }
    }

    pub fn service(&self) -> Option<&'static str> {
        match self {
            Tool::Git => None,
            Tool::Docker => Some("docker"),
            Tool::Jenkins => Some("jenkins"),
        }
    }
}

/// Parse tool names, defaulting to every tool when none are given.
pub fn parse_tools(names: &[String]) -> Result<Vec<Tool>> {
    if names.is_empty() {
        return Ok(Tool::ALL.to_vec());
    }
    let mut tools = Vec::new();
    for name in names {
        let tool = Tool::parse(name)?;
        if !tools.contains(&tool) {
            tools.push(tool);
        }
    }
    Ok(tools)
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub tool: Tool,
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_active: Option<bool>,
}

impl ToolStatus {
    pub fn ready(&self) -> bool {
        self.installed && self.service_active.unwrap_or(true)
    }
}

/// Locate an executable on PATH.
pub fn find_on_path(binary: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

pub fn service_active(service: &str) -> bool {
    command::succeeded("systemctl", &["is-active", "--quiet", service])
}

pub fn check(tool: Tool) -> ToolStatus {
    let found = find_on_path(tool.binary()).or_else(|| {
        tool.marker_paths()
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    });

    let installed = found.is_some();
    let service_active = match tool.service() {
        Some(svc) if installed => Some(service_active(svc)),
        Some(_) => Some(false),
        None => None,
    };

    ToolStatus {
        tool,
        installed,
        path: found.map(|p| p.display().to_string()),
        service_active,
    }
}

/// A command that will be (or would be) executed, in argv form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PlannedCommand {
    fn new(privileged: bool, argv: &[&str]) -> Self {
        let mut argv: Vec<String> = argv.iter().map(|a| a.to_string()).collect();
        if privileged {
            argv.insert(0, "sudo".to_string());
        }
        let program = argv.remove(0);
        Self {
            program,
            args: argv,
        }
    }

    pub fn display(&self) -> String {
        let mut argv = vec![self.program.clone()];
        argv.extend(self.args.iter().cloned());
        shell::quote_args(&argv)
    }

    fn execute(&self, tool: Tool) -> Result<()> {
        crate::log_status!("tools", "$ {}", self.display());
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let out = command::capture(&self.program, &args, &self.display())?;
        if out.success() {
            return Ok(());
        }
        Err(Error::tool_install_failed(
            tool.as_str(),
            CommandFailedDetails {
                command: self.display(),
                exit_code: out.exit_code,
                stderr: out.error_text().to_string(),
            },
        ))
    }
}

/// Whether privileged commands need a `sudo` prefix.
pub fn needs_sudo() -> bool {
    command::run("id", &["-u"], "id -u")
        .map(|uid| uid != "0")
        .unwrap_or(true)
}

pub fn install_plan(tool: Tool, sudo: bool) -> Vec<PlannedCommand> {
    let mut plan = vec![PlannedCommand::new(sudo, &["apt-get", "update"])];

    match tool {
        Tool::Git => {
            plan.push(PlannedCommand::new(sudo, &["apt-get", "install", "-y", "git"]));
        }
        Tool::Docker => {
            plan.push(PlannedCommand::new(
                sudo,
                &["apt-get", "install", "-y", "docker.io"],
            ));
            plan.push(PlannedCommand::new(
                sudo,
                &["systemctl", "enable", "--now", "docker"],
            ));
        }
        Tool::Jenkins => {
            plan.push(PlannedCommand::new(
                sudo,
                &["apt-get", "install", "-y", "fontconfig", "openjdk-17-jre", "wget"],
            ));
            plan.push(PlannedCommand::new(
                sudo,
                &["wget", "-O", JENKINS_KEYRING, JENKINS_KEY_URL],
            ));
            let source_line = format!(
                "echo 'deb [signed-by={}] https://pkg.jenkins.io/debian-stable binary/' > {}",
                JENKINS_KEYRING, JENKINS_APT_SOURCE
            );
            plan.push(PlannedCommand::new(sudo, &["sh", "-c", source_line.as_str()]));
            plan.push(PlannedCommand::new(sudo, &["apt-get", "update"]));
            plan.push(PlannedCommand::new(
                sudo,
                &["apt-get", "install", "-y", "jenkins"],
            ));
            plan.push(PlannedCommand::new(
                sudo,
                &["systemctl", "enable", "--now", "jenkins"],
            ));
        }
    }

    plan
}

pub fn start_plan(tool: Tool, sudo: bool) -> Vec<PlannedCommand> {
    match tool.service() {
        Some(svc) => vec![PlannedCommand::new(sudo, &["systemctl", "start", svc])],
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAction {
    None,
    StartService,
    Install,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub tool: Tool,
    pub action: ToolAction,
    pub executed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    pub before: ToolStatus,
}

/// Decide what a tool needs given its current status.
pub fn required_action(status: &ToolStatus) -> ToolAction {
    if !status.installed {
        ToolAction::Install
    } else if status.service_active == Some(false) {
        ToolAction::StartService
    } else {
        ToolAction::None
    }
}

/// Install or start a tool if needed. Commands run sequentially; the first failure aborts.
pub fn ensure(tool: Tool, dry_run: bool) -> Result<ToolOutcome> {
    let before = check(tool);
    let action = required_action(&before);

    let plan = match action {
        ToolAction::None => Vec::new(),
        ToolAction::StartService => start_plan(tool, needs_sudo()),
        ToolAction::Install => install_plan(tool, needs_sudo()),
    };

    if !dry_run {
        if action != ToolAction::None {
            crate::log_status!("tools", "Setting up {}", tool.as_str());
        }
        for cmd in &plan {
            cmd.execute(tool)?;
        }
    }

    Ok(ToolOutcome {
        tool,
        action,
        executed: !dry_run && !plan.is_empty(),
        commands: plan.iter().map(PlannedCommand::display).collect(),
        before,
    })
}

/// Fail with `tool.not_found` unless the tool is installed.
pub fn require(tool: Tool) -> Result<ToolStatus> {
    let status = check(tool);
    if status.installed {
        Ok(status)
    } else {
        Err(Error::tool_not_found(tool.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn displays(plan: &[PlannedCommand]) -> Vec<String> {
        plan.iter().map(PlannedCommand::display).collect()
    }

    #[test]
    fn parse_accepts_any_case() {
        assert_eq!(Tool::parse("Docker").unwrap(), Tool::Docker);
        assert!(Tool::parse("podman").is_err());
    }

    #[test]
    fn parse_tools_defaults_to_all_and_dedupes() {
        assert_eq!(parse_tools(&[]).unwrap(), Tool::ALL.to_vec());
        let names = vec!["git".to_string(), "GIT".to_string(), "jenkins".to_string()];
        assert_eq!(parse_tools(&names).unwrap(), vec![Tool::Git, Tool::Jenkins]);
    }

    #[test]
    fn docker_plan_installs_and_enables_service() {
        assert_eq!(
            displays(&install_plan(Tool::Docker, true)),
            vec![
                "sudo apt-get update",
                "sudo apt-get install -y docker.io",
                "sudo systemctl enable --now docker",
            ]
        );
    }

    #[test]
    fn jenkins_plan_adds_repository_before_install() {
        let plan = displays(&install_plan(Tool::Jenkins, false));
        let source = plan.iter().position(|c| c.contains(JENKINS_APT_SOURCE)).unwrap();
        let install = plan
            .iter()
            .position(|c| c == "apt-get install -y jenkins")
            .unwrap();
        assert!(source < install);
        assert_eq!(plan.last().unwrap(), "systemctl enable --now jenkins");
        assert!(plan.iter().all(|c| !c.starts_with("sudo")));
    }

    #[test]
    fn git_has_no_service() {
        assert!(start_plan(Tool::Git, true).is_empty());
        assert_eq!(
            displays(&start_plan(Tool::Jenkins, true)),
            vec!["sudo systemctl start jenkins"]
        );
    }

    #[test]
    fn required_action_follows_status() {
        let mut status = ToolStatus {
            tool: Tool::Docker,
            installed: false,
            path: None,
            service_active: Some(false),
        };
        assert_eq!(required_action(&status), ToolAction::Install);

        status.installed = true;
        assert_eq!(required_action(&status), ToolAction::StartService);

        status.service_active = Some(true);
        assert_eq!(required_action(&status), ToolAction::None);
        assert!(status.ready());
    }

    #[test]
    fn find_on_path_locates_sh() {
        assert!(find_on_path("sh").is_some());
        assert!(find_on_path("definitely-not-a-real-binary-xyz").is_none());
    }
}
