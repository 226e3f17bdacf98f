use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};
use crate::paths;
use crate::utils::io;

/// Root configuration structure for infragen.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InfragenConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via infragen.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Defaults {
    #[serde(default)]
    pub terraform: TerraformDefaults,

    #[serde(default)]
    pub container: ContainerDefaults,

    #[serde(default)]
    pub jenkins: JenkinsDefaults,

    #[serde(default)]
    pub github: GithubDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerraformDefaults {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_instance_type")]
    pub instance_type: String,

    /// No built-in default: an EC2 key pair name is account specific.
    #[serde(default)]
    pub key_name: Option<String>,

    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_ssh_cidr")]
    pub ssh_cidr: String,

    #[serde(default = "default_aws_provider_version")]
    pub aws_provider_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerDefaults {
    #[serde(default = "default_base_image")]
    pub base_image: String,

    #[serde(default = "default_app_port")]
    pub app_port: u16,

    #[serde(default = "default_start_command")]
    pub start_command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JenkinsDefaults {
    #[serde(default = "default_jenkins_url")]
    pub url: String,

    #[serde(default = "default_credentials_id")]
    pub credentials_id: String,

    #[serde(default)]
    pub docker_hub_user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GithubDefaults {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

impl Default for TerraformDefaults {
    fn default() -> Self {
        Self {
            region: default_region(),
            instance_type: default_instance_type(),
            key_name: None,
            instance_name: default_instance_name(),
            ssh_cidr: default_ssh_cidr(),
            aws_provider_version: default_aws_provider_version(),
        }
    }
}

impl Default for ContainerDefaults {
    fn default() -> Self {
        Self {
            base_image: default_base_image(),
            app_port: default_app_port(),
            start_command: default_start_command(),
        }
    }
}

impl Default for JenkinsDefaults {
    fn default() -> Self {
        Self {
            url: default_jenkins_url(),
            credentials_id: default_credentials_id(),
            docker_hub_user: None,
        }
    }
}

impl Default for GithubDefaults {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_instance_type() -> String {
    "t2.micro".to_string()
}

fn default_instance_name() -> String {
    "app-server".to_string()
}

fn default_ssh_cidr() -> String {
    "0.0.0.0/0".to_string()
}

fn default_aws_provider_version() -> String {
    "~> 5.0".to_string()
}

fn default_base_image() -> String {
    "node:18-alpine".to_string()
}

fn default_app_port() -> u16 {
    3000
}

fn default_start_command() -> String {
    "npm start".to_string()
}

fn default_jenkins_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_credentials_id() -> String {
    "dockerhub-credentials".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load defaults, merging file config with built-in defaults.
/// If infragen.json is missing or invalid, silently returns built-in defaults.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

/// Load the full infragen.json config, falling back to defaults on any error.
pub fn load_config() -> InfragenConfig {
    load_config_from_file().unwrap_or_default()
}

fn load_config_from_file() -> Result<InfragenConfig> {
    let path = paths::infragen_json()?;

    if !path.exists() {
        return Err(Error::internal_io(
            "infragen.json not found",
            Some(path.display().to_string()),
        ));
    }

    let content = io::read_file(&path, &format!("read {}", path.display()))?;
    parse_config(&content, &path.display().to_string())
}

/// Parse config JSON; every missing field takes its built-in default.
pub fn parse_config(content: &str, origin: &str) -> Result<InfragenConfig> {
    serde_json::from_str(content).map_err(|e| Error::config_invalid_json(origin, e))
}

/// Save config to infragen.json file (creates if missing).
pub fn save_config(config: &InfragenConfig) -> Result<()> {
    let path = paths::infragen_json()?;

    if let Some(parent) = path.parent() {
        io::ensure_dir(parent, &format!("create {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize infragen.json".to_string())))?;

    io::write_file_atomic(&path, &content, &format!("write {}", path.display()))
}

/// Check if infragen.json file exists
pub fn config_exists() -> bool {
    paths::infragen_json()
        .map(|p| p.exists())
        .unwrap_or(false)
}

/// Delete infragen.json file (reset to defaults)
pub fn reset_config() -> Result<bool> {
    let path = paths::infragen_json()?;

    if path.exists() {
        fs::remove_file(&path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("delete {}", path.display())))
        })?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Get the path to infragen.json (for display purposes)
pub fn config_path() -> Result<String> {
    Ok(paths::infragen_json()?.display().to_string())
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> Defaults {
    Defaults::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_builtin_defaults() {
        let config = parse_config("{}", "test").unwrap();
        assert_eq!(config.defaults, builtin_defaults());
        assert_eq!(config.defaults.terraform.region, "us-east-1");
        assert_eq!(config.defaults.container.app_port, 3000);
        assert_eq!(config.defaults.github.api_url, "https://api.github.com");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse_config(
            r#"{"defaults":{"terraform":{"region":"eu-west-2","key_name":"ops"}}}"#,
            "test",
        )
        .unwrap();

        assert_eq!(config.defaults.terraform.region, "eu-west-2");
        assert_eq!(config.defaults.terraform.key_name.as_deref(), Some("ops"));
        assert_eq!(config.defaults.terraform.instance_type, "t2.micro");
        assert_eq!(config.defaults.jenkins.credentials_id, "dockerhub-credentials");
    }

    #[test]
    fn invalid_json_reports_origin() {
        let err = parse_config("{not json", "/tmp/infragen.json").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
        assert_eq!(err.details["path"], "/tmp/infragen.json");
    }
}
