//! String template rendering utilities.
//!
//! Placeholders use `{{name}}`, which never collides with Terraform or
//! Groovy `${...}` interpolation in the generated files.

use regex::{Captures, Regex};
use std::sync::OnceLock;

pub struct TemplateVars;

impl TemplateVars {
    pub const REGION: &'static str = "region";
    pub const INSTANCE_TYPE: &'static str = "instance_type";
    pub const KEY_NAME: &'static str = "key_name";
    pub const INSTANCE_NAME: &'static str = "instance_name";
    pub const SSH_CIDR: &'static str = "ssh_cidr";
    pub const APP_PORT: &'static str = "app_port";
    pub const AWS_PROVIDER_VERSION: &'static str = "aws_provider_version";
    pub const BASE_IMAGE: &'static str = "base_image";
    pub const START_COMMAND: &'static str = "start_command";
    pub const IMAGE: &'static str = "image";
    pub const CONTAINER_NAME: &'static str = "container_name";
    pub const CREDENTIALS_ID: &'static str = "credentials_id";
}

/// Substitute every `{{key}}` in one pass over `template`.
///
/// Substituted values are never scanned again, and placeholders without a
/// variable are left as they are (see [`unresolved`]).
pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            variables
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([a-z_]+)\}\}").expect("valid placeholder regex"))
}

/// Placeholder names left in rendered text, in order of first appearance.
pub fn unresolved(rendered: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in placeholder_pattern().captures_iter(rendered) {
        let name = cap[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
