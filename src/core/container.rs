use serde::Serialize;

use crate::error::{Error, Result};
use crate::scaffold::ScaffoldFile;
use crate::utils::template::{self, TemplateVars};
use crate::utils::validation;

pub const DOCKERFILE: &str = "Dockerfile";
pub const DOCKERIGNORE: &str = ".dockerignore";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockerfileSettings {
    pub base_image: String,
    pub app_port: u16,
    pub start_command: String,
}

impl DockerfileSettings {
    pub fn validate(&self) -> Result<()> {
        let image = validation::require_non_empty(
            &self.base_image,
            "base_image",
            "Base image cannot be empty",
        )?;
        if image.contains(|c: char| c.is_whitespace() || c == '{' || c == '}') {
            return Err(Error::validation_invalid_argument(
                "base_image",
                "Base image cannot contain whitespace or braces",
                Some(self.base_image.clone()),
            ));
        }
        validation::require_non_empty(
            &self.start_command,
            "start_command",
            "Start command cannot be empty",
        )?;
        validation::require_port(u32::from(self.app_port), "app_port")?;
        Ok(())
    }
}

/// Render the exec-form CMD array, e.g. `npm start` -> `["npm", "start"]`.
fn exec_form(command: &str) -> String {
    let parts: Vec<String> = command
        .split_whitespace()
        .map(|part| serde_json::Value::String(part.to_string()).to_string())
        .collect();
    format!("[{}]", parts.join(", "))
}

pub fn render_dockerfile(settings: &DockerfileSettings) -> Result<String> {
    settings.validate()?;

    let port = settings.app_port.to_string();
    let cmd = exec_form(&settings.start_command);

    Ok(template::render(
        DOCKERFILE_TEMPLATE,
        &[
            (TemplateVars::BASE_IMAGE, settings.base_image.trim()),
            (TemplateVars::APP_PORT, &port),
            (TemplateVars::START_COMMAND, &cmd),
        ],
    ))
}

/// Dockerfile plus `.dockerignore`.
pub fn files(settings: &DockerfileSettings) -> Result<Vec<ScaffoldFile>> {
    Ok(vec![
        ScaffoldFile::new(DOCKERFILE, render_dockerfile(settings)?),
        ScaffoldFile::new(DOCKERIGNORE, DOCKERIGNORE_TEMPLATE),
    ])
}

const DOCKERFILE_TEMPLATE: &str = r#"FROM {{base_image}}

WORKDIR /app

COPY package*.json ./
RUN npm install --omit=dev

COPY . .

ENV PORT={{app_port}}
EXPOSE {{app_port}}

CMD {{start_command}}
"#;

const DOCKERIGNORE_TEMPLATE: &str = r#".git
node_modules
npm-debug.log
Dockerfile
Jenkinsfile
.terraform
*.tfstate
*.pem
"#;
