use heck::ToKebabCase;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::scaffold::ScaffoldFile;
use crate::utils::template::{self, TemplateVars};
use crate::utils::validation;

pub const JENKINSFILE: &str = "Jenkinsfile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JenkinsfileSettings {
    pub docker_hub_user: String,
    pub repo_name: String,
    pub app_port: u16,
    pub credentials_id: String,
}

fn docker_user_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]{4,30}$").unwrap())
}

fn credentials_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap())
}

impl JenkinsfileSettings {
    /// Docker image names must be lower case; `My_Service` becomes `my-service`.
    pub fn image_repo(&self) -> String {
        self.repo_name.to_kebab_case()
    }

    pub fn image(&self) -> String {
        format!("{}/{}", self.docker_hub_user, self.image_repo())
    }

    pub fn validate(&self) -> Result<()> {
        validation::require_match(
            &self.docker_hub_user,
            docker_user_pattern(),
            "docker_hub_user",
            "Docker Hub user names are 4-30 lower-case letters or digits",
        )?;
        validation::require_non_empty(&self.repo_name, "repo_name", "Repository name cannot be empty")?;
        if self.image_repo().is_empty() {
            return Err(Error::validation_invalid_argument(
                "repo_name",
                "Repository name must contain at least one letter or digit",
                Some(self.repo_name.clone()),
            ));
        }
        validation::require_match(
            &self.credentials_id,
            credentials_id_pattern(),
            "credentials_id",
            "Credentials id may only contain letters, digits, '.', '_' and '-'",
        )?;
        validation::require_port(u32::from(self.app_port), "app_port")?;
        Ok(())
    }
}

pub fn render_jenkinsfile(settings: &JenkinsfileSettings) -> Result<String> {
    settings.validate()?;

    let image = settings.image();
    let container = settings.image_repo();
    let port = settings.app_port.to_string();

    Ok(template::render(
        JENKINSFILE_TEMPLATE,
        &[
            (TemplateVars::IMAGE, &image),
            (TemplateVars::CONTAINER_NAME, &container),
            (TemplateVars::APP_PORT, &port),
            (TemplateVars::CREDENTIALS_ID, &settings.credentials_id),
        ],
    ))
}

pub fn files(settings: &JenkinsfileSettings) -> Result<Vec<ScaffoldFile>> {
    Ok(vec![ScaffoldFile::new(
        JENKINSFILE,
        render_jenkinsfile(settings)?,
    )])
}

const JENKINSFILE_TEMPLATE: &str = r#"pipeline {
    agent any

    environment {
        IMAGE = '{{image}}'
        CONTAINER = '{{container_name}}'
        APP_PORT = '{{app_port}}'
    }

    triggers {
        githubPush()
    }

    stages {
        stage('Checkout') {
            steps {
                checkout scm
            }
        }

        stage('Build Image') {
            steps {
                sh 'docker build -t ${IMAGE}:${BUILD_NUMBER} -t ${IMAGE}:latest .'
            }
        }

        stage('Push Image') {
            steps {
                withCredentials([usernamePassword(credentialsId: '{{credentials_id}}', usernameVariable: 'DOCKER_USER', passwordVariable: 'DOCKER_PASS')]) {
                    sh 'echo "$DOCKER_PASS" | docker login -u "$DOCKER_USER" --password-stdin'
                    sh 'docker push ${IMAGE}:${BUILD_NUMBER}'
                    sh 'docker push ${IMAGE}:latest'
                }
            }
        }

        stage('Deploy') {
            steps {
                sh 'docker rm -f ${CONTAINER} || true'
                sh 'docker run -d --name ${CONTAINER} --restart unless-stopped -p ${APP_PORT}:${APP_PORT} ${IMAGE}:latest'
            }
        }
    }

    post {
        always {
            sh 'docker logout || true'
        }
    }
}
"#;
