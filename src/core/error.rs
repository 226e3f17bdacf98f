use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,

    ToolNotFound,
    ToolInstallFailed,

    GitCommandFailed,

    GithubAuthFailed,
    GithubRepoNotFound,
    GithubValidationFailed,
    GithubApiError,
    GithubRequestFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::ToolNotFound => "tool.not_found",
            ErrorCode::ToolInstallFailed => "tool.install_failed",

            ErrorCode::GitCommandFailed => "git.command_failed",

            ErrorCode::GithubAuthFailed => "github.auth_failed",
            ErrorCode::GithubRepoNotFound => "github.repo_not_found",
            ErrorCode::GithubValidationFailed => "github.validation_failed",
            ErrorCode::GithubApiError => "github.api_error",
            ErrorCode::GithubRequestFailed => "github.request_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubApiErrorDetails {
    pub status: u16,
    pub endpoint: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            format!("Missing required argument: {}", args.join(", ")),
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            problem.clone(),
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem,
                value,
            }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            serde_json::json!({ "path": path.into(), "error": err.to_string() }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            }),
        )
    }

    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        Self::new(
            ErrorCode::ToolNotFound,
            format!("Required tool '{}' is not installed", tool),
            serde_json::json!({ "tool": tool }),
        )
        .with_hint(format!("Run 'infragen tools install {}'", tool))
    }

    pub fn tool_install_failed(tool: impl Into<String>, details: CommandFailedDetails) -> Self {
        let tool = tool.into();
        let mut value = to_details(details);
        if let Value::Object(map) = &mut value {
            map.insert("tool".to_string(), Value::String(tool.clone()));
        }
        Self::new(
            ErrorCode::ToolInstallFailed,
            format!("Failed to install {}", tool),
            value,
        )
    }

    pub fn git_command_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GitCommandFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn github_request_failed(error: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GithubRequestFailed,
            "GitHub request failed",
            serde_json::json!({ "error": error.into(), "endpoint": endpoint.into() }),
        )
    }

    /// Map a non-success GitHub response onto a specific error code.
    pub fn github_status(status: u16, endpoint: impl Into<String>, body: impl Into<String>) -> Self {
        let details = to_details(GithubApiErrorDetails {
            status,
            endpoint: endpoint.into(),
            body: body.into(),
        });

        match status {
            401 | 403 => Self::new(
                ErrorCode::GithubAuthFailed,
                "GitHub rejected the access token",
                details,
            )
            .with_hint("The token needs the 'admin:repo_hook' (or 'repo') scope")
            .with_hint("Pass --token, set GITHUB_TOKEN, or re-run with --save-token"),
            404 => Self::new(
                ErrorCode::GithubRepoNotFound,
                "GitHub repository not found or not accessible",
                details,
            )
            .with_hint("Check --repo (owner/name) and that the token can see the repository"),
            422 => Self::new(
                ErrorCode::GithubValidationFailed,
                "GitHub rejected the webhook definition",
                details,
            ),
            _ => Self::new(
                ErrorCode::GithubApiError,
                format!("GitHub API error: HTTP {}", status),
                details,
            ),
        }
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
