//! GitHub REST client for registering the Jenkins push webhook.

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::git::RepoSlug;
use crate::keychain;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const API_VERSION: &str = "2022-11-28";
const HOOK_PATH: &str = "github-webhook/";

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
const TOKEN_SCOPE: &str = "github";
const TOKEN_NAME: &str = "token";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_ssl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateHookBody {
    pub name: &'static str,
    pub active: bool,
    pub events: Vec<String>,
    pub config: HookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    pub id: u64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub events: Vec<String>,
    pub config: HookConfig,
}

/// What the caller wants registered.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub jenkins_url: String,
    pub secret: Option<String>,
}

impl WebhookRequest {
    pub fn hook_url(&self) -> Result<String> {
        jenkins_hook_url(&self.jenkins_url)
    }

    pub fn body(&self) -> Result<CreateHookBody> {
        Ok(CreateHookBody {
            name: "web",
            active: true,
            events: vec!["push".to_string()],
            config: HookConfig {
                url: Some(self.hook_url()?),
                content_type: Some("json".to_string()),
                insecure_ssl: Some("0".to_string()),
                secret: self.secret.clone(),
            },
        })
    }
}

/// Normalise a Jenkins base URL to its GitHub plugin endpoint (`.../github-webhook/`).
pub fn jenkins_hook_url(jenkins_url: &str) -> Result<String> {
    let trimmed = jenkins_url.trim();
    let has_scheme = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    if !has_scheme || trimmed.contains(char::is_whitespace) {
        return Err(Error::validation_invalid_argument(
            "jenkins_url",
            "Jenkins URL must start with http:// or https://",
            Some(jenkins_url.to_string()),
        ));
    }

    let base = trimmed.trim_end_matches('/');
    if base.ends_with("/github-webhook") {
        return Ok(format!("{}/", base));
    }
    Ok(format!("{}/{}", base, HOOK_PATH))
}

pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::validation_missing_argument(vec!["token".to_string()]));
        }

        let client = Client::builder()
            .user_agent(format!("infragen/{}", VERSION))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    fn hooks_endpoint(&self, slug: &RepoSlug) -> String {
        format!("{}/repos/{}/{}/hooks", self.api_url, slug.owner, slug.name)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> Result<T> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|e| Error::github_request_failed(e.to_string(), endpoint))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::github_request_failed(e.to_string(), endpoint))?;

        if !status.is_success() {
            return Err(Error::github_status(status.as_u16(), endpoint, body));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::internal_json(e.to_string(), Some(format!("parse response from {}", endpoint)))
        })
    }

    pub fn list_hooks(&self, slug: &RepoSlug) -> Result<Vec<Hook>> {
        let endpoint = self.hooks_endpoint(slug);
        let request = self.client.get(&endpoint).query(&[("per_page", "100")]);
        self.send(request, &endpoint)
    }

    pub fn create_hook(&self, slug: &RepoSlug, body: &CreateHookBody) -> Result<Hook> {
        let endpoint = self.hooks_endpoint(slug);
        let request = self.client.post(&endpoint).json(body);
        self.send(request, &endpoint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Created,
    Exists,
    Planned,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookOutcome {
    pub repo: String,
    pub url: String,
    pub status: WebhookStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<u64>,
}

pub fn find_hook<'a>(hooks: &'a [Hook], url: &str) -> Option<&'a Hook> {
    hooks
        .iter()
        .find(|h| h.config.url.as_deref() == Some(url))
}

/// Register the push webhook unless one with the same URL already exists.
pub fn ensure_push_webhook(
    client: &GitHubClient,
    slug: &RepoSlug,
    request: &WebhookRequest,
) -> Result<WebhookOutcome> {
    let body = request.body()?;
    let url = request.hook_url()?;

    let existing = client.list_hooks(slug)?;
    if let Some(hook) = find_hook(&existing, &url) {
        crate::log_status!("webhook", "{} already notifies {}", slug, url);
        return Ok(WebhookOutcome {
            repo: slug.to_string(),
            url,
            status: WebhookStatus::Exists,
            hook_id: Some(hook.id),
        });
    }

    let hook = client.create_hook(slug, &body)?;
    crate::log_status!("webhook", "Created hook {} on {}", hook.id, slug);

    Ok(WebhookOutcome {
        repo: slug.to_string(),
        url,
        status: WebhookStatus::Created,
        hook_id: Some(hook.id),
    })
}

/// Outcome for `--dry-run`: validates the request without any HTTP call.
pub fn plan_push_webhook(slug: &RepoSlug, request: &WebhookRequest) -> Result<WebhookOutcome> {
    Ok(WebhookOutcome {
        repo: slug.to_string(),
        url: request.hook_url()?,
        status: WebhookStatus::Planned,
        hook_id: None,
    })
}

// ============================================================================
// Token resolution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    Flag,
    Env,
    Keychain,
    Prompt,
}

/// Resolve the personal access token: flag, `GITHUB_TOKEN`, keychain, then `prompt`.
pub fn resolve_token<F>(flag: Option<String>, prompt: F) -> Result<(String, TokenSource)>
where
    F: FnOnce() -> Result<Option<String>>,
{
    // A missing keychain backend is not fatal; fall through to the prompt.
    let stored = || keychain::get(TOKEN_SCOPE, TOKEN_NAME).ok().flatten();
    resolve_token_from(flag, std::env::var(TOKEN_ENV).ok(), stored, prompt)
}

fn resolve_token_from<K, F>(
    flag: Option<String>,
    env: Option<String>,
    stored: K,
    prompt: F,
) -> Result<(String, TokenSource)>
where
    K: FnOnce() -> Option<String>,
    F: FnOnce() -> Result<Option<String>>,
{
    let non_empty = |v: String| {
        let v = v.trim().to_string();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    };

    if let Some(token) = flag.and_then(non_empty) {
        return Ok((token, TokenSource::Flag));
    }
    if let Some(token) = env.and_then(non_empty) {
        return Ok((token, TokenSource::Env));
    }
    if let Some(token) = stored().and_then(non_empty) {
        return Ok((token, TokenSource::Keychain));
    }
    if let Some(token) = prompt()?.and_then(non_empty) {
        return Ok((token, TokenSource::Prompt));
    }

    Err(Error::validation_missing_argument(vec!["token".to_string()])
        .with_hint(format!("Pass --token or set {}", TOKEN_ENV)))
}

pub fn save_token(token: &str) -> Result<()> {
    keychain::store(TOKEN_SCOPE, TOKEN_NAME, token)
}

pub fn forget_token() -> Result<()> {
    keychain::delete(TOKEN_SCOPE, TOKEN_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::runtime::Runtime;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HOOKS_PATH: &str = "/repos/acme/billing-api/hooks";

    /// A mock GitHub API. The server runs on its own thread, so the blocking
    /// client can be driven from the test thread.
    struct MockGitHub {
        server: MockServer,
        runtime: Runtime,
    }

    impl MockGitHub {
        fn start() -> Self {
            let runtime = Runtime::new().unwrap();
            let server = runtime.block_on(MockServer::start());
            Self { server, runtime }
        }

        fn mount(&self, mock: Mock) {
            self.runtime.block_on(mock.mount(&self.server));
        }

        fn client(&self, token: &str) -> GitHubClient {
            GitHubClient::new(&self.server.uri(), token).unwrap()
        }

        fn verify(&self) {
            self.runtime.block_on(self.server.verify());
        }
    }

    fn authorized(verb: &str, token: &str) -> wiremock::MockBuilder {
        Mock::given(method(verb))
            .and(path(HOOKS_PATH))
            .and(header("Authorization", format!("Bearer {}", token).as_str()))
            .and(header("Accept", "application/vnd.github+json"))
            .and(header("X-GitHub-Api-Version", API_VERSION))
    }

    fn slug() -> RepoSlug {
        RepoSlug::parse("acme/billing-api").unwrap()
    }

    fn request() -> WebhookRequest {
        WebhookRequest {
            jenkins_url: "http://ci.example.com:8080".to_string(),
            secret: None,
        }
    }

    #[test]
    fn hook_url_appends_plugin_path_once() {
        assert_eq!(
            jenkins_hook_url("http://ci.example.com:8080").unwrap(),
            "http://ci.example.com:8080/github-webhook/"
        );
        assert_eq!(
            jenkins_hook_url("https://ci.example.com/jenkins/").unwrap(),
            "https://ci.example.com/jenkins/github-webhook/"
        );
        assert_eq!(
            jenkins_hook_url("https://ci.example.com/github-webhook").unwrap(),
            "https://ci.example.com/github-webhook/"
        );
    }

    #[test]
    fn hook_url_requires_http_scheme() {
        let err = jenkins_hook_url("ci.example.com").unwrap_err();
        assert_eq!(err.details["field"], "jenkins_url");
    }

    #[test]
    fn body_matches_github_hook_schema() {
        let body = serde_json::to_value(request().body().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "web",
                "active": true,
                "events": ["push"],
                "config": {
                    "url": "http://ci.example.com:8080/github-webhook/",
                    "content_type": "json",
                    "insecure_ssl": "0"
                }
            })
        );
    }

    #[test]
    fn body_includes_secret_when_given() {
        let mut req = request();
        req.secret = Some("s3cret".to_string());
        let body = serde_json::to_value(req.body().unwrap()).unwrap();
        assert_eq!(body["config"]["secret"], "s3cret");
    }

    #[test]
    fn creates_hook_when_none_match() {
        let github = MockGitHub::start();
        github.mount(
            authorized("GET", "ghp_test")
                .and(query_param("per_page", "100"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                    { "id": 1, "active": true, "events": ["push"], "config": { "url": "https://other/" } }
                ])))
                .expect(1),
        );
        github.mount(
            authorized("POST", "ghp_test")
                .and(body_json(json!({
                    "name": "web",
                    "active": true,
                    "events": ["push"],
                    "config": {
                        "url": "http://ci.example.com:8080/github-webhook/",
                        "content_type": "json",
                        "insecure_ssl": "0"
                    }
                })))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "id": 42,
                    "active": true,
                    "events": ["push"],
                    "config": { "url": "http://ci.example.com:8080/github-webhook/", "content_type": "json" }
                })))
                .expect(1),
        );

        let outcome = ensure_push_webhook(&github.client("ghp_test"), &slug(), &request()).unwrap();

        assert_eq!(outcome.status, WebhookStatus::Created);
        assert_eq!(outcome.hook_id, Some(42));
        assert_eq!(outcome.repo, "acme/billing-api");
        github.verify();
    }

    #[test]
    fn skips_post_when_hook_exists() {
        let github = MockGitHub::start();
        github.mount(
            authorized("GET", "ghp_test")
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                    { "id": 7, "active": true, "events": ["push"], "config": { "url": "http://ci.example.com:8080/github-webhook/" } }
                ])))
                .expect(1),
        );
        github.mount(
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(201))
                .expect(0),
        );

        let outcome = ensure_push_webhook(&github.client("ghp_test"), &slug(), &request()).unwrap();

        assert_eq!(outcome.status, WebhookStatus::Exists);
        assert_eq!(outcome.hook_id, Some(7));
        github.verify();
    }

    #[test]
    fn unauthorized_maps_to_auth_failed() {
        let github = MockGitHub::start();
        github.mount(
            authorized("GET", "ghp_bad")
                .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"Bad credentials"}"#)),
        );

        let err = ensure_push_webhook(&github.client("ghp_bad"), &slug(), &request()).unwrap_err();

        assert_eq!(err.code.as_str(), "github.auth_failed");
        assert_eq!(err.details["body"], r#"{"message":"Bad credentials"}"#);
    }

    #[test]
    fn missing_repository_maps_to_repo_not_found() {
        let github = MockGitHub::start();
        github.mount(
            authorized("GET", "ghp_test")
                .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Not Found"}"#)),
        );

        let err = ensure_push_webhook(&github.client("ghp_test"), &slug(), &request()).unwrap_err();

        assert_eq!(err.code.as_str(), "github.repo_not_found");
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(GitHubClient::new("https://api.github.com", "  ").is_err());
    }

    #[test]
    fn plan_reports_hook_url_without_network() {
        let outcome = plan_push_webhook(&slug(), &request()).unwrap();
        assert_eq!(outcome.status, WebhookStatus::Planned);
        assert_eq!(outcome.url, "http://ci.example.com:8080/github-webhook/");
    }

    fn no_keychain() -> Option<String> {
        None
    }

    fn no_prompt() -> Result<Option<String>> {
        Ok(None)
    }

    #[test]
    fn flag_token_wins() {
        let (token, source) = resolve_token_from(
            Some(" ghp_flag ".to_string()),
            Some("ghp_env".to_string()),
            || panic!("keychain consulted"),
            || panic!("prompted"),
        )
        .unwrap();
        assert_eq!(token, "ghp_flag");
        assert_eq!(source, TokenSource::Flag);
    }

    #[test]
    fn env_token_beats_keychain_and_prompt() {
        let (token, source) = resolve_token_from(
            None,
            Some("ghp_env".to_string()),
            || panic!("keychain consulted"),
            || panic!("prompted"),
        )
        .unwrap();
        assert_eq!(token, "ghp_env");
        assert_eq!(source, TokenSource::Env);
    }

    #[test]
    fn keychain_token_beats_prompt() {
        let (token, source) = resolve_token_from(
            None,
            None,
            || Some("ghp_stored".to_string()),
            || panic!("prompted"),
        )
        .unwrap();
        assert_eq!(token, "ghp_stored");
        assert_eq!(source, TokenSource::Keychain);
    }

    #[test]
    fn blank_env_token_falls_through_to_keychain() {
        let (token, source) = resolve_token_from(
            None,
            Some("   ".to_string()),
            || Some("ghp_stored".to_string()),
            no_prompt,
        )
        .unwrap();
        assert_eq!(token, "ghp_stored");
        assert_eq!(source, TokenSource::Keychain);
    }

    #[test]
    fn prompt_is_last_resort() {
        let (token, source) = resolve_token_from(
            Some(String::new()),
            None,
            no_keychain,
            || Ok(Some("ghp_typed\n".to_string())),
        )
        .unwrap();
        assert_eq!(token, "ghp_typed");
        assert_eq!(source, TokenSource::Prompt);
    }

    #[test]
    fn no_token_anywhere_is_missing_argument() {
        let err = resolve_token_from(None, None, no_keychain, no_prompt).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.missing_argument");
        assert!(err.hints.iter().any(|h| h.message.contains(TOKEN_ENV)));
    }
}
