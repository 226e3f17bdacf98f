use clap::Args;
use serde::Serialize;

use infragen::defaults;
use infragen::git::{self, RepoSlug};
use infragen::github::{self, GitHubClient, TokenSource, WebhookOutcome, WebhookRequest};
use infragen::paths;
use infragen::pipeline::DEFAULT_REMOTE;

use super::CmdResult;

#[derive(Args)]
pub struct WebhookArgs {
    /// Jenkins base URL (default from config, e.g. http://localhost:8080)
    #[arg(long)]
    pub jenkins_url: Option<String>,

    /// GitHub repository as owner/name (default: derived from the remote)
    #[arg(long)]
    pub repo: Option<String>,

    /// Repository directory used to look up the remote (default: current directory)
    #[arg(long)]
    pub dir: Option<String>,

    /// Remote name used to derive the repository
    #[arg(long, default_value = DEFAULT_REMOTE)]
    pub remote: String,

    /// GitHub personal access token (falls back to GITHUB_TOKEN, keychain, prompt)
    #[arg(long)]
    pub token: Option<String>,

    /// Secret GitHub signs deliveries with
    #[arg(long)]
    pub secret: Option<String>,

    /// Store the token in the system keychain for later runs
    #[arg(long)]
    pub save_token: bool,

    /// Remove the stored token from the keychain before resolving one
    #[arg(long, conflicts_with = "save_token")]
    pub forget_token: bool,

    /// Resolve the repository and hook URL without calling GitHub
    #[arg(long)]
    pub dry_run: bool,

    /// Never prompt for the token
    #[arg(long)]
    pub no_input: bool,
}

#[derive(Debug, Serialize)]
pub struct WebhookOutput {
    pub command: &'static str,
    pub generated_at: String,
    #[serde(flatten)]
    pub webhook: WebhookOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_source: Option<TokenSource>,
    pub token_saved: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub token_forgotten: bool,
}

/// Token from flag, environment, keychain, or (when interactive) a prompt.
pub(crate) fn resolve_token(
    flag: Option<String>,
    interactive: bool,
) -> infragen::Result<(String, TokenSource)> {
    github::resolve_token(flag, || {
        if interactive {
            crate::tty::prompt_secret("GitHub personal access token: ").map(Some)
        } else {
            Ok(None)
        }
    })
}

pub fn run(args: WebhookArgs) -> CmdResult<WebhookOutput> {
    let defaults = defaults::load_defaults();
    let dir = paths::target_dir(args.dir.as_deref())?;

    let request = WebhookRequest {
        jenkins_url: args.jenkins_url.unwrap_or(defaults.jenkins.url),
        secret: args.secret,
    };

    let slug = match args.repo.as_deref() {
        Some(repo) => RepoSlug::parse(repo)?,
        None => {
            let url = git::remote_url(&dir, &args.remote).ok_or_else(|| {
                infragen::Error::validation_missing_argument(vec!["repo".to_string()])
                    .with_hint(format!(
                        "No '{}' remote in {}; pass --repo owner/name",
                        args.remote,
                        dir.display()
                    ))
            })?;
            git::parse_github_remote(&url)?
        }
    };

    if args.dry_run {
        return Ok((
            WebhookOutput {
                command: "webhook",
                generated_at: super::generated_at(),
                webhook: github::plan_push_webhook(&slug, &request)?,
                token_source: None,
                token_saved: false,
                token_forgotten: false,
            },
            0,
        ));
    }

    if args.forget_token {
        github::forget_token()?;
    }

    let (token, source) = resolve_token(args.token, super::interactive(args.no_input))?;
    let client = GitHubClient::new(&defaults.github.api_url, &token)?;
    let webhook = github::ensure_push_webhook(&client, &slug, &request)?;

    let token_saved = args.save_token && source != TokenSource::Keychain;
    if token_saved {
        github::save_token(&token)?;
    }

    Ok((
        WebhookOutput {
            command: "webhook",
            generated_at: super::generated_at(),
            webhook,
            token_source: Some(source),
            token_saved,
            token_forgotten: args.forget_token,
        },
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: WebhookArgs,
    }

    fn parse(argv: &[&str]) -> Result<WebhookArgs, clap::Error> {
        Harness::try_parse_from(std::iter::once("webhook").chain(argv.iter().copied()))
            .map(|h| h.args)
    }

    #[test]
    fn forget_and_save_token_conflict() {
        assert!(parse(&["--forget-token", "--save-token"]).is_err());
        assert!(parse(&["--forget-token"]).unwrap().forget_token);
    }

    #[test]
    fn dry_run_leaves_keychain_alone() {
        let args = parse(&[
            "--repo",
            "acme/billing-api",
            "--jenkins-url",
            "http://ci.example.com:8080",
            "--forget-token",
            "--dry-run",
            "--no-input",
        ])
        .unwrap();

        let (output, code) = run(args).unwrap();

        assert_eq!(code, 0);
        assert!(!output.token_forgotten);
        assert_eq!(output.webhook.url, "http://ci.example.com:8080/github-webhook/");
        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("token_forgotten").is_none());
    }
}
