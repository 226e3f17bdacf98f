//! Git plumbing for committing and pushing generated files.

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::utils::command;

/// Run git in `dir`, mapping a non-zero exit to `git.command_failed` with stderr.
fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let context = format!("git {}", args.join(" "));
    let out = command::capture_in(dir, "git", args, &context)?;
    if out.success() {
        return Ok(out.stdout);
    }
    Err(
        Error::git_command_failed(format!("{} failed: {}", context, out.error_text())).with_hint(
            format!("Run '{}' in {} to reproduce", context, dir.display()),
        ),
    )
}

pub fn is_repo(dir: &Path) -> bool {
    command::succeeded_in(dir, "git", &["rev-parse", "--git-dir"])
}

/// Initialise a repository whose unborn branch is `branch`.
pub fn init(dir: &Path, branch: &str) -> Result<()> {
    git(dir, &["init", "--quiet"])?;
    let head = format!("refs/heads/{}", branch);
    git(dir, &["symbolic-ref", "HEAD", &head])?;
    Ok(())
}

pub fn stage_all(dir: &Path) -> Result<()> {
    git(dir, &["add", "--all"]).map(|_| ())
}

pub fn has_staged_changes(dir: &Path) -> bool {
    !command::succeeded_in(dir, "git", &["diff", "--cached", "--quiet"])
}

/// Commit staged changes. Returns the new HEAD sha, or `None` when nothing was staged.
pub fn commit(dir: &Path, message: &str) -> Result<Option<String>> {
    if !has_staged_changes(dir) {
        return Ok(None);
    }
    git(dir, &["commit", "--quiet", "-m", message])?;
    head_sha(dir).map(Some)
}

pub fn head_sha(dir: &Path) -> Result<String> {
    git(dir, &["rev-parse", "HEAD"])
}

pub fn current_branch(dir: &Path) -> Result<String> {
    git(dir, &["symbolic-ref", "--short", "HEAD"])
}

pub fn remote_url(dir: &Path, name: &str) -> Option<String> {
    command::run_in_optional(dir, "git", &["remote", "get-url", name])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteChange {
    Added,
    Updated,
    Unchanged,
}

/// Point `name` at `url`, adding the remote if it does not exist.
pub fn set_remote(dir: &Path, name: &str, url: &str) -> Result<RemoteChange> {
    match remote_url(dir, name) {
        Some(existing) if existing == url => Ok(RemoteChange::Unchanged),
        Some(_) => {
            git(dir, &["remote", "set-url", name, url])?;
            Ok(RemoteChange::Updated)
        }
        None => {
            git(dir, &["remote", "add", name, url])?;
            Ok(RemoteChange::Added)
        }
    }
}

pub fn push(dir: &Path, remote: &str, branch: &str) -> Result<()> {
    crate::log_status!("git", "Pushing {} to {}", branch, remote);
    git(dir, &["push", "--set-upstream", remote, branch]).map(|_| ())
}

/// Owner and repository name of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    /// Parse `owner/name`.
    pub fn parse(value: &str) -> Result<RepoSlug> {
        let invalid = || {
            Error::validation_invalid_argument(
                "repo",
                "Repository must be given as owner/name",
                Some(value.to_string()),
            )
        };
        let (owner, name) = value.trim().split_once('/').ok_or_else(invalid)?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        if !slug_part_pattern().is_match(owner) || !slug_part_pattern().is_match(name) {
            return Err(invalid());
        }
        Ok(RepoSlug {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn slug_part_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap())
}

fn github_remote_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:https://(?:[^@/]+@)?github\.com/|git@github\.com:|ssh://git@github\.com/)([^/]+)/([^/]+?)(?:\.git)?/?$",
        )
        .unwrap()
    })
}

/// Extract owner/name from an HTTPS or SSH GitHub remote URL.
pub fn parse_github_remote(url: &str) -> Result<RepoSlug> {
    let caps = github_remote_pattern()
        .captures(url.trim())
        .ok_or_else(|| {
            Error::validation_invalid_argument(
                "remote",
                "Remote is not a github.com repository URL",
                Some(url.to_string()),
            )
            .with_hint("Pass --repo owner/name explicitly")
        })?;
    RepoSlug::parse(&format!("{}/{}", &caps[1], &caps[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path(), "main").unwrap();
        git(dir.path(), &["config", "user.email", "ci@example.com"]).unwrap();
        git(dir.path(), &["config", "user.name", "CI"]).unwrap();
        dir
    }

    #[test]
    fn parses_https_remote() {
        let slug = parse_github_remote("https://github.com/acme/billing-api.git").unwrap();
        assert_eq!(slug.owner, "acme");
        assert_eq!(slug.name, "billing-api");
    }

    #[test]
    fn parses_ssh_remotes() {
        for url in [
            "git@github.com:acme/billing-api.git",
            "ssh://git@github.com/acme/billing-api",
            "https://token@github.com/acme/billing-api/",
        ] {
            assert_eq!(parse_github_remote(url).unwrap().to_string(), "acme/billing-api");
        }
    }

    #[test]
    fn rejects_non_github_remote() {
        let err = parse_github_remote("https://gitlab.com/acme/app.git").unwrap_err();
        assert_eq!(err.details["field"], "remote");
    }

    #[test]
    fn repo_slug_requires_owner_and_name() {
        assert!(RepoSlug::parse("acme").is_err());
        assert!(RepoSlug::parse("acme/").is_err());
        assert_eq!(RepoSlug::parse("acme/app.git").unwrap().name, "app");
    }

    #[test]
    fn init_uses_requested_branch() {
        let dir = repo();
        assert!(is_repo(dir.path()));
        assert_eq!(current_branch(dir.path()).unwrap(), "main");
    }

    #[test]
    fn commit_skips_when_nothing_staged() {
        let dir = repo();
        stage_all(dir.path()).unwrap();
        assert_eq!(commit(dir.path(), "empty").unwrap(), None);
    }

    #[test]
    fn commit_returns_new_head() {
        let dir = repo();
        fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        stage_all(dir.path()).unwrap();

        let sha = commit(dir.path(), "Add CI pipeline").unwrap().unwrap();

        assert_eq!(sha, head_sha(dir.path()).unwrap());
        assert!(!has_staged_changes(dir.path()));
    }

    #[test]
    fn set_remote_adds_then_updates() {
        let dir = repo();
        let a = "git@github.com:acme/a.git";
        let b = "git@github.com:acme/b.git";

        assert_eq!(set_remote(dir.path(), "origin", a).unwrap(), RemoteChange::Added);
        assert_eq!(set_remote(dir.path(), "origin", a).unwrap(), RemoteChange::Unchanged);
        assert_eq!(set_remote(dir.path(), "origin", b).unwrap(), RemoteChange::Updated);
        assert_eq!(remote_url(dir.path(), "origin").as_deref(), Some(b));
    }

    #[test]
    fn failing_git_command_reports_stderr() {
        let dir = repo();
        let err = push(dir.path(), "nowhere", "main").unwrap_err();
        assert_eq!(err.code.as_str(), "git.command_failed");
        assert!(err.message.contains("git push"));
    }
}
