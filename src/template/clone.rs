use std::path::Path;
use std::process::{Command, Output};

use crate::error::{CreateError, Result};
use crate::log::Log;

/// The version-control operations the pipeline needs.
pub trait VersionControl {
    /// Clone `url` into `dest`, which must not exist or be empty.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Point the `origin` remote of the repository at `repo` to `url`.
    fn set_remote_url(&self, repo: &Path, url: &str) -> Result<()>;

    /// The configured user e-mail, if any.
    fn user_email(&self) -> Result<Option<String>>;
}

/// Drives the system `git` binary so that the user's credential helpers,
/// SSH agent and proxy settings apply unchanged.
pub struct GitCli {
    program: String,
    log: Log,
}

impl GitCli {
    pub fn new(program: impl Into<String>, log: Log) -> Self {
        Self {
            program: program.into(),
            log,
        }
    }

    fn output(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.env("GIT_TERMINAL_PROMPT", "0").args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        self.log.debug(format!("running {} {}", self.program, args.join(" ")));

        let output = cmd.output().map_err(|e| CreateError::ToolSpawn {
            command: self.program.clone(),
            args: owned(args),
            source: e,
        })?;

        self.log
            .tool_stderr(&self.program, &String::from_utf8_lossy(&output.stderr));

        Ok(output)
    }

    fn run(&self, args: &[&str], cwd: Option<&Path>, classify: fn(&str) -> String) -> Result<()> {
        let output = self.output(args, cwd)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(CreateError::ToolFailed {
            command: self.program.clone(),
            args: owned(args),
            status: output.status.code(),
            reason: classify(stderr.trim()),
        })
    }
}

impl VersionControl for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        self.run(&["clone", url, &dest], None, classify_clone_error)
    }

    fn set_remote_url(&self, repo: &Path, url: &str) -> Result<()> {
        self.run(
            &["remote", "set-url", "origin", url],
            Some(repo),
            |stderr| stderr.to_string(),
        )
    }

    fn user_email(&self) -> Result<Option<String>> {
        let output = self.output(&["config", "--get", "user.email"], None)?;
        if !output.status.success() {
            return Ok(None);
        }
        let email = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(email).filter(|e| !e.is_empty()))
    }
}

/// The clone URL with the template name swapped for the project name.
pub fn remote_url(clone_url: &str, template: &str, project_name: &str) -> String {
    clone_url.replacen(template, project_name, 1)
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Classify git stderr output into a user-friendly error message with
/// actionable suggestions for common failure modes.
fn classify_clone_error(stderr: &str) -> String {
    if stderr.contains("Authentication failed") || stderr.contains("could not read Username") {
        format!("authentication failed; configure git credentials or set up SSH keys\n\ngit output:\n{stderr}")
    } else if stderr.contains("Repository not found")
        || (stderr.contains("not found") && stderr.contains("repository"))
    {
        format!("repository not found; the registry may point at a moved repository\n\ngit output:\n{stderr}")
    } else if stderr.contains("already exists and is not an empty directory") {
        format!("the project directory already has content; choose a new directory\n\ngit output:\n{stderr}")
    } else if stderr.contains("Could not resolve host") || stderr.contains("Connection refused") {
        format!(
            "network error; check your connection and the repository URL\n\ngit output:\n{stderr}"
        )
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_url_swaps_first_template_occurrence() {
        assert_eq!(
            remote_url(
                "https://git.example.com/ut/ut-microservice.git",
                "ut-microservice",
                "ut-billing"
            ),
            "https://git.example.com/ut/ut-billing.git"
        );
    }

    #[test]
    fn remote_url_without_template_is_unchanged() {
        assert_eq!(
            remote_url("https://git.example.com/other.git", "ut-port-template", "ut-tcp"),
            "https://git.example.com/other.git"
        );
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let git = GitCli::new("definitely-not-a-real-git-binary", Log::new());
        let dest = tempfile::tempdir().unwrap();
        let err = git
            .clone_repo("https://example.invalid/repo.git", &dest.path().join("x"))
            .unwrap_err();
        match err {
            CreateError::ToolSpawn { command, args, .. } => {
                assert_eq!(command, "definitely-not-a-real-git-binary");
                assert_eq!(args[0], "clone");
            }
            other => panic!("expected ToolSpawn, got: {other:?}"),
        }
    }

    #[test]
    fn classify_auth_failure() {
        let msg = classify_clone_error(
            "fatal: Authentication failed for 'https://github.com/org/repo.git'",
        );
        assert!(msg.contains("configure git credentials"));
    }

    #[test]
    fn classify_repo_not_found() {
        let msg =
            classify_clone_error("fatal: repository 'https://github.com/org/repo.git/' not found");
        assert!(msg.contains("repository not found"));
    }

    #[test]
    fn classify_non_empty_destination() {
        let msg = classify_clone_error(
            "fatal: destination path 'ut-a' already exists and is not an empty directory.",
        );
        assert!(msg.contains("choose a new directory"));
    }

    #[test]
    fn classify_network_error() {
        let msg =
            classify_clone_error("fatal: unable to access: Could not resolve host: github.com");
        assert!(msg.contains("network error"));
    }

    #[test]
    fn classify_unknown_error() {
        let msg = classify_clone_error("fatal: something unexpected happened");
        assert_eq!(msg, "fatal: something unexpected happened");
    }
}
