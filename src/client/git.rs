//! Version control through the `git` executable.

use super::VersionControl;
use crate::models::{GitConfig, Result, ScriptoriumError};
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

/// Drives `git` in a namespace directory.
pub struct GitCli {
    user_name: String,
    user_email: String,
}

impl GitCli {
    pub fn new(config: &GitConfig) -> Self {
        Self {
            user_name: config.user_name.clone(),
            user_email: config.user_email.clone(),
        }
    }

    async fn output(&self, path: &Path, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(path)
            .output()
            .await
            .map_err(|e| ScriptoriumError::io(format!("spawning git {}", args.join(" ")), e))
    }

    /// Run git and fail on a non-zero exit status. Returns trimmed stdout.
    async fn run(&self, path: &Path, args: &[&str]) -> Result<String> {
        let output = self.output(path, args).await?;
        if !output.status.success() {
            return Err(ScriptoriumError::VersionControl {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(command = %args.join(" "), "git ok");
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn current_branch(&self, path: &Path) -> Result<String> {
        let branch = self.run(path, &["branch", "--show-current"]).await?;
        Ok(if branch.is_empty() {
            "main".to_string()
        } else {
            branch
        })
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn ensure_repo(&self, path: &Path) -> Result<()> {
        if path.join(".git").exists() {
            debug!(path = %path.display(), "Using existing git repository");
            return Ok(());
        }

        self.run(path, &["init"]).await?;
        self.run(path, &["config", "user.name", &self.user_name]).await?;
        self.run(path, &["config", "user.email", &self.user_email])
            .await?;
        info!(path = %path.display(), "Initialized git repository");
        Ok(())
    }

    async fn commit(&self, path: &Path, message: &str) -> Result<bool> {
        self.run(path, &["add", "."]).await?;

        let status = self.run(path, &["status", "--porcelain"]).await?;
        if status.is_empty() {
            debug!(path = %path.display(), "Nothing to commit");
            return Ok(false);
        }

        self.run(path, &["commit", "-m", message]).await?;
        Ok(true)
    }

    async fn push(&self, path: &Path, remote_url: &str) -> Result<()> {
        let has_origin = self
            .output(path, &["remote", "get-url", "origin"])
            .await?
            .status
            .success();
        if !has_origin {
            self.run(path, &["remote", "add", "origin", remote_url])
                .await?;
        }

        let mut branch = self.current_branch(path).await?;
        if branch == "master" {
            self.run(path, &["branch", "-M", "main"]).await?;
            branch = "main".to_string();
        }

        self.run(path, &["push", "-u", "origin", &branch]).await?;
        info!(remote = remote_url, branch = %branch, "Pushed course");
        Ok(())
    }
}
