//! Dry-run execution of the build command.

use crate::error::NixError;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs a build command in plan-only mode and returns what it reported.
#[async_trait]
pub trait DryRunPlanner: Send + Sync {
    /// Run `command` in dry-run mode inside `workdir`, returning its stderr.
    async fn dry_run(&self, workdir: &Path, command: &[String]) -> Result<String>;
}

/// Spawns the build command as a child process
#[derive(Debug, Clone)]
pub struct CommandPlanner {
    dry_run_flag: String,
}

impl CommandPlanner {
    pub fn new(dry_run_flag: &str) -> Self {
        CommandPlanner {
            dry_run_flag: dry_run_flag.to_string(),
        }
    }

    /// Full argv that will be executed for `command`
    pub fn argv(&self, command: &[String]) -> Vec<String> {
        let mut argv = command.to_vec();
        argv.push(self.dry_run_flag.clone());
        argv
    }
}

impl Default for CommandPlanner {
    fn default() -> Self {
        CommandPlanner::new(crate::config::DEFAULT_DRY_RUN_FLAG)
    }
}

#[async_trait]
impl DryRunPlanner for CommandPlanner {
    async fn dry_run(&self, workdir: &Path, command: &[String]) -> Result<String> {
        if command.is_empty() {
            return Err(NixError::EmptyCommand);
        }
        let argv = self.argv(command);
        let (exe, args) = argv.split_first().ok_or(NixError::EmptyCommand)?;

        info!("Running {} in {:?}", argv.join(" "), workdir);
        let output = Command::new(exe)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(NixError::CommandFailed {
                command: argv.join(" "),
                status: output.status.to_string(),
                stderr,
            });
        }

        debug!(bytes = stderr.len(), "dry run finished");
        Ok(stderr)
    }
}
