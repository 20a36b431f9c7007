//! Helm command execution.
//!
//! A builder over the `helm` binary: the harness never links a chart
//! renderer, it shells out the way an operator's install docs do.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors raised while running helm.
#[derive(Error, Debug)]
pub enum HelmError {
    /// The process could not be spawned or driven.
    #[error("failed to run helm: {0}")]
    Io(#[from] std::io::Error),

    /// Helm exited with a non-zero status.
    #[error("helm exited with {code:?}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    Failed {
        /// Exit code, when the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The configured time budget ran out; the process is killed.
    #[error("helm timed out after {0:?}")]
    TimedOut(Duration),
}

/// Captured output of a successful helm run.
#[derive(Debug, Clone)]
pub struct HelmOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error; helm writes progress here even on success.
    pub stderr: String,
}

/// Builder for a single helm invocation.
#[derive(Debug, Clone, Default)]
pub struct HelmCommand {
    namespace: Option<String>,
    kubeconfig: Option<String>,
    kube_context: Option<String>,
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdin: Option<String>,
    timeout: Option<Duration>,
}

impl HelmCommand {
    /// Start a command with the given helm arguments.
    #[must_use]
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Scope the invocation to a namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Point helm at an explicit kubeconfig.
    #[must_use]
    pub fn kubeconfig(mut self, path: impl Into<String>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Select a kubeconfig context; only honored alongside a kubeconfig.
    #[must_use]
    pub fn kube_context(mut self, context: impl Into<String>) -> Self {
        self.kube_context = Some(context.into());
        self
    }

    /// Append an environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Feed data to helm's stdin.
    #[must_use]
    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Bound the run; on expiry the process is killed and
    /// [`HelmError::TimedOut`] returned.
    #[must_use]
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    fn argv(&self) -> Vec<String> {
        let mut argv = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            argv.push(format!("--kubeconfig={kubeconfig}"));
            if let Some(context) = &self.kube_context {
                argv.push(format!("--kube-context={context}"));
            }
        }
        if let Some(namespace) = &self.namespace {
            argv.push(format!("--namespace={namespace}"));
        }
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Run helm and capture both output streams.
    ///
    /// # Errors
    /// Returns [`HelmError`] on spawn failure, non-zero exit, or timeout.
    pub async fn output(&self) -> Result<HelmOutput, HelmError> {
        let argv = self.argv();
        info!(args = %argv.join(" "), "Running helm");

        let mut command = Command::new("helm");
        command
            .args(&argv)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        if self.stdin.is_some() {
            command.stdin(Stdio::piped());
        }

        let mut child = command.spawn()?;
        if let Some(data) = &self.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(data.as_bytes()).await?;
            }
        }

        let waiting = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, waiting)
                .await
                .map_err(|_| HelmError::TimedOut(limit))??,
            None => waiting.await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(HelmError::Failed {
                code: output.status.code(),
                stdout,
                stderr,
            });
        }
        debug!(stderr = %stderr, "helm finished");
        Ok(HelmOutput { stdout, stderr })
    }

    /// Run helm and return stdout.
    ///
    /// # Errors
    /// Returns [`HelmError`] on spawn failure, non-zero exit, or timeout.
    pub async fn run(&self) -> Result<String, HelmError> {
        Ok(self.output().await?.stdout)
    }
}

/// Render a chart's manifests without installing them.
///
/// # Errors
/// Returns [`HelmError`] when helm fails or is missing.
pub async fn template(
    namespace: &str,
    release: &str,
    chart: &str,
    repo: Option<&str>,
) -> Result<String, HelmError> {
    let mut args = vec![
        "template".to_string(),
        release.to_string(),
        chart.to_string(),
        "--include-crds".to_string(),
    ];
    if let Some(repo) = repo {
        args.push("--repo".to_string());
        args.push(repo.to_string());
    }
    HelmCommand::new(args).namespace(namespace).run().await
}
