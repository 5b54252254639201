//! `kubectl`-backed cluster client
//!
//! Every invocation is a child process bounded by a timeout; a child still
//! running when the timeout fires is killed when its handle is dropped.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::ChaosConfig;
use crate::error::{ClusterError, ClusterResult};
use crate::traits::ClusterClient;
use crate::types::{ApplyOutcome, ResourceKind};
use shared::{ProcessId, logging, process_debug, process_info, process_warn};

/// Exit state and captured streams of one command
#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandOutput {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    /// Both streams, for diagnostics and error matching
    fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Real cluster client shelling out to `kubectl`
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: String,
    timeout: Duration,
}

impl KubectlClient {
    pub fn new() -> Self {
        Self {
            binary: "kubectl".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &ChaosConfig) -> Self {
        Self::new()
            .with_binary(config.kubectl.clone())
            .with_timeout(config.command_timeout())
    }

    /// Configure the executable (fluent API)
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Configure the per-command timeout (fluent API)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    async fn run(&self, args: &[&str], stdin: Option<&str>) -> ClusterResult<CommandOutput> {
        let command = self.describe(args);

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClusterError::Spawn {
                command: command.clone(),
                message: e.to_string(),
            })?;

        let input = stdin.map(str::to_owned);
        let interaction = async move {
            if let (Some(input), Some(mut pipe)) = (input, child.stdin.take()) {
                pipe.write_all(input.as_bytes()).await?;
                pipe.shutdown().await?;
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, interaction)
            .await
            .map_err(|_| ClusterError::Timeout {
                command: command.clone(),
                timeout: self.timeout,
            })?
            .map_err(|e| ClusterError::Io {
                command: command.clone(),
                message: e.to_string(),
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `jsonpath={.items[*].metadata.name}` output into names
fn parse_names(output: &str) -> Vec<String> {
    output
        .split_whitespace()
        .map(|name| name.trim_matches(|c| c == '\'' || c == '"'))
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl ClusterClient for KubectlClient {
    async fn apply(&self, manifest: &str) -> ApplyOutcome {
        match self.run(&["apply", "-f", "-"], Some(manifest)).await {
            Ok(result) if result.success => {
                let output = result.combined();
                process_debug!(ProcessId::current(), "📦 kubectl apply: {}", output);
                ApplyOutcome { success: true, output }
            }
            Ok(result) => {
                let output = result.combined();
                let err = ClusterError::NonZeroExit {
                    command: self.describe(&["apply", "-f", "-"]),
                    code: result.code,
                    output: output.clone(),
                };
                logging::log_error(ProcessId::current(), "Manifest apply", &err);
                ApplyOutcome { success: false, output }
            }
            Err(err) => {
                logging::log_error(ProcessId::current(), "Manifest apply", &err);
                ApplyOutcome {
                    success: false,
                    output: err.to_string(),
                }
            }
        }
    }

    async fn delete(&self, kind: ResourceKind, name: &str, namespace: &str) -> bool {
        let args = ["delete", kind.as_str(), name, "-n", namespace];
        match self.run(&args, None).await {
            Ok(result) if result.success => {
                process_info!(ProcessId::current(), "🗑️ Deleted {} {} in {}", kind, name, namespace);
                true
            }
            Ok(result) if result.combined().to_lowercase().contains("not found") => {
                process_info!(
                    ProcessId::current(),
                    "🗑️ {} {} in {} already gone",
                    kind,
                    name,
                    namespace
                );
                true
            }
            Ok(result) => {
                process_warn!(
                    ProcessId::current(),
                    "⚠️ Failed to delete {} {} in {} (exit {:?}): {}",
                    kind,
                    name,
                    namespace,
                    result.code,
                    result.combined()
                );
                false
            }
            Err(err) => {
                process_warn!(
                    ProcessId::current(),
                    "⚠️ Failed to delete {} {} in {}: {}",
                    kind,
                    name,
                    namespace,
                    err
                );
                false
            }
        }
    }

    async fn list_names(&self, kind: ResourceKind, namespace: &str) -> Vec<String> {
        let args = ["get", kind.as_str(), "-n", namespace, "-o", "jsonpath={.items[*].metadata.name}"];
        match self.run(&args, None).await {
            Ok(result) if result.success => {
                if !result.stderr.is_empty() {
                    process_debug!(ProcessId::current(), "kubectl get {} warnings: {}", kind, result.stderr);
                }
                parse_names(&result.stdout)
            }
            Ok(result) => {
                process_warn!(
                    ProcessId::current(),
                    "⚠️ Listing {} in {} failed (exit {:?}): {}",
                    kind,
                    namespace,
                    result.code,
                    result.combined()
                );
                Vec::new()
            }
            Err(err) => {
                process_warn!(ProcessId::current(), "⚠️ Listing {} in {} failed: {}", kind, namespace, err);
                Vec::new()
            }
        }
    }
}
