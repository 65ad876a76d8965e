//! Local system probes
//!
//! Everything the dashboard learns about the host comes from a fixed set of
//! commands and files. Commands go through [`CommandRunner`] so handlers can
//! be exercised without touching the real system.

mod activity;
mod services;
mod sites;
mod system;
mod tools;

pub use activity::*;
pub use services::*;
pub use sites::*;
pub use system::*;
pub use tools::*;

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Programs the dashboard is allowed to execute
pub const ALLOWED_PROGRAMS: &[&str] = &[
    "systemctl",
    "uname",
    "ip",
    "hostname",
    "nginx",
    "php",
    "mariadb",
    "redis-server",
    "redis-cli",
    "find",
    "du",
    "df",
];

/// Captured result of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status was zero
    pub success: bool,
    /// Trimmed stdout, or stderr when stdout is empty (`nginx -v` prints there)
    pub text: String,
}

/// Executes allow-listed programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`; `None` when it could not run or timed out
    async fn execute(&self, program: &str, args: &[&str]) -> Option<CommandOutput>;

    /// Non-empty output of a command, regardless of exit status
    async fn output(&self, program: &str, args: &[&str]) -> Option<String> {
        self.execute(program, args)
            .await
            .map(|out| out.text)
            .filter(|text| !text.is_empty())
    }
}

/// Runs commands on the host with a per-command timeout
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn execute(&self, program: &str, args: &[&str]) -> Option<CommandOutput> {
        if !ALLOWED_PROGRAMS.contains(&program) {
            tracing::warn!(program, "Refusing to run program outside the allow-list");
            return None;
        }

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!(program, error = %e, "Command failed to start");
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    program,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Command timed out"
                );
                return None;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let text = if stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).trim().to_string()
        } else {
            stdout
        };

        Some(CommandOutput {
            success: output.status.success(),
            text,
        })
    }
}
