//! Command execution on the machine under test
//!
//! `Machine` is the seam every helper talks through. `SshMachine` reaches the
//! test VM over ssh; `LocalMachine` runs commands through `sh -c` on this host.

use crate::config::TargetConfig;
use crate::error::{NetcheckError, NetcheckResult};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Shell command execution returning stdout
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Machine: Send + Sync {
    /// Run `command` through a POSIX shell and return its stdout.
    ///
    /// A non-zero exit status is an error.
    async fn execute(&self, command: &str) -> NetcheckResult<String>;
}

#[async_trait]
impl<M: Machine + ?Sized> Machine for &M {
    async fn execute(&self, command: &str) -> NetcheckResult<String> {
        (**self).execute(command).await
    }
}

#[async_trait]
impl<M: Machine + ?Sized> Machine for Box<M> {
    async fn execute(&self, command: &str) -> NetcheckResult<String> {
        (**self).execute(command).await
    }
}

/// Remote machine reached with the OpenSSH client
#[derive(Debug, Clone)]
pub struct SshMachine {
    host: String,
    user: String,
    port: u16,
    identity_file: Option<PathBuf>,
}

impl SshMachine {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port: 22,
            identity_file: None,
        }
    }

    pub fn from_config(target: &TargetConfig) -> Self {
        Self {
            host: target.host.clone(),
            user: target.user.clone(),
            port: target.port,
            identity_file: target.identity_file.clone(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Arguments passed to `ssh` for `command`
    fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            "-p".to_string(),
            self.port.to_string(),
        ];
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(format!("{}@{}", self.user, self.host));
        args.push("--".to_string());
        args.push(command.to_string());
        args
    }
}

#[async_trait]
impl Machine for SshMachine {
    async fn execute(&self, command: &str) -> NetcheckResult<String> {
        debug!("[{}] {}", self.host, command);
        let mut cmd = Command::new("ssh");
        cmd.args(self.ssh_args(command));
        run(cmd, command).await
    }
}

/// Commands run on the local host
#[derive(Debug, Clone, Default)]
pub struct LocalMachine;

impl LocalMachine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Machine for LocalMachine {
    async fn execute(&self, command: &str) -> NetcheckResult<String> {
        debug!("[local] {}", command);
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        run(cmd, command).await
    }
}

async fn run(mut cmd: Command, cmd_str: &str) -> NetcheckResult<String> {
    let output = cmd
        .output()
        .await
        .map_err(|e| NetcheckError::CommandFailed {
            cmd: cmd_str.to_string(),
            code: None,
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8(output.stderr)
            .unwrap_or_else(|e| String::from_utf8_lossy(&e.into_bytes()).to_string());
        return Err(NetcheckError::CommandFailed {
            cmd: cmd_str.to_string(),
            code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Build the machine described by `target`
pub fn from_config(target: &TargetConfig) -> Box<dyn Machine> {
    if target.local {
        Box::new(LocalMachine::new())
    } else {
        Box::new(SshMachine::from_config(target))
    }
}
