//! Remote command execution over SSH

use crate::{CollectorError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const SERVER_ALIVE_INTERVAL_SECS: u64 = 5;
const SERVER_ALIVE_COUNT_MAX: u32 = 3;

/// Connection parameters for one host, shared by every command run against it
#[derive(Debug, Clone)]
pub struct SshSession {
    host: String,
    account: String,
    keyfile: Option<PathBuf>,
    connect_timeout: Duration,
}

impl SshSession {
    pub fn new(host: &str, account: &str, keyfile: Option<&Path>, connect_timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            account: account.to_string(),
            keyfile: keyfile.map(Path::to_path_buf),
            connect_timeout,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `ssh` arguments up to and including the destination
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref keyfile) = self.keyfile {
            args.push("-i".to_string());
            args.push(keyfile.display().to_string());
        }
        for option in [
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            format!("ServerAliveInterval={}", SERVER_ALIVE_INTERVAL_SECS),
            format!("ServerAliveCountMax={}", SERVER_ALIVE_COUNT_MAX),
            "BatchMode=yes".to_string(),
        ] {
            args.push("-o".to_string());
            args.push(option);
        }
        args.push(format!("{}@{}", self.account, self.host));
        args
    }
}

/// Captured result of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a command on a remote host
///
/// Implementations return `Err` only when the command could not be run to
/// completion (spawn failure, budget exceeded); a non-zero exit is reported
/// through [`CommandOutput::exit_code`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, session: &SshSession, command: &str, budget: Duration) -> Result<CommandOutput>;
}

/// Runs commands through the system `ssh` client
#[derive(Debug, Clone)]
pub struct OpenSsh {
    program: PathBuf,
}

impl OpenSsh {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ssh"),
        }
    }

    /// Use a specific `ssh` binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for OpenSsh {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for OpenSsh {
    async fn run(&self, session: &SshSession, command: &str, budget: Duration) -> Result<CommandOutput> {
        debug!(host = session.host(), command = command, "Running remote command");

        let pending = Command::new(&self.program)
            .args(session.ssh_args())
            .arg(command)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(budget, pending)
            .await
            .map_err(|_| CollectorError::RemoteCommand {
                host: session.host().to_string(),
                reason: format!("`{}` timed out after {}s", command, budget.as_secs()),
            })?
            .map_err(|e| CollectorError::RemoteCommand {
                host: session.host().to_string(),
                reason: format!("failed to start {}: {}", self.program.display(), e),
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_args_with_keyfile() {
        let session = SshSession::new(
            "web1.example.org",
            "ops",
            Some(Path::new("/etc/keys/id_ed25519")),
            Duration::from_secs(10),
        );
        assert_eq!(
            session.ssh_args(),
            vec![
                "-i",
                "/etc/keys/id_ed25519",
                "-o",
                "ConnectTimeout=10",
                "-o",
                "ServerAliveInterval=5",
                "-o",
                "ServerAliveCountMax=3",
                "-o",
                "BatchMode=yes",
                "ops@web1.example.org",
            ]
        );
    }

    #[test]
    fn ssh_args_without_keyfile() {
        let session = SshSession::new("db1", "root", None, Duration::from_secs(3));
        let args = session.ssh_args();
        assert!(!args.contains(&"-i".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("root@db1"));
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    // One test so no other test forks while the scripts are being written.
    #[cfg(unix)]
    #[tokio::test]
    async fn fake_ssh_exit_status_streams_budget_and_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        // receives the ssh arguments and runs the last one
        let echo = script(dir.path(), "fake-ssh", "#!/bin/sh\nfor last; do :; done\nexec sh -c \"$last\"\n");
        let slow = script(dir.path(), "slow-ssh", "#!/bin/sh\nexec sleep 5\n");
        let session = SshSession::new("h1", "root", None, Duration::from_secs(1));

        let runner = OpenSsh::with_program(&echo);
        let ok = runner
            .run(&session, "echo hello", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(ok.success());
        assert_eq!(ok.stdout, "hello\n");

        let failed = runner
            .run(&session, "echo oops >&2; exit 3", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(failed.exit_code, Some(3));
        assert_eq!(failed.stderr, "oops\n");

        let err = OpenSsh::with_program(&slow)
            .run(&session, "uptime", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::RemoteCommand { ref host, .. } if host == "h1"));

        let err = OpenSsh::with_program(dir.path().join("missing-ssh"))
            .run(&session, "uptime", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::RemoteCommand { .. }));
    }
}
