use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::error::{IpcError, Result};

/// What to run and where.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

pub struct ProcessHandle {
    child: Child,
    stdin_tx: mpsc::Sender<String>,
}

impl ProcessHandle {
    /// Spawns the child and pumps its stdout lines into `line_tx`.
    pub fn spawn(spec: &ProcessSpec, line_tx: mpsc::Sender<String>) -> Result<Self> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| IpcError::SpawnFailed(format!("{}: {}", spec.program, e)))?;

        let stdout = child.stdout.take().ok_or(IpcError::ProcessNotRunning)?;
        let stderr = child.stderr.take().ok_or(IpcError::ProcessNotRunning)?;
        let mut stdin = child.stdin.take().ok_or(IpcError::ProcessNotRunning)?;

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(100);

        tokio::spawn(async move {
            while let Some(line) = stdin_rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err() || stdin.flush().await.is_err()
                {
                    tracing::warn!("Provider stdin closed");
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line_tx.send(line).await.is_err() {
                    break;
                }
            }
            tracing::debug!("Provider stdout reached EOF");
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::warn!("provider stderr: {}", line);
            }
        });

        Ok(Self { child, stdin_tx })
    }

    pub async fn send(&self, line: &str) -> Result<()> {
        let msg = if line.ends_with('\n') {
            line.to_string()
        } else {
            format!("{}\n", line)
        };

        self.stdin_tx
            .send(msg)
            .await
            .map_err(|_| IpcError::ChannelClosed)
    }

    /// Waits up to `grace` for the child to exit on its own, then kills it.
    pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => {
                tracing::debug!(status = ?status.ok(), "Provider exited");
                Ok(())
            }
            Err(_) => self.child.kill().await.map_err(IpcError::Io),
        }
    }

    pub fn try_wait(&mut self) -> Result<Option<std::process::ExitStatus>> {
        self.child.try_wait().map_err(IpcError::Io)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_stdin_back_through_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ProcessSpec {
            program: "cat".into(),
            args: vec![],
            working_dir: dir.path().to_path_buf(),
        };
        let (tx, mut rx) = mpsc::channel(8);
        let handle = ProcessHandle::spawn(&spec, tx).unwrap();

        handle.send("hello").await.unwrap();
        let line = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line, "hello");

        handle.shutdown(Duration::from_millis(10)).await.unwrap();
    }

    #[test]
    fn missing_program_reports_spawn_failure() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let spec = ProcessSpec {
                program: "definitely-not-a-real-binary-frontdesk".into(),
                args: vec![],
                working_dir: std::env::temp_dir(),
            };
            let (tx, _rx) = mpsc::channel(1);
            let err = ProcessHandle::spawn(&spec, tx).err().unwrap();
            assert!(matches!(err, IpcError::SpawnFailed(_)));
        });
    }
}
