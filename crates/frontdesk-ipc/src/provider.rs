use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use frontdesk_core::{IpcCommand, IpcEvent, IpcMessage};

use crate::error::{IpcError, Result};
use crate::process::{ProcessHandle, ProcessSpec};

type CommandReply = std::result::Result<Option<serde_json::Value>, String>;
type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<CommandReply>>>>;

/// Where the messaging sidecar lives and how to launch it.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub dir: PathBuf,
    pub runtime: String,
    pub entry: String,
}

/// Owns the messaging sidecar process and its JSON-lines channel.
///
/// Unsolicited events are forwarded to the receiver returned by
/// [`take_event_receiver`](Self::take_event_receiver); `CommandResult`
/// frames are routed back to the pending [`request`](Self::request).
pub struct ProviderManager {
    settings: ProviderSettings,
    process: Option<ProcessHandle>,
    pending: PendingMap,
    event_tx: mpsc::Sender<IpcEvent>,
    event_rx: Option<mpsc::Receiver<IpcEvent>>,
}

impl ProviderManager {
    pub fn new(settings: ProviderSettings) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1000);
        Self {
            settings,
            process: None,
            pending: Arc::new(Mutex::new(HashMap::new())),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<IpcEvent>> {
        self.event_rx.take()
    }

    pub async fn ensure_dependencies(&self) -> Result<()> {
        let package_json = self.settings.dir.join("package.json");
        let node_modules = self.settings.dir.join("node_modules");

        if !package_json.exists() {
            return Err(IpcError::InstallFailed(format!(
                "package.json not found in {}",
                self.settings.dir.display()
            )));
        }

        if !node_modules.exists() {
            info!(runtime = %self.settings.runtime, "Installing provider dependencies");
            self.run_install().await?;
        }

        Ok(())
    }

    async fn run_install(&self) -> Result<()> {
        let output = Command::new(&self.settings.runtime)
            .arg("install")
            .current_dir(&self.settings.dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| IpcError::InstallFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IpcError::InstallFailed(stderr.to_string()));
        }

        info!("Provider dependencies installed");
        Ok(())
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.process.is_some() {
            return Ok(());
        }

        self.ensure_dependencies().await?;

        info!(dir = %self.settings.dir.display(), "Starting provider process");

        let spec = ProcessSpec {
            program: self.settings.runtime.clone(),
            args: vec!["run".to_string(), self.settings.entry.clone()],
            working_dir: self.settings.dir.clone(),
        };
        self.start_with(&spec)
    }

    /// Spawns an explicit command instead of the configured runtime.
    pub fn start_with(&mut self, spec: &ProcessSpec) -> Result<()> {
        let (line_tx, line_rx) = mpsc::channel(1000);
        let handle = ProcessHandle::spawn(spec, line_tx)?;
        tokio::spawn(route_lines(
            line_rx,
            self.event_tx.clone(),
            self.pending.clone(),
        ));
        self.process = Some(handle);
        info!("Provider process started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if self.process.is_some() {
            info!("Stopping provider process");
            let _ = self.send_command(IpcCommand::Shutdown).await;
        }
        if let Some(process) = self.process.take() {
            process.shutdown(Duration::from_millis(500)).await?;
            info!("Provider process stopped");
        }
        Ok(())
    }

    /// Fire-and-forget command.
    pub async fn send_command(&self, command: IpcCommand) -> Result<()> {
        let message = IpcMessage::new_command(command);
        self.write(&message).await
    }

    /// Sends a command and waits for its `CommandResult`.
    pub async fn request(
        &self,
        command: IpcCommand,
        timeout: Duration,
    ) -> Result<Option<serde_json::Value>> {
        self.submit(command).await?.wait(timeout).await
    }

    /// Sends a command and returns a handle to its eventual result.
    ///
    /// The handle does not borrow the manager, so callers sharing it
    /// behind a lock can release the lock before waiting.
    pub async fn submit(&self, command: IpcCommand) -> Result<PendingReply> {
        let name = command.name();
        let message = IpcMessage::new_command(command);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(message.id.clone(), tx);

        if let Err(e) = self.write(&message).await {
            lock(&self.pending).remove(&message.id);
            return Err(e);
        }

        Ok(PendingReply {
            id: message.id,
            command: name,
            rx,
            pending: self.pending.clone(),
        })
    }

    async fn write(&self, message: &IpcMessage) -> Result<()> {
        let process = self.process.as_ref().ok_or(IpcError::ProcessNotRunning)?;
        if let frontdesk_core::IpcMessageContent::Command(command) = &message.content {
            debug!(command = command.name(), id = %message.id, "Sending IPC command");
        }
        process.send(&message.to_line()).await
    }

    pub fn is_running(&mut self) -> bool {
        if let Some(ref mut process) = self.process {
            match process.try_wait() {
                Ok(None) => true,
                _ => {
                    self.process = None;
                    false
                }
            }
        } else {
            false
        }
    }
}

/// A submitted command whose `CommandResult` has not arrived yet.
pub struct PendingReply {
    id: String,
    command: &'static str,
    rx: oneshot::Receiver<CommandReply>,
    pending: PendingMap,
}

impl PendingReply {
    pub async fn wait(self, timeout: Duration) -> Result<Option<serde_json::Value>> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(Ok(data))) => Ok(data),
            Ok(Ok(Err(reason))) => Err(IpcError::CommandFailed {
                command: self.command,
                reason,
            }),
            Ok(Err(_)) => Err(IpcError::ChannelClosed),
            Err(_) => {
                lock(&self.pending).remove(&self.id);
                Err(IpcError::Timeout {
                    command: self.command,
                    millis: timeout.as_millis(),
                })
            }
        }
    }
}

async fn route_lines(
    mut lines: mpsc::Receiver<String>,
    event_tx: mpsc::Sender<IpcEvent>,
    pending: PendingMap,
) {
    while let Some(line) = lines.recv().await {
        let Some(event) = IpcMessage::from_line(&line).and_then(IpcMessage::into_event) else {
            debug!(line = %line, "Ignoring non-event line from provider");
            continue;
        };

        if let IpcEvent::CommandResult {
            command_id,
            success,
            data,
            error,
        } = event
        {
            let waiter = lock(&pending).remove(&command_id);
            match waiter {
                Some(tx) => {
                    let reply = if success {
                        Ok(data)
                    } else {
                        Err(error.unwrap_or_else(|| "unknown error".to_string()))
                    };
                    let _ = tx.send(reply);
                }
                None => warn!(command_id = %command_id, "Result for unknown command"),
            }
            continue;
        }

        if event_tx.send(event).await.is_err() {
            break;
        }
    }

    // Wake every waiter: no more results will arrive.
    lock(&pending).clear();
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
