use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provider sidecar is not running")]
    ProcessNotRunning,

    #[error("Failed to launch provider sidecar: {0}")]
    SpawnFailed(String),

    #[error("Provider dependency install failed: {0}")]
    InstallFailed(String),

    #[error("Malformed IPC frame: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider rejected {command}: {reason}")]
    CommandFailed { command: &'static str, reason: String },

    #[error("Provider channel closed")]
    ChannelClosed,

    #[error("No result for {command} within {millis}ms")]
    Timeout { command: &'static str, millis: u128 },
}

pub type Result<T> = std::result::Result<T, IpcError>;
