use thiserror::Error;

use crate::ai::AiError;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Database error: {0}")]
    Db(#[from] frontdesk_db::DbError),

    #[error("IPC error: {0}")]
    Ipc(#[from] frontdesk_ipc::IpcError),

    #[error("Generative model error: {0}")]
    Ai(#[from] AiError),

    #[error("Unexpected provider payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Worker not started")]
    NotStarted,

    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    #[error("Channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, WorkerError>;
