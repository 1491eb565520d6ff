use serde::{Deserialize, Serialize};

/// Commands written to the provider sidecar's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum IpcCommand {
    Initialize,
    SendMessage { chat_id: String, body: String },
    GetChats,
    FetchMessages { chat_id: String, limit: usize },
    Shutdown,
}

impl IpcCommand {
    pub fn name(&self) -> &'static str {
        match self {
            IpcCommand::Initialize => "Initialize",
            IpcCommand::SendMessage { .. } => "SendMessage",
            IpcCommand::GetChats => "GetChats",
            IpcCommand::FetchMessages { .. } => "FetchMessages",
            IpcCommand::Shutdown => "Shutdown",
        }
    }
}

/// Events read from the provider sidecar's stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum IpcEvent {
    Qr { code: String },
    Authenticated,
    Ready,
    AuthFailure { message: String },
    Disconnected { reason: String },

    Message { message: MessageData },

    Error { error: String },

    CommandResult {
        command_id: String,
        success: bool,
        data: Option<serde_json::Value>,
        error: Option<String>,
    },
}

/// A single message as reported by the provider, inbound or outbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageData {
    pub message_id: String,
    pub chat_id: String,
    #[serde(default)]
    pub chat_name: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub from_me: bool,
    pub timestamp: i64,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub has_media: bool,
}

fn default_message_type() -> String {
    "chat".to_string()
}

/// Summary of one existing chat, returned by `GetChats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSummaryData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub last_message: Option<String>,
}
