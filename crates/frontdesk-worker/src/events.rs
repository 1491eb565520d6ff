use serde::{Deserialize, Serialize};

use frontdesk_db::{CampaignAttribution, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    QrReady,
    Connecting,
    Ready,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::QrReady => "qr_ready",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Ready => "ready",
            ConnectionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection status plus whatever the transition carried: the QR image
/// on `qr_ready`, the error detail on `error`, the reason on `disconnected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUpdate {
    pub chat_id: String,
    pub message: Message,
    pub chat_name: String,
    pub timestamp: i64,
}

/// One row of the chat list, most recent activity first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatListEntry {
    pub id: String,
    pub name: String,
    pub last_message: Option<String>,
    pub timestamp: i64,
    pub formatted_time: String,
}

/// Everything the dashboard can observe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DashboardEvent {
    StatusUpdate(StatusUpdate),
    ChatUpdate(ChatUpdate),
    ChatsSynced,
    BotStatusChanged {
        enabled: bool,
    },
    #[serde(rename_all = "camelCase")]
    CampaignAttributed {
        chat_id: String,
        campaign: CampaignAttribution,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_update_wire_shape() {
        let event = DashboardEvent::StatusUpdate(StatusUpdate {
            status: ConnectionStatus::QrReady,
            payload: Some("data:image/svg+xml;base64,AAA".into()),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "status_update");
        assert_eq!(json["data"]["status"], "qr_ready");
    }

    #[test]
    fn chat_update_uses_camel_case() {
        let event = DashboardEvent::ChatUpdate(ChatUpdate {
            chat_id: "1@c.us".into(),
            message: Message::new("m1", "hola", false, 0, "chat"),
            chat_name: "Ana".into(),
            timestamp: 0,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["chatId"], "1@c.us");
        assert_eq!(json["data"]["chatName"], "Ana");
    }

    #[test]
    fn chats_synced_has_no_data() {
        let json = serde_json::to_string(&DashboardEvent::ChatsSynced).unwrap();
        assert_eq!(json, r#"{"event":"chats_synced"}"#);
    }
}
