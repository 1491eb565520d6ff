use serde::{Deserialize, Serialize};

use crate::events::{IpcCommand, IpcEvent};

/// One newline-delimited JSON frame exchanged with the provider sidecar.
///
/// The `id` of a command frame is echoed back as `command_id` in the
/// matching `CommandResult` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcMessage {
    pub id: String,
    #[serde(flatten)]
    pub content: IpcMessageContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpcMessageContent {
    Command(IpcCommand),
    Event(IpcEvent),
}

impl IpcMessage {
    pub fn new_command(command: IpcCommand) -> Self {
        Self {
            id: generate_id(),
            content: IpcMessageContent::Command(command),
        }
    }

    pub fn new_event(event: IpcEvent) -> Self {
        Self {
            id: generate_id(),
            content: IpcMessageContent::Event(event),
        }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default() + "\n"
    }

    pub fn from_line(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }

    /// Returns the event carried by this frame, if it is one.
    pub fn into_event(self) -> Option<IpcEvent> {
        match self.content {
            IpcMessageContent::Event(event) => Some(event),
            IpcMessageContent::Command(_) => None,
        }
    }
}

fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", nanos, seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_line_is_parsed_as_event() {
        let line = r#"{"id":"abc","type":"Disconnected","payload":{"reason":"LOGOUT"}}"#;
        let msg = IpcMessage::from_line(line).unwrap();
        assert_eq!(msg.id, "abc");
        match msg.into_event() {
            Some(IpcEvent::Disconnected { reason }) => assert_eq!(reason, "LOGOUT"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn command_line_ends_with_newline() {
        let line = IpcMessage::new_command(IpcCommand::GetChats).to_line();
        assert!(line.ends_with('\n'));
        assert!(line.contains(r#""type":"GetChats""#));
    }

    #[test]
    fn ids_are_unique() {
        let a = IpcMessage::new_command(IpcCommand::Shutdown);
        let b = IpcMessage::new_command(IpcCommand::Shutdown);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn garbage_line_is_ignored() {
        assert!(IpcMessage::from_line("not json").is_none());
    }
}
