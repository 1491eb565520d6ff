use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use frontdesk_core::{ChatSummaryData, IpcCommand, MessageData};
use frontdesk_ipc::ProviderManager;

use crate::error::Result;

/// Outbound side of the messaging account.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send_message(&self, chat_id: &str, body: &str) -> Result<()>;

    /// Summaries of the account's existing chats, in provider order.
    async fn fetch_chat_summaries(&self) -> Result<Vec<ChatSummaryData>>;

    /// The most recent `limit` messages of one chat, oldest first.
    async fn fetch_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<MessageData>>;
}

/// [`MessagingProvider`] backed by the sidecar process.
pub struct SidecarProvider {
    manager: Arc<RwLock<ProviderManager>>,
    timeout: Duration,
}

impl SidecarProvider {
    pub fn new(manager: Arc<RwLock<ProviderManager>>, timeout: Duration) -> Self {
        Self { manager, timeout }
    }

    /// Submits under the manager's read lock, then waits without it so a
    /// pending reply never blocks [`ProviderManager::stop`].
    async fn send(&self, command: IpcCommand) -> Result<Option<serde_json::Value>> {
        let reply = self.manager.read().await.submit(command).await?;
        Ok(reply.wait(self.timeout).await?)
    }

    async fn request<T>(&self, command: IpcCommand) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match self.send(command).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(T::default()),
        }
    }
}

#[async_trait]
impl MessagingProvider for SidecarProvider {
    async fn send_message(&self, chat_id: &str, body: &str) -> Result<()> {
        self.send(IpcCommand::SendMessage {
            chat_id: chat_id.to_string(),
            body: body.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn fetch_chat_summaries(&self) -> Result<Vec<ChatSummaryData>> {
        self.request(IpcCommand::GetChats).await
    }

    async fn fetch_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<MessageData>> {
        self.request(IpcCommand::FetchMessages {
            chat_id: chat_id.to_string(),
            limit,
        })
        .await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use frontdesk_ipc::{ProcessSpec, ProviderSettings};

    // Answers every command line with a CommandResult carrying `data`.
    fn echo_results(data: &str) -> String {
        format!(
            r#"while read line; do id=$(echo "$line" | sed 's/.*"id":"\([^"]*\)".*/\1/'); echo "{{\"id\":\"r\",\"type\":\"CommandResult\",\"payload\":{{\"command_id\":\"$id\",\"success\":true,\"data\":{data}}}}}"; done"#
        )
    }

    async fn provider_with(script: String) -> (SidecarProvider, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = ProviderManager::new(ProviderSettings {
            dir: dir.path().to_path_buf(),
            runtime: "bun".into(),
            entry: "index.ts".into(),
        });
        manager
            .start_with(&ProcessSpec {
                program: "sh".into(),
                args: vec!["-c".into(), script],
                working_dir: dir.path().to_path_buf(),
            })
            .unwrap();
        let provider = SidecarProvider::new(
            Arc::new(RwLock::new(manager)),
            Duration::from_secs(5),
        );
        (provider, dir)
    }

    #[tokio::test]
    async fn chat_summaries_are_decoded() {
        let (provider, _dir) =
            provider_with(echo_results(r#"[{\"id\":\"1@c.us\",\"name\":\"Ana\",\"timestamp\":5}]"#))
                .await;
        let chats = provider.fetch_chat_summaries().await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, "1@c.us");
        assert_eq!(chats[0].name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn null_data_is_an_empty_list() {
        let (provider, _dir) = provider_with(echo_results("null")).await;
        let messages = provider.fetch_messages("1@c.us", 30).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn pending_send_does_not_hold_the_manager() {
        let (provider, _dir) = provider_with("cat > /dev/null".to_string()).await;
        let manager = provider.manager.clone();
        let provider = Arc::new(provider);

        let sender = provider.clone();
        let send = tokio::spawn(async move { sender.send_message("1@c.us", "hola").await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let guard = tokio::time::timeout(Duration::from_secs(1), manager.write()).await;
        assert!(guard.is_ok(), "stop would wait for the pending reply");
        drop(guard);
        send.abort();
    }
}
