use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use frontdesk_core::ChatSummaryData;
use frontdesk_db::{Conversation, Conversations};

use crate::context::AppContext;
use crate::error::Result;
use crate::events::DashboardEvent;

const PLACEHOLDER_LAST_MESSAGE: &str = "...";

/// Seeds the conversation list from the provider once a session is ready.
pub struct SessionBootstrap {
    ctx: Arc<AppContext>,
}

impl SessionBootstrap {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                tracing::error!(error = %e, "Session bootstrap failed");
            }
        })
    }

    /// Waits for the session to settle, fetches the chat list and merges
    /// the most recent chats into the store.
    ///
    /// Returns how many chats were merged. If every attempt errors nothing
    /// is written and no event is emitted.
    pub async fn run(&self) -> Result<usize> {
        let timing = &self.ctx.timing;
        tokio::time::sleep(Duration::from_millis(timing.bootstrap_settle_ms)).await;

        let attempts = timing.bootstrap_attempts.max(1);
        let mut chats = None;
        for attempt in 1..=attempts {
            match self.ctx.provider.fetch_chat_summaries().await {
                Ok(list) if !list.is_empty() => {
                    chats = Some(list);
                    break;
                }
                Ok(list) => {
                    tracing::warn!(attempt, "Provider returned no chats");
                    chats = Some(list);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Fetching chats failed");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(timing.bootstrap_backoff_ms)).await;
            }
        }

        let Some(mut chats) = chats else {
            tracing::error!(attempts, "Giving up on chat bootstrap");
            return Ok(0);
        };

        chats.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        chats.truncate(timing.bootstrap_limit);

        let merged = chats.len();
        {
            let writer = self.ctx.store.write().await;
            let mut conversations: Conversations = writer.load().await?;
            let now = chrono::Utc::now().timestamp();
            for chat in chats {
                merge_summary(&mut conversations, chat, now);
            }
            writer.save(&conversations).await?;
        }

        tracing::info!(chats = merged, "Chats synced");
        self.ctx.bus.publish(DashboardEvent::ChatsSynced);
        Ok(merged)
    }
}

/// Creates the conversation if it is new, otherwise refreshes its name
/// and, when known, its timestamp. Stored messages are never touched.
pub fn merge_summary(conversations: &mut Conversations, chat: ChatSummaryData, now: i64) {
    let name = chat
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| chat.id.clone());

    match conversations.get_mut(&chat.id) {
        Some(existing) => {
            existing.name = name;
            if chat.timestamp != 0 {
                existing.timestamp = chat.timestamp;
            }
        }
        None => {
            let mut conversation = Conversation::new(chat.id.clone(), name);
            conversation.last_message = Some(
                chat.last_message
                    .unwrap_or_else(|| PLACEHOLDER_LAST_MESSAGE.to_string()),
            );
            conversation.timestamp = if chat.timestamp != 0 {
                chat.timestamp
            } else {
                now
            };
            conversations.insert(chat.id, conversation);
        }
    }
}
