//! Inbound and outbound message ingestion.

use std::sync::Arc;

use tokio::task::JoinHandle;

use frontdesk_core::MessageData;
use frontdesk_db::{Campaigns, Conversation, Conversations, Message};

use crate::campaign;
use crate::context::AppContext;
use crate::crm;
use crate::error::{Result, WorkerError};
use crate::events::{ChatUpdate, DashboardEvent};
use crate::notify::{self, inbound_body, inbound_title};
use crate::reply::ReplyRequest;

pub const BROADCAST_CHAT: &str = "status@broadcast";

const DEDUP_WINDOW: usize = 10;
const MAX_MESSAGES: usize = 50;
const HISTORY_FETCH_LIMIT: usize = 30;
const MEDIA_PLACEHOLDER: &str = "📷 Archivo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    Ingested,
    Duplicate,
    Ignored,
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub chat_id: String,
    pub status: IngestStatus,
    /// The spawned reply task, when one was dispatched.
    pub reply: Option<JoinHandle<()>>,
}

impl IngestOutcome {
    fn without_reply(chat_id: String, status: IngestStatus) -> Self {
        Self {
            chat_id,
            status,
            reply: None,
        }
    }
}

pub struct IngestionPipeline {
    ctx: Arc<AppContext>,
}

impl IngestionPipeline {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Records one message event and reacts to it.
    ///
    /// All persistence happens before the reply task is spawned; a
    /// redelivered message changes nothing.
    pub async fn ingest(&self, event: MessageData) -> Result<IngestOutcome> {
        let chat_id = event.chat_id.clone();
        if chat_id.is_empty() || chat_id == BROADCAST_CHAT {
            return Ok(IngestOutcome::without_reply(chat_id, IngestStatus::Ignored));
        }

        let body = event.body.clone().unwrap_or_default();
        let message = Message::new(
            &event.message_id,
            body.as_str(),
            event.from_me,
            event.timestamp,
            &event.message_type,
        );

        let conversation = {
            let writer = self.ctx.store.write().await;
            let mut conversations: Conversations = writer.load().await?;

            let entry = conversations
                .entry(chat_id.clone())
                .or_insert_with(|| Conversation::new(&chat_id, display_name(&event)));

            let duplicate = entry
                .messages
                .iter()
                .rev()
                .take(DEDUP_WINDOW)
                .any(|m| m.id == message.id);
            if duplicate {
                tracing::debug!(chat_id = %chat_id, message_id = %message.id, "Duplicate message");
                return Ok(IngestOutcome::without_reply(chat_id, IngestStatus::Duplicate));
            }

            entry.messages.push(message.clone());
            entry.last_message = Some(body.clone());
            entry.timestamp = event.timestamp;
            cap_history(&mut entry.messages);

            crm::apply(entry, crm::extract(&body));

            if !event.from_me && entry.campaign.is_none() {
                let mut campaigns: Campaigns = writer.load().await?;
                if let Some(attribution) = campaign::attribute(entry, &body, &mut campaigns) {
                    writer.save(&campaigns).await?;
                    tracing::info!(chat_id = %chat_id, campaign = %attribution.name, "Lead attributed");
                    self.ctx.bus.publish(DashboardEvent::CampaignAttributed {
                        chat_id: chat_id.clone(),
                        campaign: attribution,
                    });
                }
            }

            let snapshot = entry.clone();
            writer.save(&conversations).await?;
            snapshot
        };

        self.ctx.bus.publish(DashboardEvent::ChatUpdate(ChatUpdate {
            chat_id: chat_id.clone(),
            message,
            chat_name: conversation.name.clone(),
            timestamp: conversation.timestamp,
        }));

        if !event.from_me {
            notify::dispatch(
                self.ctx.notifier.clone(),
                inbound_title(&conversation.name),
                inbound_body(&body).to_string(),
            );
        }

        let reply = if self.ctx.bot.is_enabled() && !event.from_me && !event.is_group {
            let replies = self.ctx.replies.clone();
            let request = ReplyRequest {
                chat_id: chat_id.clone(),
                body,
                history: conversation.messages,
            };
            Some(tokio::spawn(async move { replies.respond(request).await }))
        } else {
            None
        };

        Ok(IngestOutcome {
            chat_id,
            status: IngestStatus::Ingested,
            reply,
        })
    }

    /// Backfills a conversation that has no stored messages yet from the
    /// provider's recent history.
    ///
    /// Fetch failures are logged and leave the conversation untouched.
    pub async fn sync_history(&self, chat_id: &str) -> Result<Conversation> {
        let current: Conversations = self.ctx.store.read().await?;
        let existing = current
            .get(chat_id)
            .ok_or_else(|| WorkerError::ChatNotFound(chat_id.to_string()))?;
        if !existing.messages.is_empty() {
            return Ok(existing.clone());
        }

        let fetched = match self
            .ctx
            .provider
            .fetch_messages(chat_id, HISTORY_FETCH_LIMIT)
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!(chat_id = %chat_id, error = %e, "Could not load chat history");
                return Ok(existing.clone());
            }
        };

        let writer = self.ctx.store.write().await;
        let mut conversations: Conversations = writer.load().await?;
        let conversation = conversations
            .get_mut(chat_id)
            .ok_or_else(|| WorkerError::ChatNotFound(chat_id.to_string()))?;

        let mut added = 0usize;
        for data in fetched {
            if conversation.messages.iter().any(|m| m.id == data.message_id) {
                continue;
            }
            let body = match data.body {
                Some(body) if !body.is_empty() => body,
                _ if data.has_media => MEDIA_PLACEHOLDER.to_string(),
                _ => String::new(),
            };
            conversation.messages.push(Message::new(
                data.message_id,
                body,
                data.from_me,
                data.timestamp,
                data.message_type,
            ));
            added += 1;
        }
        // Messages ingested during the fetch are already stored.
        conversation.messages.sort_by_key(|m| m.timestamp);
        cap_history(&mut conversation.messages);
        conversation.synced = true;

        let snapshot = conversation.clone();
        writer.save(&conversations).await?;
        tracing::info!(chat_id = %chat_id, added, "Chat history synced");
        Ok(snapshot)
    }
}

/// Drops the oldest messages beyond the per-conversation limit.
fn cap_history(messages: &mut Vec<Message>) {
    if messages.len() > MAX_MESSAGES {
        let overflow = messages.len() - MAX_MESSAGES;
        messages.drain(..overflow);
    }
}

fn display_name(event: &MessageData) -> String {
    [event.chat_name.as_deref(), event.sender_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(&event.chat_id)
        .to_string()
}
