use std::sync::{Arc, Mutex};

use chrono::{Local, TimeZone};
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;

use frontdesk_core::{IpcCommand, IpcEvent};
use frontdesk_db::{Conversation, Conversations, FrontdeskDb};
use frontdesk_ipc::{ProviderManager, ProviderSettings};

use crate::ai::{AiError, GeminiClient, GenerativeModel};
use crate::bootstrap::SessionBootstrap;
use crate::config::FrontdeskConfig;
use crate::context::AppContext;
use crate::error::Result;
use crate::events::{ChatListEntry, DashboardEvent, StatusUpdate};
use crate::notify::LogNotifier;
use crate::pipeline::IngestionPipeline;
use crate::provider::SidecarProvider;

pub struct FrontdeskWorker {
    manager: Arc<RwLock<ProviderManager>>,
    ctx: Arc<AppContext>,
    pipeline: IngestionPipeline,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl FrontdeskWorker {
    pub async fn new(config: FrontdeskConfig) -> Result<Self> {
        let db = match &config.storage.database_path {
            Some(path) => FrontdeskDb::new_with_path(path).await?,
            None => FrontdeskDb::new().await?,
        };

        let manager = Arc::new(RwLock::new(ProviderManager::new(ProviderSettings {
            dir: config.provider.dir.clone(),
            runtime: config.provider.runtime.clone(),
            entry: config.provider.entry.clone(),
        })));
        let provider = Arc::new(SidecarProvider::new(
            manager.clone(),
            config.provider.request_timeout(),
        ));

        let model: Option<Arc<dyn GenerativeModel>> = match GeminiClient::new(&config.ai) {
            Ok(client) => {
                tracing::info!(model = %config.ai.model, "Generative replies enabled");
                Some(Arc::new(client) as Arc<dyn GenerativeModel>)
            }
            Err(AiError::NotConfigured) => {
                tracing::info!("No API key configured, using canned replies");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let ctx = AppContext::new(
            Arc::new(db),
            provider,
            model,
            Arc::new(LogNotifier),
            config.timing.clone(),
        )
        .await?;

        Ok(Self {
            manager,
            pipeline: IngestionPipeline::new(ctx.clone()),
            ctx,
            event_loop: Mutex::new(None),
        })
    }

    /// Launches the sidecar, starts consuming its events and asks it to
    /// open the messaging session.
    pub async fn start(&self) -> Result<()> {
        let mut manager = self.manager.write().await;

        if let Err(e) = manager.start().await {
            self.ctx
                .connection
                .failed(format!("Initialization failed: {}", e));
            return Err(e.into());
        }

        if let Some(rx) = manager.take_event_receiver() {
            let handle = spawn_event_loop(self.ctx.clone(), rx);
            *self.event_loop_slot() = Some(handle);
        }

        if let Err(e) = manager.send_command(IpcCommand::Initialize).await {
            self.ctx
                .connection
                .failed(format!("Initialization failed: {}", e));
            return Err(e.into());
        }

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut manager = self.manager.write().await;
        manager.stop().await?;
        if let Some(handle) = self.event_loop_slot().take() {
            handle.abort();
        }
        Ok(())
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    pub fn subscribe(&self) -> (StatusUpdate, broadcast::Receiver<DashboardEvent>) {
        self.ctx.connection.subscribe()
    }

    pub fn bot_enabled(&self) -> bool {
        self.ctx.bot.is_enabled()
    }

    pub async fn toggle_bot(&self, enabled: bool) -> Result<()> {
        self.ctx.bot.set(enabled).await
    }

    pub async fn send_message(&self, chat_id: &str, body: &str) -> Result<()> {
        self.ctx.provider.send_message(chat_id, body).await
    }

    pub async fn chats(&self) -> Result<Vec<ChatListEntry>> {
        let conversations: Conversations = self.ctx.store.read().await?;
        Ok(chat_list(&conversations))
    }

    pub async fn conversation(&self, chat_id: &str) -> Result<Conversation> {
        self.pipeline.sync_history(chat_id).await
    }

    fn event_loop_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.event_loop
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Consumes provider events one at a time, in delivery order.
pub fn spawn_event_loop(ctx: Arc<AppContext>, mut rx: mpsc::Receiver<IpcEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let pipeline = IngestionPipeline::new(ctx.clone());
        while let Some(event) = rx.recv().await {
            if let Err(e) = handle_provider_event(&ctx, &pipeline, event).await {
                tracing::error!("Error handling provider event: {}", e);
            }
        }
        tracing::debug!("Provider event loop finished");
    })
}

pub async fn handle_provider_event(
    ctx: &Arc<AppContext>,
    pipeline: &IngestionPipeline,
    event: IpcEvent,
) -> Result<()> {
    match event {
        IpcEvent::Qr { code } => ctx.connection.qr_received(&code),

        IpcEvent::Authenticated => ctx.connection.authenticated(),

        IpcEvent::Ready => {
            ctx.connection.ready();
            SessionBootstrap::new(ctx.clone()).spawn();
        }

        IpcEvent::AuthFailure { message } => ctx
            .connection
            .failed(format!("Authentication failure: {}", message)),

        IpcEvent::Disconnected { reason } => ctx.connection.disconnected(reason),

        IpcEvent::Message { message } => {
            pipeline.ingest(message).await?;
        }

        IpcEvent::Error { error } => ctx.connection.failed(error),

        IpcEvent::CommandResult { command_id, .. } => {
            tracing::debug!(command_id = %command_id, "Unrouted command result");
        }
    }

    Ok(())
}

pub fn chat_list(conversations: &Conversations) -> Vec<ChatListEntry> {
    let mut list: Vec<ChatListEntry> = conversations
        .values()
        .map(|c| ChatListEntry {
            id: c.id.clone(),
            name: c.name.clone(),
            last_message: c.last_message.clone(),
            timestamp: c.timestamp,
            formatted_time: Local
                .timestamp_opt(c.timestamp, 0)
                .single()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        })
        .collect();
    list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    list
}
