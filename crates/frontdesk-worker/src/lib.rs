pub mod ai;
pub mod bootstrap;
pub mod bot;
pub mod bus;
pub mod campaign;
pub mod config;
pub mod connection;
pub mod context;
pub mod crm;
pub mod dispatcher;
mod error;
pub mod events;
pub mod matching;
pub mod notify;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod reply;
pub mod simulated;
pub mod store;
mod worker;

pub use config::{FrontdeskConfig, load_config, load_config_from_path};
pub use context::AppContext;
pub use error::{Result, WorkerError};
pub use events::{ChatListEntry, ChatUpdate, ConnectionStatus, DashboardEvent, StatusUpdate};
pub use pipeline::{IngestOutcome, IngestStatus, IngestionPipeline};
pub use provider::MessagingProvider;
pub use worker::{FrontdeskWorker, chat_list, handle_provider_event, spawn_event_loop};

pub use frontdesk_core::{ChatSummaryData, IpcEvent, MessageData};
pub use frontdesk_db::{Campaign, CampaignAttribution, Conversation, Message};
