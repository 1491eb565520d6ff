use std::sync::Arc;

use frontdesk_db::FrontdeskDb;

use crate::ai::GenerativeModel;
use crate::bot::BotSwitch;
use crate::bus::EventBus;
use crate::config::TimingConfig;
use crate::connection::ConnectionMonitor;
use crate::dispatcher::spawn_dispatcher;
use crate::error::Result;
use crate::notify::Notifier;
use crate::provider::MessagingProvider;
use crate::reply::ReplyEngine;
use crate::store::Store;

/// Everything the event handlers share, built once per process.
pub struct AppContext {
    pub store: Store,
    pub bus: EventBus,
    pub connection: ConnectionMonitor,
    pub bot: BotSwitch,
    pub provider: Arc<dyn MessagingProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub replies: ReplyEngine,
    pub timing: TimingConfig,
}

impl AppContext {
    /// Loads the bot switch from the store and starts the send dispatcher.
    pub async fn new(
        db: Arc<FrontdeskDb>,
        provider: Arc<dyn MessagingProvider>,
        model: Option<Arc<dyn GenerativeModel>>,
        notifier: Arc<dyn Notifier>,
        timing: TimingConfig,
    ) -> Result<Arc<Self>> {
        let store = Store::new(db);
        let bus = EventBus::new();
        let bot = BotSwitch::load(store.clone(), bus.clone()).await?;
        let (dispatcher, _) = spawn_dispatcher(provider.clone());
        let replies = ReplyEngine::new(store.clone(), model, dispatcher, timing.clone());

        Ok(Arc::new(Self {
            store,
            connection: ConnectionMonitor::new(bus.clone()),
            bus,
            bot,
            provider,
            notifier,
            replies,
            timing,
        }))
    }
}
