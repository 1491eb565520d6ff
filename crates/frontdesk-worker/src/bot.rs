use std::sync::atomic::{AtomicBool, Ordering};

use frontdesk_db::BotStatus;

use crate::bus::EventBus;
use crate::error::Result;
use crate::events::DashboardEvent;
use crate::store::Store;

/// Process-wide auto-reply switch, mirrored to the `bot_status` document.
pub struct BotSwitch {
    enabled: AtomicBool,
    store: Store,
    bus: EventBus,
}

impl BotSwitch {
    pub async fn load(store: Store, bus: EventBus) -> Result<Self> {
        let status: BotStatus = store.read().await?;
        tracing::info!(enabled = status.enabled, "Bot status loaded");
        Ok(Self {
            enabled: AtomicBool::new(status.enabled),
            store,
            bus,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Persists the new value, then tells every observer.
    pub async fn set(&self, enabled: bool) -> Result<()> {
        {
            let writer = self.store.write().await;
            writer.save(&BotStatus { enabled }).await?;
            self.enabled.store(enabled, Ordering::SeqCst);
        }
        tracing::info!(enabled, "Bot status changed");
        self.bus.publish(DashboardEvent::BotStatusChanged { enabled });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdesk_db::FrontdeskDb;
    use std::sync::Arc;

    #[tokio::test]
    async fn toggle_persists_and_broadcasts() {
        let store = Store::new(Arc::new(FrontdeskDb::new_in_memory().await.unwrap()));
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let bot = BotSwitch::load(store.clone(), bus).await.unwrap();
        assert!(bot.is_enabled());

        bot.set(false).await.unwrap();
        assert!(!bot.is_enabled());
        assert_eq!(
            rx.recv().await.unwrap(),
            DashboardEvent::BotStatusChanged { enabled: false }
        );

        let stored: BotStatus = store.read().await.unwrap();
        assert!(!stored.enabled);
    }
}
