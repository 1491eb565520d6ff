use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use frontdesk_db::{Document, FrontdeskDb};

use crate::error::Result;

/// Shared handle to the document store.
///
/// Reads go straight to the database. Read-modify-write sequences take the
/// writer guard first so two tasks never interleave their updates.
#[derive(Clone)]
pub struct Store {
    db: Arc<FrontdeskDb>,
    writer: Arc<Mutex<()>>,
}

impl Store {
    pub fn new(db: Arc<FrontdeskDb>) -> Self {
        Self {
            db,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub async fn read<D: Document>(&self) -> Result<D> {
        Ok(self.db.load::<D>().await?)
    }

    pub async fn write(&self) -> StoreWriter<'_> {
        StoreWriter {
            db: &self.db,
            _guard: self.writer.lock().await,
        }
    }

    pub fn db(&self) -> &FrontdeskDb {
        &self.db
    }
}

/// Exclusive access for one read-modify-write sequence.
pub struct StoreWriter<'a> {
    db: &'a FrontdeskDb,
    _guard: MutexGuard<'a, ()>,
}

impl StoreWriter<'_> {
    pub async fn load<D: Document>(&self) -> Result<D> {
        Ok(self.db.load::<D>().await?)
    }

    pub async fn save<D: Document>(&self, doc: &D) -> Result<()> {
        Ok(self.db.save(doc).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdesk_db::BotStatus;

    #[tokio::test]
    async fn writer_round_trips_documents() {
        let store = Store::new(Arc::new(FrontdeskDb::new_in_memory().await.unwrap()));
        {
            let writer = store.write().await;
            writer.save(&BotStatus { enabled: false }).await.unwrap();
        }
        let status: BotStatus = store.read().await.unwrap();
        assert!(!status.enabled);
    }

    #[tokio::test]
    async fn writers_are_serialised() {
        let store = Store::new(Arc::new(FrontdeskDb::new_in_memory().await.unwrap()));
        let first = store.write().await;
        let second = tokio::time::timeout(std::time::Duration::from_millis(20), store.write()).await;
        assert!(second.is_err());
        drop(first);
        let _ = store.write().await;
    }
}
