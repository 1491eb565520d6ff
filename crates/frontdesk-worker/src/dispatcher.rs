//! Delayed outbound sends, executed in due order by one task.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::error::{Result, WorkerError};
use crate::provider::MessagingProvider;

#[derive(Debug, Clone, PartialEq)]
pub struct DeferredSend {
    pub chat_id: String,
    pub body: String,
    pub delay: Duration,
    /// Which responder produced the message, for logs.
    pub label: &'static str,
}

#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<DeferredSend>,
}

impl DispatcherHandle {
    pub fn schedule(&self, send: DeferredSend) -> Result<()> {
        tracing::debug!(
            chat_id = %send.chat_id,
            delay_ms = send.delay.as_millis() as u64,
            label = send.label,
            "Scheduling reply"
        );
        self.tx.send(send).map_err(|_| WorkerError::ChannelClosed)
    }
}

/// Starts the dispatcher. It runs until every handle is dropped and the
/// remaining queue has been sent.
pub fn spawn_dispatcher(provider: Arc<dyn MessagingProvider>) -> (DispatcherHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(provider, rx));
    (DispatcherHandle { tx }, task)
}

struct Queued {
    due: Instant,
    seq: u64,
    send: DeferredSend,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // Reversed: BinaryHeap is a max-heap and the earliest job must pop first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

async fn run(provider: Arc<dyn MessagingProvider>, mut rx: mpsc::UnboundedReceiver<DeferredSend>) {
    let mut queue: BinaryHeap<Queued> = BinaryHeap::new();
    let mut seq = 0u64;
    let mut open = true;

    loop {
        let next_due = queue.peek().map(|q| q.due);
        let deadline = next_due.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            received = rx.recv(), if open => match received {
                Some(send) => {
                    queue.push(Queued {
                        due: Instant::now() + send.delay,
                        seq,
                        send,
                    });
                    seq += 1;
                }
                None => open = false,
            },
            _ = sleep_until(deadline), if next_due.is_some() => {
                if let Some(Queued { send, .. }) = queue.pop() {
                    deliver(provider.as_ref(), send).await;
                }
            }
        }

        if !open && queue.is_empty() {
            break;
        }
    }

    tracing::debug!("Dispatcher stopped");
}

async fn deliver(provider: &dyn MessagingProvider, send: DeferredSend) {
    match provider.send_message(&send.chat_id, &send.body).await {
        Ok(()) => tracing::info!(chat_id = %send.chat_id, label = send.label, "Reply sent"),
        Err(e) => tracing::error!(
            chat_id = %send.chat_id,
            label = send.label,
            error = %e,
            "Reply delivery failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use frontdesk_core::{ChatSummaryData, MessageData};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, Instant)>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl MessagingProvider for Recorder {
        async fn send_message(&self, _chat_id: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push((body.to_string(), Instant::now()));
            if self.fail_on.as_deref() == Some(body) {
                return Err(WorkerError::ChannelClosed);
            }
            Ok(())
        }

        async fn fetch_chat_summaries(&self) -> Result<Vec<ChatSummaryData>> {
            Ok(Vec::new())
        }

        async fn fetch_messages(&self, _chat_id: &str, _limit: usize) -> Result<Vec<MessageData>> {
            Ok(Vec::new())
        }
    }

    fn job(body: &str, ms: u64) -> DeferredSend {
        DeferredSend {
            chat_id: "1@c.us".into(),
            body: body.into(),
            delay: Duration::from_millis(ms),
            label: "test",
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sends_in_due_order_after_delay() {
        let recorder = Arc::new(Recorder::default());
        let start = Instant::now();
        let (handle, task) = spawn_dispatcher(recorder.clone());

        handle.schedule(job("late", 3000)).unwrap();
        handle.schedule(job("early", 1000)).unwrap();
        drop(handle);
        task.await.unwrap();

        let sent = recorder.sent.lock().unwrap();
        let bodies: Vec<&str> = sent.iter().map(|(b, _)| b.as_str()).collect();
        assert_eq!(bodies, vec!["early", "late"]);
        assert!(sent[0].1 - start >= Duration::from_millis(1000));
        assert!(sent[1].1 - start >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_is_not_retried() {
        let recorder = Arc::new(Recorder {
            fail_on: Some("boom".into()),
            ..Default::default()
        });
        let (handle, task) = spawn_dispatcher(recorder.clone());

        handle.schedule(job("boom", 10)).unwrap();
        handle.schedule(job("after", 20)).unwrap();
        drop(handle);
        task.await.unwrap();

        let bodies: Vec<String> = recorder
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|(b, _)| b.clone())
            .collect();
        assert_eq!(bodies, vec!["boom".to_string(), "after".to_string()]);
    }
}
