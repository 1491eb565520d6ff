use std::sync::Arc;

use tokio::task::JoinHandle;

/// Desktop-style notification for new inbound messages.
///
/// Called on a blocking thread; delivery is fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title = %title, body = %body, "Notification");
    }
}

/// Hands one notification to `notifier` off the calling task. A notifier
/// that blocks or panics only affects the returned task.
pub(crate) fn dispatch(
    notifier: Arc<dyn Notifier>,
    title: String,
    body: String,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || notifier.notify(&title, &body))
}

pub(crate) fn inbound_title(chat_name: &str) -> String {
    format!("Nuevo mensaje de {}", chat_name)
}

pub(crate) fn inbound_body(body: &str) -> &str {
    if body.is_empty() {
        "Nuevo archivo adjunto/sticker"
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_reads_as_attachment() {
        assert_eq!(inbound_body(""), "Nuevo archivo adjunto/sticker");
        assert_eq!(inbound_body("hola"), "hola");
        assert_eq!(inbound_title("Ana"), "Nuevo mensaje de Ana");
    }

    struct Exploding;

    impl Notifier for Exploding {
        fn notify(&self, _title: &str, _body: &str) {
            panic!("notification daemon gone");
        }
    }

    #[tokio::test]
    async fn panicking_notifier_is_contained() {
        let result = dispatch(Arc::new(Exploding), "t".into(), "b".into()).await;
        assert!(result.unwrap_err().is_panic());
    }
}
