//! Decides what, if anything, to answer an inbound message with.
//!
//! Keyword rules are tried first, then the generative model, then the
//! canned responder. Exactly one reply is produced per request.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use frontdesk_db::{AgentSettings, KnowledgeBase, Message, ReplyRules};

use crate::ai::GenerativeModel;
use crate::config::TimingConfig;
use crate::dispatcher::{DeferredSend, DispatcherHandle};
use crate::error::Result;
use crate::matching::{Matcher, SubstringMatcher};
use crate::prompt::{Persona, auto_replies_enabled, build_prompt};
use crate::simulated;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Rule,
    Ai,
    Simulated,
}

impl ReplySource {
    pub fn label(&self) -> &'static str {
        match self {
            ReplySource::Rule => "rule",
            ReplySource::Ai => "ai",
            ReplySource::Simulated => "simulated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub chat_id: String,
    pub body: String,
    /// Stored conversation, including the message being answered.
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplyDecision {
    pub chat_id: String,
    pub body: String,
    pub delay: Duration,
    pub source: ReplySource,
}

#[derive(Clone)]
pub struct ReplyEngine {
    store: Store,
    model: Option<Arc<dyn GenerativeModel>>,
    dispatcher: DispatcherHandle,
    timing: TimingConfig,
}

impl ReplyEngine {
    pub fn new(
        store: Store,
        model: Option<Arc<dyn GenerativeModel>>,
        dispatcher: DispatcherHandle,
        timing: TimingConfig,
    ) -> Self {
        Self {
            store,
            model,
            dispatcher,
            timing,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Settings, rules and knowledge are re-read on every call so edits
    /// made by other tools apply to the next message.
    pub async fn decide(&self, request: &ReplyRequest) -> Result<ReplyDecision> {
        let settings: AgentSettings = self.store.read().await?;

        if auto_replies_enabled(&settings) {
            let rules: ReplyRules = self.store.read().await?;
            if let Some(rule) = SubstringMatcher.first(&request.body, rules.iter()) {
                tracing::info!(chat_id = %request.chat_id, keyword = %rule.keyword.trim(), "Keyword rule matched");
                return Ok(self.decision(
                    request,
                    rule.response.clone(),
                    Duration::from_millis(self.timing.rule_reply_delay_ms),
                    ReplySource::Rule,
                ));
            }
        }

        let persona = Persona::from_settings(&settings);

        if let Some(model) = &self.model {
            let knowledge: KnowledgeBase = self.store.read().await?;
            let prompt = build_prompt(&persona, &knowledge, &request.history, &request.body);
            match model.generate(&prompt).await {
                Ok(text) => {
                    return Ok(self.decision(request, text, self.jitter(), ReplySource::Ai));
                }
                Err(e) => {
                    tracing::warn!(chat_id = %request.chat_id, error = %e, "Model unavailable, using canned reply");
                }
            }
        }

        let body = simulated::respond(&request.body, &persona);
        Ok(self.decision(request, body, self.jitter(), ReplySource::Simulated))
    }

    /// Decides and schedules the reply. Failures are logged, never returned.
    pub async fn respond(&self, request: ReplyRequest) {
        let decision = match self.decide(&request).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(chat_id = %request.chat_id, error = %e, "Reply decision failed");
                return;
            }
        };

        let send = DeferredSend {
            chat_id: decision.chat_id,
            body: decision.body,
            delay: decision.delay,
            label: decision.source.label(),
        };
        if let Err(e) = self.dispatcher.schedule(send) {
            tracing::error!(chat_id = %request.chat_id, error = %e, "Could not schedule reply");
        }
    }

    fn decision(
        &self,
        request: &ReplyRequest,
        body: String,
        delay: Duration,
        source: ReplySource,
    ) -> ReplyDecision {
        ReplyDecision {
            chat_id: request.chat_id.clone(),
            body,
            delay,
            source,
        }
    }

    fn jitter(&self) -> Duration {
        let min = self.timing.reply_jitter_min_ms;
        let max = self.timing.reply_jitter_max_ms;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiError;
    use crate::dispatcher::spawn_dispatcher;
    use crate::error::WorkerError;
    use crate::prompt::AUTO_REPLIES;
    use crate::provider::MessagingProvider;
    use async_trait::async_trait;
    use frontdesk_core::{ChatSummaryData, MessageData};
    use frontdesk_db::FrontdeskDb;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedModel {
        reply: std::result::Result<String, ()>,
        calls: AtomicUsize,
        last_prompt: Mutex<String>,
    }

    impl ScriptedModel {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(String::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(String::new()),
            })
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> std::result::Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            self.reply.clone().map_err(|_| AiError::EmptyResponse)
        }
    }

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessagingProvider for Outbox {
        async fn send_message(&self, chat_id: &str, body: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), body.to_string()));
            Ok(())
        }

        async fn fetch_chat_summaries(&self) -> Result<Vec<ChatSummaryData>> {
            Err(WorkerError::NotStarted)
        }

        async fn fetch_messages(&self, _chat_id: &str, _limit: usize) -> Result<Vec<MessageData>> {
            Err(WorkerError::NotStarted)
        }
    }

    async fn engine_with(
        model: Option<Arc<dyn GenerativeModel>>,
        timing: TimingConfig,
    ) -> (ReplyEngine, Store, Arc<Outbox>) {
        let store = Store::new(Arc::new(FrontdeskDb::new_in_memory().await.unwrap()));
        let outbox = Arc::new(Outbox::default());
        let (dispatcher, _task) = spawn_dispatcher(outbox.clone());
        let engine = ReplyEngine::new(store.clone(), model, dispatcher, timing);
        (engine, store, outbox)
    }

    async fn engine(model: Option<Arc<dyn GenerativeModel>>) -> (ReplyEngine, Store, Arc<Outbox>) {
        engine_with(model, TimingConfig::default()).await
    }

    fn request(body: &str) -> ReplyRequest {
        ReplyRequest {
            chat_id: "1@c.us".into(),
            body: body.into(),
            history: vec![Message::new("m1", body, false, 0, "chat")],
        }
    }

    #[tokio::test]
    async fn greeting_rule_fires_without_model() {
        let model = ScriptedModel::ok("never");
        let (engine, _, _) = engine(Some(model.clone() as Arc<dyn GenerativeModel>)).await;

        let decision = engine.decide(&request("Hola buenas")).await.unwrap();

        assert_eq!(decision.source, ReplySource::Rule);
        assert!(decision.body.starts_with("¡Hola! Gracias por contactarnos."));
        assert_eq!(decision.delay, Duration::from_millis(1000));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_credential_pricing_uses_canned_reply() {
        let (engine, _, _) = engine(None).await;

        let decision = engine.decide(&request("cuanto cuesta")).await.unwrap();

        assert_eq!(decision.source, ReplySource::Simulated);
        assert!(decision.body.starts_with("Nuestros planes son súper flexibles."));
        assert!(decision.delay >= Duration::from_millis(2000));
        assert!(decision.delay <= Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn disabled_rules_go_to_model() {
        let model = ScriptedModel::ok("¡Buenas! ¿Qué necesitas?");
        let (engine, store, _) = engine(Some(model.clone() as Arc<dyn GenerativeModel>)).await;
        let mut settings = AgentSettings::default();
        settings.set(AUTO_REPLIES, "false");
        store.write().await.save(&settings).await.unwrap();

        let decision = engine.decide(&request("hola")).await.unwrap();

        assert_eq!(decision.source, ReplySource::Ai);
        assert_eq!(decision.body, "¡Buenas! ¿Qué necesitas?");
        let prompt = model.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("Cliente: hola"));
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_canned() {
        let model = ScriptedModel::failing();
        let (engine, _, _) = engine(Some(model.clone() as Arc<dyn GenerativeModel>)).await;

        let decision = engine.decide(&request("quiero una demo")).await.unwrap();

        assert_eq!(decision.source, ReplySource::Simulated);
        assert!(decision.body.contains("https://calendly.com/talosflow/demo"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn respond_sends_exactly_one_reply() {
        let timing = TimingConfig {
            rule_reply_delay_ms: 10,
            ..TimingConfig::default()
        };
        let (engine, _, outbox) = engine_with(None, timing).await;

        engine.respond(request("precio?")).await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "1@c.us");
        assert!(sent[0].1.starts_with("Nuestros precios varían"));
    }
}
