#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_agent::admission::AdmissionControl;
use relay_agent::pipeline::{ChatTransport, DeliveryError, PipelineContext, SendOptions};
use relay_agent::provider::{CompletionClient, CompletionError, PromptMessage};
use relay_core::{ChatKind, InboundMessage, Locale, ModelCatalog, RelayConfig};
use relay_store::{ContextStore, CooldownRecords, MemoryKv, PreferenceDefaults};

pub const WHITELISTED: &str = "100";
pub const STRANGER: &str = "200";
pub const BOT_NAME: &str = "relaybot";
pub const GROUP_CHAT: i64 = -1001;

/// Next reply of the scripted backend.
pub enum Step {
    Answer(&'static str),
    Overloaded,
    Fail,
}

pub struct ScriptedClient {
    catalog: ModelCatalog,
    script: Mutex<VecDeque<Step>>,
    pub prompts: Mutex<Vec<(String, Vec<PromptMessage>)>>,
}

impl ScriptedClient {
    pub fn new(models: &[&str]) -> Self {
        Self {
            catalog: ModelCatalog::new(models.iter().copied()),
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, step: Step) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Vec<PromptMessage> {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|(_, p)| p.clone())
            .unwrap_or_default()
    }

    pub fn last_model(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().map(|(m, _)| m.clone())
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &[PromptMessage],
        model: &str,
    ) -> Result<String, CompletionError> {
        self.prompts
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_vec()));
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Answer(text)) => Ok(text.to_string()),
            Some(Step::Overloaded) => Err(CompletionError::Overloaded("busy".into())),
            Some(Step::Fail) => Err(CompletionError::Api {
                status: 401,
                message: "bad key".into(),
            }),
            None => Ok("default answer".to_string()),
        }
    }

    fn is_valid_model(&self, model: &str) -> bool {
        self.catalog.contains(model)
    }

    fn list_models(&self) -> Vec<String> {
        self.catalog.models().to_vec()
    }
}

#[derive(Debug, Clone)]
pub struct Sent {
    pub chat_id: i64,
    pub text: String,
    pub options: SendOptions,
}

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<Sent>>,
    pub answered: Mutex<Vec<String>>,
    pub typing: AtomicUsize,
    pub reject_rich: AtomicBool,
    /// Rich sends accepted before every later one is rejected.
    pub rich_budget: Mutex<Option<usize>>,
    pub fail_all: AtomicBool,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.text).collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), DeliveryError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("network down".into()));
        }
        if options.rich && self.reject_rich.load(Ordering::SeqCst) {
            return Err(DeliveryError::MarkupRejected("can't parse entities".into()));
        }
        if options.rich {
            if let Some(budget) = self.rich_budget.lock().unwrap().as_mut() {
                if *budget == 0 {
                    return Err(DeliveryError::MarkupRejected("can't parse entities".into()));
                }
                *budget -= 1;
            }
        }
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            text: text.to_string(),
            options: options.clone(),
        });
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        _text: Option<&str>,
    ) -> Result<(), DeliveryError> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }

    async fn send_typing(&self, _chat_id: i64) -> Result<(), DeliveryError> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub config: RelayConfig,
    pub kv: Arc<MemoryKv>,
    pub store: ContextStore,
    pub admission: AdmissionControl,
    pub client: ScriptedClient,
    pub transport: RecordingTransport,
    pub system: PromptMessage,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_cooldown(Duration::from_millis(180_000))
    }

    pub fn with_cooldown(window: Duration) -> Self {
        let mut config = RelayConfig::default();
        config.telegram.bot_name = BOT_NAME.into();
        config.access.whitelist = vec![WHITELISTED.into()];
        config.access.group_cooldown_ms = window.as_millis() as u64;
        config.provider.models = vec!["m1".into(), "m2".into()];
        config.locale.default = Locale::En;

        let kv = Arc::new(MemoryKv::new());
        let store = ContextStore::new(
            kv.clone(),
            PreferenceDefaults {
                locale: config.locale.default,
                catalog: config.provider.catalog(),
            },
        )
        .with_sanitizer(relay_agent::format::sanitize_for_storage);
        let admission = AdmissionControl::new(
            config.access.whitelist.clone(),
            window,
            CooldownRecords::new(kv.clone()),
        );

        Self {
            config,
            kv,
            store,
            admission,
            client: ScriptedClient::new(&["m1", "m2"]),
            transport: RecordingTransport::default(),
            system: PromptMessage::new("system", "You are a helpful assistant."),
        }
    }
}

impl PipelineContext for Harness {
    fn config(&self) -> &RelayConfig {
        &self.config
    }

    fn store(&self) -> &ContextStore {
        &self.store
    }

    fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    fn completion(&self) -> &dyn CompletionClient {
        &self.client
    }

    fn transport(&self) -> &dyn ChatTransport {
        &self.transport
    }

    fn system_message(&self) -> &PromptMessage {
        &self.system
    }
}

pub fn private(sender: &str, text: &str) -> InboundMessage {
    InboundMessage {
        chat_id: sender.parse().unwrap_or(1),
        chat_kind: ChatKind::Private,
        sender_id: sender.to_string(),
        message_id: 7,
        text: text.to_string(),
        has_media: false,
    }
}

pub fn group(sender: &str, text: &str) -> InboundMessage {
    InboundMessage {
        chat_id: GROUP_CHAT,
        chat_kind: ChatKind::Group,
        sender_id: sender.to_string(),
        message_id: 9,
        text: text.to_string(),
        has_media: false,
    }
}
