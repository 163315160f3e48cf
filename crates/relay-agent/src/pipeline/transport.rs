//! Outbound side of the chat platform, as the pipeline sees it.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardButton {
    pub label: String,
    /// Callback payload echoed back on selection (`lang_en`, `model_x`).
    pub data: String,
}

impl KeyboardButton {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard, row by row.
pub type Keyboard = Vec<Vec<KeyboardButton>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Send as rich markup (HTML). Plain text otherwise.
    pub rich: bool,
    pub reply_to: Option<i32>,
    pub keyboard: Option<Keyboard>,
}

impl SendOptions {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn rich() -> Self {
        Self {
            rich: true,
            ..Self::default()
        }
    }

    pub fn reply_to(mut self, message_id: i32) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The platform refused to parse the rich markup. Plain text may still work.
    #[error("markup rejected: {0}")]
    MarkupRejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str, options: &SendOptions)
        -> Result<(), DeliveryError>;

    /// Acknowledge an inline-keyboard press, optionally with a toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>)
        -> Result<(), DeliveryError>;

    async fn send_typing(&self, chat_id: i64) -> Result<(), DeliveryError>;
}
