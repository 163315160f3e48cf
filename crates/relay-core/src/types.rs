use serde::{Deserialize, Serialize};

/// Kind of chat an update arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
}

impl ChatKind {
    /// Group and supergroup chats are shared; cooldown applies only there.
    pub fn is_shared(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// A text message as seen by the pipeline, stripped of transport types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    /// Sender identity (Telegram numeric user id, as a string).
    pub sender_id: String,
    pub message_id: i32,
    /// Message text, or the caption for media messages.
    pub text: String,
    /// Photo, video, document, audio, voice or sticker attached.
    pub has_media: bool,
}

/// An inline-keyboard selection (`lang_en`, `model_x`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackAction {
    pub callback_id: String,
    pub chat_id: i64,
    pub sender_id: String,
    pub data: String,
}
