//! `ChatTransport` over the Telegram Bot API.
//!
//! Rich messages go out with `ParseMode::Html`. Telegram reports malformed
//! markup as a "can't parse entities" bad request; that one error maps to
//! [`DeliveryError::MarkupRejected`] so the pipeline can retry as plain text.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode, ReplyParameters,
};

use relay_agent::pipeline::{ChatTransport, DeliveryError, Keyboard, SendOptions};

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}

fn classify(description: String) -> DeliveryError {
    if description.to_ascii_lowercase().contains("can't parse entities") {
        DeliveryError::MarkupRejected(description)
    } else {
        DeliveryError::Transport(description)
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), DeliveryError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if options.rich {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(id) = options.reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(id)));
        }
        if let Some(keyboard) = &options.keyboard {
            request = request.reply_markup(markup(keyboard));
        }
        request
            .await
            .map(|_| ())
            .map_err(|e| classify(e.to_string()))
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(text) = text {
            request = request.text(text);
        }
        request
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), DeliveryError> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use relay_agent::pipeline::KeyboardButton;

    use super::*;

    #[test]
    fn parse_failures_are_markup_rejections() {
        let err = classify(
            "A Telegram's error: Bad Request: can't parse entities: Unsupported start tag \"x\""
                .into(),
        );
        assert!(matches!(err, DeliveryError::MarkupRejected(_)));
    }

    #[test]
    fn other_failures_are_transport_errors() {
        let err = classify("Bad Request: chat not found".into());
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[test]
    fn keyboard_rows_are_preserved() {
        let keyboard = vec![
            vec![KeyboardButton::new("m1", "model_m1")],
            vec![KeyboardButton::new("m2", "model_m2")],
        ];
        let markup = markup(&keyboard);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[1][0].text, "m2");
    }
}
