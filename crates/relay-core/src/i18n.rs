//! Static translation tables and lookup.
//!
//! Lookup never fails: a key missing from the requested locale's table falls
//! back to the default locale's table, and unknown locale codes parse to the
//! caller's default.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    #[default]
    Zh,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Zh];

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    /// Parse a stored or user-supplied locale code (`"en"`, `"zh-hans"`, ...).
    pub fn parse(code: &str) -> Option<Locale> {
        let code = code.trim().to_ascii_lowercase();
        let primary = code.split(['-', '_']).next().unwrap_or("");
        match primary {
            "en" => Some(Locale::En),
            "zh" => Some(Locale::Zh),
            _ => None,
        }
    }

    /// Label shown on the language keyboard, with a flag.
    pub fn label(self) -> &'static str {
        match self {
            Locale::En => "🇺🇸 English",
            Locale::Zh => "🇨🇳 简体中文",
        }
    }

    /// English name used when asking the model to answer in this language.
    pub fn english_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Zh => "Chinese",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Welcome,
    GroupUsageHint,
    Unauthorized,
    Error,
    LanguageChanged,
    NewConversation,
    NoHistory,
    HistorySummary,
    CurrentModel,
    ModelChanged,
    UnknownModel,
    HelpIntro,
    StartDescription,
    LanguageDescription,
    SwitchModelDescription,
    NewDescription,
    HistoryDescription,
    HelpDescription,
    ChooseLanguage,
    ChooseModel,
    CommandNotFound,
    UnsupportedMessage,
    GroupCooldown,
    Seconds,
    Disclaimer,
}

impl Key {
    pub const ALL: [Key; 25] = [
        Key::Welcome,
        Key::GroupUsageHint,
        Key::Unauthorized,
        Key::Error,
        Key::LanguageChanged,
        Key::NewConversation,
        Key::NoHistory,
        Key::HistorySummary,
        Key::CurrentModel,
        Key::ModelChanged,
        Key::UnknownModel,
        Key::HelpIntro,
        Key::StartDescription,
        Key::LanguageDescription,
        Key::SwitchModelDescription,
        Key::NewDescription,
        Key::HistoryDescription,
        Key::HelpDescription,
        Key::ChooseLanguage,
        Key::ChooseModel,
        Key::CommandNotFound,
        Key::UnsupportedMessage,
        Key::GroupCooldown,
        Key::Seconds,
        Key::Disclaimer,
    ];
}

const EN: &[(Key, &str)] = &[
    (Key::Welcome, "👋 Hello! I relay your questions to a language model and keep track of our conversation."),
    (Key::GroupUsageHint, "P.S. You can use me in groups too: mention me together with your question."),
    (Key::Unauthorized, "🚫 You are not authorized to use this bot."),
    (Key::Error, "😅 Something went wrong. Please try again."),
    (Key::LanguageChanged, "🎉 Language changed to: "),
    (Key::NewConversation, "🆕 Started a new conversation. Previous context was cleared."),
    (Key::NoHistory, "🤔 No previous conversation found."),
    (Key::HistorySummary, "📜 Summary of our previous conversation:"),
    (Key::CurrentModel, "🤖 Current model: "),
    (Key::ModelChanged, "🔄 Model switched to: "),
    (Key::UnknownModel, "❓ That model is not available: "),
    (Key::HelpIntro, "🧭 Available commands:"),
    (Key::StartDescription, "🚀 Start the conversation"),
    (Key::LanguageDescription, "🗣️ Change the interface language"),
    (Key::SwitchModelDescription, "🔀 Choose a different model"),
    (Key::NewDescription, "🔄 Start a new conversation"),
    (Key::HistoryDescription, "📚 Summarize the previous conversation"),
    (Key::HelpDescription, "❓ Show all commands"),
    (Key::ChooseLanguage, "🌐 Choose your language:"),
    (Key::ChooseModel, "🤖 Choose a model:"),
    (Key::CommandNotFound, "❓ Unknown command. Use /help for the list of commands."),
    (Key::UnsupportedMessage, "😥 Media files are not supported. Please send text."),
    (Key::GroupCooldown, "😥 Cooling down. Please wait"),
    (Key::Seconds, "seconds before asking again."),
    (Key::Disclaimer, "\n\n⚠️ Answers may contain mistakes. Please verify important information."),
];

const ZH: &[(Key, &str)] = &[
    (Key::Welcome, "👋 你好！我会把你的问题转交给语言模型，并记住我们的对话。"),
    (Key::GroupUsageHint, "P.S. 你也可以在群组中使用我：@我 并附上你的问题。"),
    (Key::Unauthorized, "🚫 你没有使用此机器人的权限。"),
    (Key::Error, "😅 出错了，请再试一次。"),
    (Key::LanguageChanged, "🎉 语言已切换为："),
    (Key::NewConversation, "🆕 已开始新的对话，之前的上下文已清除。"),
    (Key::NoHistory, "🤔 没有找到之前的对话。"),
    (Key::HistorySummary, "📜 之前对话的总结："),
    (Key::CurrentModel, "🤖 当前模型："),
    (Key::ModelChanged, "🔄 模型已切换为："),
    (Key::UnknownModel, "❓ 该模型不可用："),
    (Key::HelpIntro, "🧭 可用命令："),
    (Key::StartDescription, "🚀 开始对话"),
    (Key::LanguageDescription, "🗣️ 切换界面语言"),
    (Key::SwitchModelDescription, "🔀 选择其他模型"),
    (Key::NewDescription, "🔄 开始新的对话"),
    (Key::HistoryDescription, "📚 总结之前的对话"),
    (Key::HelpDescription, "❓ 显示所有命令"),
    (Key::ChooseLanguage, "🌐 请选择语言："),
    (Key::ChooseModel, "🤖 请选择模型："),
    (Key::CommandNotFound, "❓ 无法识别的命令。使用 /help 查看命令列表。"),
    (Key::UnsupportedMessage, "😥 暂不支持媒体文件，请发送文字。"),
    (Key::GroupCooldown, "😥 冷却中，请等待"),
    (Key::Seconds, "秒后再试。"),
    (Key::Disclaimer, "\n\n⚠️ 回答可能存在错误，重要信息请自行核实。"),
];

fn table(locale: Locale) -> &'static [(Key, &'static str)] {
    match locale {
        Locale::En => EN,
        Locale::Zh => ZH,
    }
}

fn lookup(locale: Locale, key: Key) -> Option<&'static str> {
    table(locale)
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, text)| *text)
}

/// Translate `key` into `locale`, falling back to the default locale's table.
pub fn translate(key: Key, locale: Locale) -> &'static str {
    lookup(locale, key)
        .or_else(|| lookup(Locale::default(), key))
        .unwrap_or("")
}
