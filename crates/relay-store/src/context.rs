//! Per-user rolling conversation context and preference scalars.
//!
//! Keys:
//! - `context:{user}`  sanitized turns separated by a blank line
//! - `language:{user}` locale code
//! - `model:{user}`    model id from the catalog

use std::sync::Arc;
use std::time::Duration;

use relay_core::{Locale, ModelCatalog};
use tracing::debug;

use crate::error::StoreError;
use crate::kv::KvStore;

/// Separator between stored turns.
const RECORD_SEPARATOR: &str = "\n\n";
const RECORD_PREFIX: &str = "Q: ";

/// Text transform applied to every record before it is stored.
pub type Sanitizer = fn(&str) -> String;

/// Effective preferences for one user. Never missing: unset or invalid
/// stored values resolve to the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub language: Locale,
    pub active_model: String,
}

#[derive(Debug, Clone)]
pub struct PreferenceDefaults {
    pub locale: Locale,
    pub catalog: ModelCatalog,
}

pub struct ContextStore {
    kv: Arc<dyn KvStore>,
    defaults: PreferenceDefaults,
    sanitize: Sanitizer,
    max_context_chars: usize,
    context_ttl: Option<Duration>,
    preference_ttl: Option<Duration>,
}

fn context_key(user_id: &str) -> String {
    format!("context:{user_id}")
}

fn language_key(user_id: &str) -> String {
    format!("language:{user_id}")
}

fn model_key(user_id: &str) -> String {
    format!("model:{user_id}")
}

fn trim_record(text: &str) -> String {
    text.trim().to_string()
}

impl ContextStore {
    pub fn new(kv: Arc<dyn KvStore>, defaults: PreferenceDefaults) -> Self {
        Self {
            kv,
            defaults,
            sanitize: trim_record,
            max_context_chars: relay_core::config::DEFAULT_MAX_CONTEXT_CHARS,
            context_ttl: Some(Duration::from_secs(relay_core::config::CONTEXT_TTL_SECS)),
            preference_ttl: Some(Duration::from_secs(
                relay_core::config::PREFERENCE_TTL_SECS,
            )),
        }
    }

    pub fn with_sanitizer(mut self, sanitize: Sanitizer) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Cap on stored context length in characters. Zero means unbounded.
    pub fn with_max_context_chars(mut self, max: usize) -> Self {
        self.max_context_chars = max;
        self
    }

    /// A zero duration stores without expiry.
    pub fn with_ttls(mut self, context: Duration, preference: Duration) -> Self {
        self.context_ttl = (!context.is_zero()).then_some(context);
        self.preference_ttl = (!preference.is_zero()).then_some(preference);
        self
    }

    pub fn defaults(&self) -> &PreferenceDefaults {
        &self.defaults
    }

    pub async fn get_context(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let raw = self.kv.get(&context_key(user_id)).await?;
        Ok(raw.filter(|c| !c.trim().is_empty()))
    }

    /// Append one `Q: ..\nA: ..` record to the user's context.
    ///
    /// Question and answer are sanitized separately so role markers the model
    /// echoed inside its answer cannot be confused with record boundaries.
    pub async fn append_turn(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<(), StoreError> {
        let question = (self.sanitize)(question);
        let answer = (self.sanitize)(answer);
        if question.is_empty() && answer.is_empty() {
            return Ok(());
        }
        let record = format!("{RECORD_PREFIX}{question}\nA: {answer}");

        let combined = match self.get_context(user_id).await? {
            Some(existing) => format!("{}{RECORD_SEPARATOR}{record}", existing.trim_end()),
            None => record,
        };
        let stored = truncate_front(&combined, self.max_context_chars);
        debug!(
            user = user_id,
            chars = stored.chars().count(),
            "context updated"
        );
        self.kv
            .put(&context_key(user_id), stored, self.context_ttl)
            .await
    }

    pub async fn clear_context(&self, user_id: &str) -> Result<(), StoreError> {
        self.kv.delete(&context_key(user_id)).await
    }

    pub async fn get_preference(&self, user_id: &str) -> Result<Preference, StoreError> {
        let language = self
            .kv
            .get(&language_key(user_id))
            .await?
            .and_then(|code| Locale::parse(&code))
            .unwrap_or(self.defaults.locale);

        let stored_model = self.kv.get(&model_key(user_id)).await?;
        let active_model = self
            .defaults
            .catalog
            .resolve(stored_model.as_deref())
            .unwrap_or_default()
            .to_string();

        Ok(Preference {
            language,
            active_model,
        })
    }

    pub async fn set_language(&self, user_id: &str, language: Locale) -> Result<(), StoreError> {
        self.kv
            .put(&language_key(user_id), language.code(), self.preference_ttl)
            .await
    }

    pub async fn set_model(&self, user_id: &str, model: &str) -> Result<(), StoreError> {
        self.kv
            .put(&model_key(user_id), model, self.preference_ttl)
            .await
    }
}

/// Drop whole records from the front until at most `max` characters remain.
///
/// A record starts with `Q: ` right after a separator. Separators inside a
/// code fence are not record boundaries. The newest record is always kept,
/// even when it alone is longer than `max`.
fn truncate_front(text: &str, max: usize) -> &str {
    if max == 0 || text.chars().count() <= max {
        return text;
    }
    let mut newest = text;
    for (at, _) in text.match_indices(RECORD_SEPARATOR) {
        let cut = at + RECORD_SEPARATOR.len();
        let rest = &text[cut..];
        let inside_fence = text[..cut].matches("```").count() % 2 == 1;
        if inside_fence || !rest.starts_with(RECORD_PREFIX) {
            continue;
        }
        if rest.chars().count() <= max {
            return rest;
        }
        newest = rest;
    }
    newest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKv;

    fn store() -> (Arc<MemoryKv>, ContextStore) {
        let kv = Arc::new(MemoryKv::new());
        let defaults = PreferenceDefaults {
            locale: Locale::Zh,
            catalog: ModelCatalog::new(["m1", "m2"]),
        };
        let store = ContextStore::new(kv.clone(), defaults);
        (kv, store)
    }

    fn shout(text: &str) -> String {
        text.trim().to_uppercase()
    }

    #[tokio::test]
    async fn append_creates_then_extends_context() {
        let (_, store) = store();
        assert_eq!(store.get_context("u1").await.unwrap(), None);

        store.append_turn("u1", "hello", "hi").await.unwrap();
        assert_eq!(
            store.get_context("u1").await.unwrap().as_deref(),
            Some("Q: hello\nA: hi")
        );

        store.append_turn("u1", "again", "sure").await.unwrap();
        assert_eq!(
            store.get_context("u1").await.unwrap().as_deref(),
            Some("Q: hello\nA: hi\n\nQ: again\nA: sure")
        );
    }

    #[tokio::test]
    async fn records_pass_through_sanitizer() {
        let (kv, store) = store();
        let store = store.with_sanitizer(shout);
        store.append_turn("u1", "q", "a").await.unwrap();
        assert_eq!(
            kv.get("context:u1").await.unwrap().as_deref(),
            Some("Q: Q\nA: A")
        );
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (_, store) = store();
        store.clear_context("nobody").await.unwrap();
        assert_eq!(store.get_context("nobody").await.unwrap(), None);

        store.append_turn("u1", "q", "a").await.unwrap();
        store.clear_context("u1").await.unwrap();
        store.clear_context("u1").await.unwrap();
        assert_eq!(store.get_context("u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn context_is_capped_from_the_front() {
        let (_, store) = store();
        let store = store.with_max_context_chars(40);
        store.append_turn("u1", "first question", "first").await.unwrap();
        store.append_turn("u1", "second", "answer").await.unwrap();

        let context = store.get_context("u1").await.unwrap().unwrap();
        assert!(context.chars().count() <= 40);
        assert!(context.ends_with("Q: second\nA: answer"));
        assert!(!context.contains("first question"));
    }

    #[tokio::test]
    async fn preferences_default_then_persist() {
        let (_, store) = store();
        let pref = store.get_preference("u1").await.unwrap();
        assert_eq!(pref.language, Locale::Zh);
        assert_eq!(pref.active_model, "m1");

        store.set_language("u1", Locale::En).await.unwrap();
        store.set_model("u1", "m2").await.unwrap();
        let pref = store.get_preference("u1").await.unwrap();
        assert_eq!(pref.language, Locale::En);
        assert_eq!(pref.active_model, "m2");
    }

    #[tokio::test]
    async fn retired_model_resolves_to_default() {
        let (kv, store) = store();
        kv.put("model:u1", "retired", None).await.unwrap();
        kv.put("language:u1", "klingon", None).await.unwrap();
        let pref = store.get_preference("u1").await.unwrap();
        assert_eq!(pref.active_model, "m1");
        assert_eq!(pref.language, Locale::Zh);
    }

    #[tokio::test]
    async fn cap_never_cuts_into_a_code_answer() {
        let (_, store) = store();
        let store = store.with_max_context_chars(60);
        let code: String = (0..6).map(|i| format!("let v{i} = {i};\n")).collect();
        let answer = format!("Here:\n```rust\n{code}```");

        store.append_turn("u1", "hi", "hello").await.unwrap();
        store.append_turn("u1", "code?", &answer).await.unwrap();
        let context = store.get_context("u1").await.unwrap().unwrap();
        assert_eq!(context, format!("Q: code?\nA: {answer}"));

        store.append_turn("u1", "next", "fine").await.unwrap();
        let context = store.get_context("u1").await.unwrap().unwrap();
        assert_eq!(context, "Q: next\nA: fine");
    }

    #[test]
    fn truncate_front_drops_whole_records() {
        assert_eq!(truncate_front("short", 10), "short");
        assert_eq!(truncate_front("abc", 0), "abc");

        let text = "Q: a\nA: 1\n\nQ: b\nA: 2\n\nQ: c\nA: 3";
        assert_eq!(truncate_front(text, 20), "Q: b\nA: 2\n\nQ: c\nA: 3");
        assert_eq!(truncate_front(text, 12), "Q: c\nA: 3");
        assert_eq!(truncate_front(text, 3), "Q: c\nA: 3");
    }

    #[test]
    fn truncate_front_skips_separators_inside_fences() {
        let text = "Q: a\nA: ```\nx\n\nQ: fake\n```\n\nQ: b\nA: 2";
        assert_eq!(truncate_front(text, 25), "Q: b\nA: 2");
    }

    #[test]
    fn truncate_front_skips_blank_lines_inside_an_answer() {
        let text = "Q: a\nA: one\n\ntwo\n\nQ: b\nA: 2";
        assert_eq!(truncate_front(text, 15), "Q: b\nA: 2");
    }
}
