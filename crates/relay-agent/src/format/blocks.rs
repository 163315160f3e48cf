//! Code-block and placeholder primitives shared by the renderers.
//!
//! Every transform follows extract → transform prose → restore: spans that
//! must not be touched are swapped for `<open><n><close>` tokens, where the
//! delimiters are private-use code points absent from the input.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Private-use plane scanned for free token delimiters.
const DELIMITER_RANGE: std::ops::Range<u32> = 0xE000..0xF900;

pub(crate) fn compile_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("hard-coded pattern is valid")
}

/// Markdown fence. The info string is optional; "```x```" is a one-line block.
pub(crate) static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?s)```(?:([\w+#.-]*)[ \t]*\n)?(.*?)```"));

/// `<pre>` block as produced by the rich renderer.
pub(crate) static PRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r#"(?s)<pre>(?:<code(?: class="language-([\w+#.-]*)")?>)?(.*?)(?:</code>)?</pre>"#)
});

/// A fenced code block with its language tag and literal body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CodeBlock {
    pub lang: String,
    pub body: String,
}

impl CodeBlock {
    pub(crate) fn from_fence(caps: &Captures<'_>) -> Self {
        Self {
            lang: caps.get(1).map_or("", |m| m.as_str()).to_string(),
            body: caps.get(2).map_or("", |m| m.as_str()).to_string(),
        }
    }

    /// Markdown fence form. A one-line block with no language stays on one line.
    pub(crate) fn to_fence(&self) -> String {
        if self.lang.is_empty() && !self.body.contains('\n') {
            format!("```{}```", self.body)
        } else {
            format!("```{}\n{}```", self.lang, self.body)
        }
    }
}

/// Saved spans, restored by index.
pub(crate) struct Placeholders {
    open: char,
    close: char,
    saved: Vec<String>,
}

impl Placeholders {
    /// Pick token delimiters that do not occur in `text`, so user content can
    /// never be mistaken for a token.
    pub(crate) fn for_text(text: &str) -> Self {
        let mut free = DELIMITER_RANGE
            .filter_map(char::from_u32)
            .filter(|c| !text.contains(*c));
        let open = free.next().unwrap_or('\u{E000}');
        let close = free.next().unwrap_or('\u{E001}');
        Self {
            open,
            close,
            saved: Vec::new(),
        }
    }

    /// Save `content` and return the token that stands in for it.
    pub(crate) fn hold(&mut self, content: String) -> String {
        self.saved.push(content);
        format!("{}{}{}", self.open, self.saved.len() - 1, self.close)
    }

    /// Replace every token with its saved content. Saved content may itself
    /// contain tokens (a link label holding inline code), so restore repeats.
    pub(crate) fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for _ in 0..=self.saved.len() {
            if !out.contains(self.open) {
                break;
            }
            out = self.restore_once(&out);
        }
        out
    }

    fn restore_once(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(self.open) {
            out.push_str(&rest[..start]);
            let after = &rest[start + self.open.len_utf8()..];
            let digits = after
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after.len());
            let saved = after[digits..]
                .starts_with(self.close)
                .then(|| after[..digits].parse::<usize>().ok())
                .flatten()
                .and_then(|i| self.saved.get(i));
            match saved {
                Some(content) => {
                    out.push_str(content);
                    rest = &after[digits + self.close.len_utf8()..];
                }
                None => {
                    out.push(self.open);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}

pub(crate) fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Apply `f` until the output stops changing.
///
/// `f` must only ever shorten its input when it changes it; a change that does
/// not shorten ends the loop so it always terminates.
pub(crate) fn to_fixpoint(text: String, f: impl Fn(&str) -> String) -> String {
    let mut current = text;
    loop {
        let next = f(&current);
        if next == current {
            return current;
        }
        let shrank = next.len() < current.len();
        current = next;
        if !shrank {
            return current;
        }
    }
}
