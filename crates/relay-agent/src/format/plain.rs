//! Marker stripping for plain-text delivery and for stored context.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::blocks::{
    compile_regex, to_fixpoint, unescape_html, CodeBlock, Placeholders, FENCE_RE, PRE_RE,
};
use super::rich::{BOLD_ITALIC_RE, BOLD_RE, INLINE_CODE_RE, ITALIC_RE, LINK_RE};

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r#"(?s)<a\s+href="([^"]*)"\s*>(.*?)</a>"#));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"</?(?:b|strong|i|em|u|ins|s|strike|del|code|pre|blockquote|tg-spoiler)(?:\s[^>]*)?>")
});
/// All role markers stacked at the start of a line.
static ROLE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?m)^(?:[ \t]*(?:Q|A|User|Assistant):[ \t]?)+"));
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\n(?:[ \t]*\n){2,}"));

#[derive(Clone, Copy)]
enum Mode {
    Plain,
    Storage,
}

fn collapse_blank_runs(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").into_owned()
}

fn strip_prose(prose: &str, mode: Mode) -> String {
    let out = ANCHOR_RE.replace_all(prose, |caps: &Captures<'_>| {
        format!("{} ({})", &caps[2], unescape_html(&caps[1]))
    });
    let out = TAG_RE.replace_all(&out, "");
    let out = LINK_RE.replace_all(&out, "$1 ($2)");
    let out = INLINE_CODE_RE.replace_all(&out, "$1");
    let out = BOLD_ITALIC_RE.replace_all(&out, "$1");
    let out = BOLD_RE.replace_all(&out, "$1");
    let out = ITALIC_RE.replace_all(&out, "$1");
    match mode {
        Mode::Plain => out.into_owned(),
        Mode::Storage => {
            let out = ROLE_MARKER_RE.replace_all(&out, "");
            collapse_blank_runs(&out)
        }
    }
}

fn strip_once(text: &str, mode: Mode) -> String {
    let mut held = Placeholders::for_text(text);

    let text = FENCE_RE.replace_all(text, |caps: &Captures<'_>| match mode {
        Mode::Plain => held.hold(caps[0].to_string()),
        Mode::Storage => {
            let mut block = CodeBlock::from_fence(caps);
            block.body = collapse_blank_runs(&block.body);
            held.hold(block.to_fence())
        }
    });
    let text = PRE_RE.replace_all(&text, |caps: &Captures<'_>| {
        let mut block = CodeBlock::from_fence(caps);
        block.body = unescape_html(&block.body);
        if let Mode::Storage = mode {
            block.body = collapse_blank_runs(&block.body);
        }
        held.hold(block.to_fence())
    });

    let restored = held.restore(&strip_prose(&text, mode));
    match mode {
        Mode::Plain => restored,
        Mode::Storage => restored.trim().to_string(),
    }
}

/// Remove emphasis, link and code markers (markdown or the HTML produced by
/// [`to_rich_markup`](super::to_rich_markup)). Fenced blocks survive
/// verbatim; `<pre>` blocks turn back into fences with their bodies unescaped.
pub fn to_plain_text(text: &str) -> String {
    to_fixpoint(text.to_string(), |t| strip_once(t, Mode::Plain))
}

/// Plain text normalised for the context store: no leading role markers,
/// no runs of blank lines, trimmed.
pub fn sanitize_for_storage(text: &str) -> String {
    to_fixpoint(text.to_string(), |t| strip_once(t, Mode::Storage))
}
