//! Markdown-ish model output to Telegram HTML.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::blocks::{
    compile_regex, escape_attr, escape_html, CodeBlock, Placeholders, FENCE_RE,
};

pub(crate) static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"`([^`\n]+)`"));
pub(crate) static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\[([^\]\n]+)\]\(([^)\s]+)\)"));
pub(crate) static BOLD_ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\*\*\*([^*\n]+?)\*\*\*"));
pub(crate) static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\*\*([^*\n]+?)\*\*"));
/// Single-star emphasis must hug its content, so `2 * 3 * 4` and list
/// bullets stay literal.
pub(crate) static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*"));

fn render_block(block: &CodeBlock) -> String {
    let body = escape_html(&block.body);
    if block.lang.is_empty() {
        format!("<pre><code>{body}</code></pre>")
    } else {
        format!(
            "<pre><code class=\"language-{}\">{body}</code></pre>",
            escape_attr(&block.lang)
        )
    }
}

/// Emphasis on already-escaped prose.
fn render_emphasis(escaped: &str) -> String {
    let out = BOLD_ITALIC_RE.replace_all(escaped, "<b><i>$1</i></b>");
    let out = BOLD_RE.replace_all(&out, "<b>$1</b>");
    ITALIC_RE.replace_all(&out, "<i>$1</i>").into_owned()
}

/// Convert lightweight markdown into Telegram-flavoured HTML.
///
/// Code blocks are pulled out before anything else and their bodies escaped
/// on their own, so code is never double-escaped or emphasised.
pub fn to_rich_markup(text: &str) -> String {
    let mut held = Placeholders::for_text(text);

    let text = FENCE_RE.replace_all(text, |caps: &Captures<'_>| {
        held.hold(render_block(&CodeBlock::from_fence(caps)))
    });
    let text = INLINE_CODE_RE.replace_all(&text, |caps: &Captures<'_>| {
        held.hold(format!("<code>{}</code>", escape_html(&caps[1])))
    });
    let text = LINK_RE.replace_all(&text, |caps: &Captures<'_>| {
        let label = render_emphasis(&escape_html(&caps[1]));
        held.hold(format!("<a href=\"{}\">{label}</a>", escape_attr(&caps[2])))
    });

    let prose = render_emphasis(&escape_html(&text));
    held.restore(&prose)
}
