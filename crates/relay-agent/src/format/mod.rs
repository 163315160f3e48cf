//! Pure text transforms between model output and chat delivery.
//!
//! - [`to_rich_markup`]: markdown to Telegram HTML
//! - [`to_plain_text`]: strip markers for the plain-text fallback
//! - [`sanitize_for_storage`]: normalised form kept in conversation context
//! - [`split_for_delivery`]: chunk to the per-message limit

mod blocks;
mod plain;
mod rich;
mod split;

pub use plain::{sanitize_for_storage, to_plain_text};
pub use rich::to_rich_markup;
pub use split::split_for_delivery;

#[cfg(test)]
mod tests {
    use super::*;

    fn code_bodies(text: &str) -> Vec<String> {
        blocks::FENCE_RE
            .captures_iter(text)
            .map(|c| c.get(2).map_or("", |m| m.as_str()).to_string())
            .collect()
    }

    #[test]
    fn plain_of_rich_preserves_code_bodies() {
        let samples = [
            "Try this:\n```rust\nfn main() {\n    println!(\"<&>\");\n}\n```\nThen **run** it.",
            "```\nno *lang* here\n```",
            "two blocks\n```py\na = 1\n```\nand\n```sh\necho \"$HOME\" && ls\n```",
            "```\nlet s = \"\u{E000}0\u{E001}\";\n```\n**\u{E000}**",
        ];
        for sample in samples {
            let round = to_plain_text(&to_rich_markup(sample));
            assert_eq!(code_bodies(&round), code_bodies(sample), "sample {sample:?}");
        }
    }

    #[test]
    fn split_of_rich_reply_keeps_pre_blocks_whole() {
        let code: String = (0..200).map(|i| format!("let v{i} = {i};\n")).collect();
        let reply = format!("Here you go:\n```rust\n{code}```\n**Done**");
        let rich = to_rich_markup(&reply);
        let chunks = split_for_delivery(&rich, 4096);
        for chunk in &chunks {
            assert_eq!(chunk.matches("<pre>").count(), chunk.matches("</pre>").count());
        }
        assert!(chunks.iter().all(|c| c.chars().count() <= 4096));
    }

    #[test]
    fn truncated_rich_reply_with_open_fence_still_fits() {
        let code: String = (0..600).map(|i| format!("value_{i} = compute({i})\n")).collect();
        let reply = format!("Sure:\n```python\n{code}");
        let chunks = split_for_delivery(&to_rich_markup(&reply), 4096);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4096));
    }
}
