//! Chunking for transport size limits.

use super::blocks::{FENCE_RE, PRE_RE};

/// One packing unit: a prose line, or a whole code block (several lines).
struct Unit {
    text: String,
    is_block: bool,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte ranges of complete fenced and `<pre>` blocks, sorted. Spans that
/// overlap or share a line are merged. An opening fence without a closing one
/// is not a block.
fn block_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = FENCE_RE
        .find_iter(text)
        .chain(PRE_RE.find_iter(text))
        .map(|m| (m.start(), m.end()))
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start < last.1 || !text[last.1..start].contains('\n') => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Group lines so that every line touched by one block forms a single unit.
fn units(text: &str) -> Vec<Unit> {
    let spans = block_spans(text);
    let mut out = Vec::new();
    let mut open: Option<(usize, String)> = None;
    let mut next_span = 0;
    let mut line_start = 0;

    for line in text.split('\n') {
        let line_end = line_start + line.len();
        while spans.get(next_span).is_some_and(|&(_, end)| end <= line_start) {
            next_span += 1;
        }
        let span = spans
            .get(next_span)
            .filter(|&&(start, end)| line_start < end && start <= line_end)
            .map(|_| next_span);

        let continues = matches!((&open, span), (Some((id, _)), Some(current)) if *id == current);
        if continues {
            if let Some((_, block)) = open.as_mut() {
                block.push('\n');
                block.push_str(line);
            }
        } else {
            if let Some((_, block)) = open.take() {
                out.push(Unit {
                    text: block,
                    is_block: true,
                });
            }
            match span {
                Some(id) => open = Some((id, line.to_string())),
                None => out.push(Unit {
                    text: line.to_string(),
                    is_block: false,
                }),
            }
        }
        line_start = line_end + 1;
    }
    if let Some((_, block)) = open {
        out.push(Unit {
            text: block,
            is_block: true,
        });
    }
    out
}

/// Cut an overlong prose line at whitespace, or hard at `max` when a piece
/// has none.
fn hard_split(line: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = line;
    while char_len(rest) > max {
        let limit = rest
            .char_indices()
            .nth(max)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        pieces.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

/// Split `text` into chunks of at most `max` characters on line boundaries.
///
/// Complete code blocks are never split. A block longer than `max` is emitted
/// as its own oversized chunk. An unterminated fence is packed like prose.
/// Chunks are trimmed and empty chunks dropped.
pub fn split_for_delivery(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for unit in units(text) {
        let cost = if current.is_empty() {
            char_len(&unit.text)
        } else {
            char_len(&current) + 1 + char_len(&unit.text)
        };
        if cost <= max {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&unit.text);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if char_len(&unit.text) <= max {
            current = unit.text;
        } else if unit.is_block {
            chunks.push(unit.text);
        } else {
            let mut pieces = hard_split(&unit.text, max);
            current = pieces.pop().unwrap_or_default();
            chunks.extend(pieces);
        }
    }
    chunks.push(current);

    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
