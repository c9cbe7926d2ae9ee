use std::ops::Range;

use serde::Deserialize;
use serde_json::{Map, Value};

/// How a JSON object was obtained from the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonSource {
    /// Parsed as-is from a fenced code block
    Fenced,
    /// Parsed as-is from bare text
    Inline,
    /// Parsed only after structural repair
    Repaired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocatedJson {
    pub object: Map<String, Value>,
    pub source: JsonSource,
    /// Byte range of the reply the object was read from
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    pub lang: Option<&'a str>,
    pub body: &'a str,
    /// Byte range of the block including its fences
    pub span: Range<usize>,
    /// Offset of `body` within the reply
    pub body_start: usize,
}

/// Markdown code fences in order of appearance. An unterminated fence runs to
/// the end of the text.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find("```") {
        let open = cursor + rel;
        let after_ticks = open + 3;
        let line_end = text[after_ticks..]
            .find('\n')
            .map(|i| after_ticks + i)
            .unwrap_or(text.len());
        let lang = text[after_ticks..line_end].trim();
        let body_start = (line_end + 1).min(text.len());

        let (body_end, block_end) = match text[body_start..].find("```") {
            Some(i) => (body_start + i, body_start + i + 3),
            None => (text.len(), text.len()),
        };

        blocks.push(FencedBlock {
            lang: if lang.is_empty() { None } else { Some(lang) },
            body: &text[body_start..body_end],
            span: open..block_end,
            body_start,
        });
        cursor = block_end;
        if cursor >= text.len() {
            break;
        }
    }
    blocks
}

/// Find the first JSON object in `text` accepted by `accept`.
///
/// Stages, in order: fenced blocks parsed strictly, bare objects parsed
/// strictly, fenced blocks after repair, bare text after repair.
pub fn locate_object<F>(text: &str, accept: F) -> Option<LocatedJson>
where
    F: Fn(&Map<String, Value>) -> bool,
{
    let blocks: Vec<FencedBlock<'_>> = fenced_blocks(text)
        .into_iter()
        .filter(|b| matches!(b.lang, None | Some("json") | Some("JSON")))
        .collect();

    for block in &blocks {
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(block.body.trim()) {
            if accept(&object) {
                return Some(LocatedJson {
                    object,
                    source: JsonSource::Fenced,
                    span: block.span.clone(),
                });
            }
        }
    }

    if let Some(found) = scan_inline(text, &accept) {
        return Some(found);
    }

    for block in &blocks {
        if let Some((object, _)) = parse_repaired(block.body, &accept) {
            return Some(LocatedJson {
                object,
                source: JsonSource::Repaired,
                span: block.span.clone(),
            });
        }
    }

    for (idx, ch) in text.char_indices() {
        if ch != '{' {
            continue;
        }
        if let Some((object, consumed)) = parse_repaired(&text[idx..], &accept) {
            return Some(LocatedJson {
                object,
                source: JsonSource::Repaired,
                span: idx..idx + consumed,
            });
        }
    }
    None
}

fn scan_inline<F>(text: &str, accept: &F) -> Option<LocatedJson>
where
    F: Fn(&Map<String, Value>) -> bool,
{
    for (idx, ch) in text.char_indices() {
        if ch != '{' {
            continue;
        }
        let slice = &text[idx..];
        let mut deserializer = serde_json::Deserializer::from_str(slice);
        if let Ok(Value::Object(object)) = Value::deserialize(&mut deserializer) {
            if accept(&object) {
                let consumed = object_len(slice).unwrap_or(slice.len());
                return Some(LocatedJson {
                    object,
                    source: JsonSource::Inline,
                    span: idx..idx + consumed,
                });
            }
        }
    }
    None
}

/// Byte length of the balanced object starting at the beginning of `text`
fn object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
            }
            '{' | '[' => {
                depth += 1;
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_repaired<F>(segment: &str, accept: &F) -> Option<(Map<String, Value>, usize)>
where
    F: Fn(&Map<String, Value>) -> bool,
{
    let repaired = repair_json(segment)?;
    match serde_json::from_str::<Value>(&repaired.text) {
        Ok(Value::Object(object)) if accept(&object) => Some((object, repaired.consumed)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub text: String,
    /// Bytes of the input, counted from its start, that were used
    pub consumed: usize,
}

/// Best-effort structural repair of a truncated or sloppy JSON object.
///
/// Drops anything after the outermost object closes, removes trailing
/// commas and stray closers, escapes raw control characters inside strings
/// and closes unterminated strings and brackets.
pub fn repair_json(segment: &str) -> Option<Repaired> {
    let start = segment.find('{')?;
    let mut out = String::with_capacity(segment.len() - start + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut consumed = segment.len();

    for (offset, ch) in segment[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
            } else if ch == '\\' {
                escaped = true;
                out.push(ch);
            } else if ch == '"' {
                in_string = false;
                out.push(ch);
            } else if ch == '\n' {
                out.push_str("\\n");
            } else if ch == '\t' {
                out.push_str("\\t");
            } else if ch != '\r' {
                out.push(ch);
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '{' => {
                stack.push('}');
                out.push(ch);
            }
            '[' => {
                stack.push(']');
                out.push(ch);
            }
            '}' | ']' => {
                if stack.last() == Some(&ch) {
                    strip_trailing_comma(&mut out);
                    stack.pop();
                    out.push(ch);
                    if stack.is_empty() {
                        consumed = start + offset + ch.len_utf8();
                        break;
                    }
                }
            }
            _ => out.push(ch),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }

    if !stack.is_empty() {
        strip_trailing_comma(&mut out);
        if out.ends_with(':') {
            out.push_str(" null");
        }
        while let Some(closer) = stack.pop() {
            strip_trailing_comma(&mut out);
            out.push(closer);
        }
    }

    Some(Repaired { text: out, consumed })
}

fn strip_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(',') {
        out.pop();
        let trimmed_len = out.trim_end().len();
        out.truncate(trimmed_len);
    }
}
