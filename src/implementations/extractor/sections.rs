use std::collections::BTreeMap;

/// Split `text` into sections introduced by one of `headings`.
///
/// A heading line may carry markdown emphasis, `#` markers and numbering
/// ("2. JOB AID ASSESSMENT:"), and text after its colon starts the body.
/// Matching ignores case and treats `-`/`_` as spaces. The first occurrence
/// of a heading wins; the result is keyed by the index into `headings`.
pub fn scan_sections(text: &str, headings: &[&str]) -> BTreeMap<usize, String> {
    let normalized: Vec<String> = headings
        .iter()
        .map(|h| normalize(h))
        .collect();
    let mut sections: BTreeMap<usize, String> = BTreeMap::new();
    let mut current: Option<(usize, Vec<String>)> = None;

    for line in text.lines() {
        if let Some((index, rest)) = match_heading(line, &normalized) {
            if let Some((idx, body)) = current.take() {
                sections.entry(idx).or_insert_with(|| body.join("\n").trim().to_string());
            }
            let mut body = Vec::new();
            if !rest.is_empty() {
                body.push(rest);
            }
            current = Some((index, body));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line.to_string());
        }
    }
    if let Some((idx, body)) = current.take() {
        sections.entry(idx).or_insert_with(|| body.join("\n").trim().to_string());
    }

    sections.retain(|_, body| !body.is_empty());
    sections
}

fn match_heading(line: &str, headings: &[String]) -> Option<(usize, String)> {
    let stripped = strip_decoration(line);
    if stripped.is_empty() {
        return None;
    }

    let (head, rest) = match stripped.find(':') {
        Some(i) => (&stripped[..i], stripped[i + 1..].trim()),
        None => (stripped, ""),
    };
    let head = normalize(head.trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace()));
    let rest = rest.trim_matches(|c: char| c == '*' || c.is_whitespace()).to_string();

    headings
        .iter()
        .position(|h| *h == head)
        .map(|i| (i, rest))
}

/// Remove markdown heading markers, emphasis and leading numbering
fn strip_decoration(line: &str) -> &str {
    let mut s = line.trim().trim_start_matches('#').trim();
    s = s.trim_start_matches(|c: char| c == '*' || c == '_').trim_start();

    let digits = s
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, c)| i + c.len_utf8());
    if let Some(end) = digits {
        let after = &s[end..];
        if after.starts_with('.') || after.starts_with(')') {
            s = after[1..].trim_start();
        }
    }
    s.trim_start_matches(|c: char| c == '*' || c == '_').trim()
}

fn normalize(heading: &str) -> String {
    heading
        .to_uppercase()
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A bulleted or numbered list item, with its marker removed
pub fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    for marker in ["- ", "* ", "• ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }

    let digits_end = trimmed
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)?;
    if digits_end == 0 {
        return None;
    }
    let after = &trimmed[digits_end..];
    if after.starts_with(". ") || after.starts_with(") ") {
        Some(after[2..].trim())
    } else {
        None
    }
}

/// List items in `body`. With `loose`, a body without any list markers
/// yields its non-empty lines instead.
pub fn list_items(body: &str, loose: bool) -> Vec<String> {
    let items: Vec<String> = body
        .lines()
        .filter_map(list_item)
        .map(|s| s.trim_matches('*').trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() && loose {
        return body
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect();
    }
    items
}

/// Lower-case snake_case key for a free-text label
pub fn snake_key(label: &str) -> String {
    label
        .trim()
        .trim_matches('*')
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
