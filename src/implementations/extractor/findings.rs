use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::json::{fenced_blocks, locate_object, LocatedJson};
use super::sections::{list_item, scan_sections};
use crate::models::common::CheckStatus;
use crate::models::findings::{
    render_report, Findings, Issue, MissingInfo, SYNTHESIZED_REPORT_TITLE,
};
use crate::models::record::ExtractedRecord;

pub const FINDINGS: &str = "findings";
pub const REPORT: &str = "human_readable_report";
pub const NARRATIVE_SYNTHESIZED: &str = "narrative_synthesized";
pub const FINDINGS_SYNTHESIZED: &str = "findings_synthesized";

const FINDINGS_KEYS: [&str; 6] = [
    "component_id",
    "component_name",
    "check_status",
    "issues_detected",
    "missing_information",
    "recommendations",
];

/// A report heading only counts at the start of a line, so the
/// `"human_readable_report"` key inside a JSON object never matches.
static REPORT_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t#>*_0-9.)]*HUMAN[- _]?READABLE[- _]?REPORT\**[ \t]*:?\**")
        .expect("report heading pattern is valid")
});

/// Step 3: a findings JSON block and a human-readable report.
///
/// When only one of the two is present the other is synthesized from it,
/// so any record that is not `Unparseable` carries both. Fields the JSON
/// block provides win over the report; fields it lacks are read from the
/// report.
pub fn extract_findings(text: &str) -> ExtractedRecord {
    let (located, narrative) = split_reply(text);

    let parsed = located.as_ref().map(|found| {
        debug!("Step 3 JSON located ({:?})", found.source);
        normalize_findings(unwrap_findings(&found.object))
    });

    match (parsed, narrative) {
        (Some((mut findings, lacking)), Some(narrative)) => {
            if lacking.is_empty() {
                return ExtractedRecord::Structured(record_fields(
                    &findings, narrative, false, false,
                ));
            }
            fill_from_prose(&mut findings, &lacking, &findings_from_prose(&narrative));
            ExtractedRecord::PartiallyStructured {
                fields: record_fields(&findings, narrative, false, false),
                missing: prefixed(&lacking),
            }
        }
        (Some((findings, lacking)), None) => {
            debug!("Step 3 report heading absent, synthesizing narrative from findings");
            let narrative = render_report(&findings);
            let mut missing = prefixed(&lacking);
            missing.push(REPORT.to_string());
            ExtractedRecord::PartiallyStructured {
                fields: record_fields(&findings, narrative, true, false),
                missing,
            }
        }
        (None, Some(narrative)) => {
            debug!("Step 3 findings JSON unusable, reading findings from the report");
            let findings = findings_from_prose(&narrative);
            ExtractedRecord::PartiallyStructured {
                fields: record_fields(&findings, narrative, false, true),
                missing: vec![FINDINGS.to_string()],
            }
        }
        (None, None) => ExtractedRecord::Unparseable(text.to_string()),
    }
}

/// Locate the JSON block and the report independently.
///
/// A single object carrying both the findings and a `human_readable_report`
/// string is taken as is. Otherwise the report heading bounds the JSON
/// search so that an unterminated JSON string cannot swallow the report.
fn split_reply(text: &str) -> (Option<LocatedJson>, Option<String>) {
    if let Some(found) = locate_object(text, carries_report) {
        let narrative = found
            .object
            .get(REPORT)
            .and_then(Value::as_str)
            .map(clean_narrative)
            .and_then(non_empty);
        return (Some(found), narrative);
    }

    let Some((heading_start, body_start)) = report_heading(text) else {
        let located = locate_object(text, looks_like_findings);
        let narrative = if located.is_none() && has_prose_markers(text) {
            non_empty(clean_narrative(&strip_fences(text)))
        } else {
            None
        };
        return (located, narrative);
    };

    if let Some(found) = locate_object(&text[..heading_start], looks_like_findings) {
        return (Some(found), non_empty(clean_narrative(&text[body_start..])));
    }

    let after = &text[body_start..];
    let located = locate_object(after, looks_like_findings);
    let narrative_end = located
        .as_ref()
        .map(|found| found.span.start)
        .unwrap_or(after.len());
    (located, non_empty(clean_narrative(&after[..narrative_end])))
}

/// (heading start, body start) of the report
fn report_heading(text: &str) -> Option<(usize, usize)> {
    if let Some(m) = REPORT_HEADING.find(text) {
        return Some((m.start(), m.end()));
    }
    text.find(SYNTHESIZED_REPORT_TITLE).map(|i| (i, i))
}

fn non_empty(narrative: String) -> Option<String> {
    if narrative.is_empty() {
        None
    } else {
        Some(narrative)
    }
}

fn prefixed(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| format!("{}.{}", FINDINGS, k)).collect()
}

/// Replace the lacking keys with what the report states. A report that
/// states nothing for a key leaves the JSON value in place.
fn fill_from_prose(findings: &mut Findings, lacking: &[&str], prose: &Findings) {
    for key in lacking {
        match *key {
            "component_id" if !prose.component_id.is_empty() => {
                findings.component_id = prose.component_id.clone()
            }
            "component_name" if !prose.component_name.is_empty() => {
                findings.component_name = prose.component_name.clone()
            }
            "check_status" => findings.check_status = prose.check_status,
            "issues_detected" if !prose.issues_detected.is_empty() => {
                findings.issues_detected = prose.issues_detected.clone()
            }
            "missing_information" if !prose.missing_information.is_empty() => {
                findings.missing_information = prose.missing_information.clone()
            }
            "recommendations" if !prose.recommendations.is_empty() => {
                findings.recommendations = prose.recommendations.clone()
            }
            _ => {}
        }
    }
}

fn record_fields(
    findings: &Findings,
    narrative: String,
    narrative_synthesized: bool,
    findings_synthesized: bool,
) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(
        FINDINGS.to_string(),
        serde_json::to_value(findings).unwrap_or(Value::Null),
    );
    fields.insert(REPORT.to_string(), Value::String(narrative));
    fields.insert(
        NARRATIVE_SYNTHESIZED.to_string(),
        Value::Bool(narrative_synthesized),
    );
    fields.insert(
        FINDINGS_SYNTHESIZED.to_string(),
        Value::Bool(findings_synthesized),
    );
    fields
}

fn looks_like_findings(object: &Map<String, Value>) -> bool {
    let candidate = unwrap_findings(object);
    ["check_status", "issues_detected", "missing_information"]
        .iter()
        .any(|k| candidate.contains_key(*k))
}

/// Findings plus a non-empty report string in one object
fn carries_report(object: &Map<String, Value>) -> bool {
    looks_like_findings(object)
        && object
            .get(REPORT)
            .and_then(Value::as_str)
            .is_some_and(|report| !report.trim().is_empty())
}

/// Accept `{"json_output": {...}}` and `{"findings": {...}}` wrappers
fn unwrap_findings(object: &Map<String, Value>) -> &Map<String, Value> {
    for key in ["json_output", "findings", "structured_json_output"] {
        if let Some(Value::Object(inner)) = object.get(key) {
            return inner;
        }
    }
    object
}

/// Coerce a findings object into the contract shape. Also returns the
/// contract keys the object did not provide in the documented form.
fn normalize_findings(object: &Map<String, Value>) -> (Findings, Vec<&'static str>) {
    let mut lacking: Vec<&'static str> = FINDINGS_KEYS
        .iter()
        .copied()
        .filter(|k| !object.contains_key(*k))
        .collect();

    let issues_detected: Vec<Issue> = entries(object, "issues_detected", &mut lacking)
        .iter()
        .map(|entry| entry_parts(entry, &["category"]))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_else(|| {
            mark(&mut lacking, "issues_detected");
            salvage(object, "issues_detected", &["category"])
        })
        .into_iter()
        .map(|(label, description, action)| Issue {
            category: label.unwrap_or_else(|| "General".to_string()),
            description,
            action,
        })
        .collect();

    let missing_information: Vec<MissingInfo> =
        entries(object, "missing_information", &mut lacking)
            .iter()
            .map(|entry| entry_parts(entry, &["field"]))
            .collect::<Option<Vec<_>>>()
            .unwrap_or_else(|| {
                mark(&mut lacking, "missing_information");
                salvage(object, "missing_information", &["field"])
            })
            .into_iter()
            .map(|(label, description, action)| MissingInfo {
                field: label.unwrap_or_else(|| "general".to_string()),
                description,
                action,
            })
            .collect();

    let mut recommendations: Vec<String> = Vec::new();
    for entry in entries(object, "recommendations", &mut lacking) {
        match recommendation(&entry) {
            Some(text) if !text.is_empty() => recommendations.push(text),
            Some(_) => {}
            None => mark(&mut lacking, "recommendations"),
        }
    }

    let reported = object
        .get("check_status")
        .and_then(Value::as_str)
        .and_then(CheckStatus::parse);
    if reported.is_none() && object.contains_key("check_status") {
        mark(&mut lacking, "check_status");
    }
    let check_status = reported.unwrap_or_else(|| Findings::derive_status(&issues_detected, None));

    let findings = Findings {
        component_id: text_field(object, "component_id", &mut lacking),
        component_name: text_field(object, "component_name", &mut lacking),
        check_status,
        issues_detected,
        missing_information,
        recommendations,
    };
    (findings, lacking)
}

fn mark(lacking: &mut Vec<&'static str>, key: &'static str) {
    if !lacking.contains(&key) {
        lacking.push(key);
    }
}

/// Entries of a contract list. A bare string stands for a single entry; any
/// shape other than an array marks the key as lacking.
fn entries(
    object: &Map<String, Value>,
    key: &'static str,
    lacking: &mut Vec<&'static str>,
) -> Vec<Value> {
    match object.get(key) {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => {
            mark(lacking, key);
            if s.trim().is_empty() {
                Vec::new()
            } else {
                vec![Value::String(s.clone())]
            }
        }
        Some(_) => {
            mark(lacking, key);
            Vec::new()
        }
    }
}

/// The usable entries of a list with at least one malformed entry
fn salvage(
    object: &Map<String, Value>,
    key: &str,
    label_keys: &[&str],
) -> Vec<(Option<String>, String, String)> {
    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|entry| entry_parts(entry, label_keys))
            .collect(),
        _ => Vec::new(),
    }
}

fn recommendation(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(obj) => ["recommendation", "description", "action"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}

/// A contract string. Numbers are kept as text but still mark the key.
fn text_field(
    object: &Map<String, Value>,
    key: &'static str,
    lacking: &mut Vec<&'static str>,
) -> String {
    match object.get(key) {
        None => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => {
            mark(lacking, key);
            n.to_string()
        }
        Some(_) => {
            mark(lacking, key);
            String::new()
        }
    }
}

/// (label, description, action) from an object entry or a bare string
fn entry_parts(entry: &Value, label_keys: &[&str]) -> Option<(Option<String>, String, String)> {
    match entry {
        Value::String(s) if !s.trim().is_empty() => {
            Some((None, s.trim().to_string(), String::new()))
        }
        Value::Object(obj) => {
            let text = |key: &str| {
                obj.get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            let label = label_keys.iter().find_map(|k| text(k));
            let description = text("description")
                .or_else(|| text("issue"))
                .or_else(|| label.clone())?;
            let action = text("action").unwrap_or_default();
            Some((label, description, action))
        }
        _ => None,
    }
}

fn has_prose_markers(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim().trim_matches('*').trim().to_lowercase();
        line.starts_with("status:") || line.starts_with("component id:")
    })
}

fn strip_fences(text: &str) -> String {
    let mut out = String::new();
    let mut cursor = 0;
    for block in fenced_blocks(text) {
        out.push_str(&text[cursor..block.span.start]);
        cursor = block.span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn clean_narrative(segment: &str) -> String {
    strip_fences(segment)
        .trim()
        .trim_start_matches(|c: char| c == '*' || c == ':')
        .trim_end_matches(|c: char| c == '-' || c.is_whitespace())
        .trim()
        .to_string()
}

const PROSE_HEADINGS: [&str; 9] = [
    "ISSUES DETECTED",
    "ISSUES",
    "MISSING INFORMATION",
    "RECOMMENDATIONS",
    "SUMMARY",
    "EXECUTIVE SUMMARY",
    "CONCLUSION",
    "COMPONENT",
    "STATUS",
];

/// Best-effort findings from a prose report
pub fn findings_from_prose(narrative: &str) -> Findings {
    let mut component_id = String::new();
    let mut component_name = String::new();
    let mut reported: Option<CheckStatus> = None;

    for line in narrative.lines() {
        let line = line
            .trim()
            .trim_start_matches(|c: char| c == '*' || c == '-' || c.is_whitespace());
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim().trim_matches('*').trim().to_lowercase();
        let value = value.trim().trim_matches('*').trim();
        match label.as_str() {
            "component id" if component_id.is_empty() => {
                component_id = value.to_string();
            }
            "component" | "component name" if component_name.is_empty() => {
                component_name = value.to_string();
            }
            "status" | "check status" | "overall status" if reported.is_none() => {
                reported = value
                    .split_whitespace()
                    .next()
                    .and_then(|w| CheckStatus::parse(w.trim_matches('*')));
            }
            _ => {}
        }
    }

    let sections = scan_sections(narrative, &PROSE_HEADINGS);
    let section = |names: &[usize]| {
        names
            .iter()
            .find_map(|i| sections.get(i))
            .cloned()
            .unwrap_or_default()
    };

    let issues_detected: Vec<Issue> = parse_entries(&section(&[0, 1]))
        .into_iter()
        .map(|e| Issue {
            category: e.label.unwrap_or_else(|| "General".to_string()),
            description: e.description,
            action: e.action,
        })
        .collect();

    let missing_information: Vec<MissingInfo> = parse_entries(&section(&[2]))
        .into_iter()
        .map(|e| MissingInfo {
            field: e.label.unwrap_or_else(|| "general".to_string()),
            description: e.description,
            action: e.action,
        })
        .collect();

    let recommendations: Vec<String> = parse_entries(&section(&[3]))
        .into_iter()
        .map(|e| {
            match e.label {
                Some(label) if label != e.description => format!("{}: {}", label, e.description),
                _ => e.description,
            }
        })
        .collect();

    let check_status = match reported {
        Some(status) => status,
        None => Findings::derive_status(&issues_detected, None),
    };

    Findings {
        component_id,
        component_name,
        check_status,
        issues_detected,
        missing_information,
        recommendations,
    }
}

#[derive(Debug, Default)]
struct Entry {
    label: Option<String>,
    description: String,
    action: String,
}

/// Numbered or bulleted entries; follow-up `Action:` / `Issue:` lines attach
/// to the entry above them.
fn parse_entries(body: &str) -> Vec<Entry> {
    let mut entries: Vec<Entry> = Vec::new();

    for raw in body.lines() {
        let item = list_item(raw).unwrap_or(raw.trim());
        let item = item.trim().trim_matches('*').trim();
        if item.is_empty() {
            continue;
        }

        let lower = item.to_lowercase();
        let detail = |prefixes: &[&str]| {
            prefixes.iter().find_map(|p| {
                if !lower.starts_with(p) {
                    return None;
                }
                let rest =
                    item[p.len()..].trim_start_matches(|c: char| c == '*' || c.is_whitespace());
                rest.strip_prefix(':').map(|r| r.trim_start_matches('*').trim().to_string())
            })
        };

        if let Some(action) = detail(&["required action", "action"]) {
            if let Some(last) = entries.last_mut() {
                last.action = action;
            }
            continue;
        }
        if let Some(description) = detail(&["issue", "missing", "description"]) {
            if let Some(last) = entries.last_mut() {
                last.description = description;
                continue;
            }
        }
        if list_item(raw).is_none() {
            continue;
        }

        entries.push(split_label(item));
    }

    entries.retain(|e| !e.description.is_empty());
    entries
}

fn split_label(item: &str) -> Entry {
    if let Some(rest) = item.strip_prefix('[') {
        if let Some((label, description)) = rest.split_once(']') {
            return Entry {
                label: Some(label.trim().to_string()),
                description: description.trim().to_string(),
                action: String::new(),
            };
        }
    }
    if let Some((label, description)) = item.split_once(": ") {
        let label = label.trim().trim_matches('*').trim();
        if !label.is_empty() && label.chars().count() <= 40 {
            return Entry {
                label: Some(label.to_string()),
                description: description.trim().to_string(),
                action: String::new(),
            };
        }
    }
    Entry {
        label: None,
        description: item.to_string(),
        action: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::findings::render_report;
    use serde_json::json;

    const JSON_BLOCK: &str =
        r#"```json
{"component_id": "IMG-7", "component_name": "Banner", "check_status": "FAILED",
 "issues_detected": [{"category": "Metadata", "description": "Usage rights absent", "action": "Add rights"}],
 "missing_information": [{"field": "usage_rights", "description": "No rights metadata", "action": "Supply rights"}],
 "recommendations": ["Add usage rights"]}
```"#;

    #[test]
    fn json_and_report_is_structured() {
        let text = format!("{}\n\nHUMAN-READABLE REPORT:\nThe banner failed review.", JSON_BLOCK);
        let record = extract_findings(&text);
        assert!(record.is_structured());
        let fields = record.fields().unwrap();
        assert_eq!(fields[REPORT], "The banner failed review.");
        assert_eq!(fields[FINDINGS]["issues_detected"][0]["category"], "Metadata");
        assert_eq!(fields[NARRATIVE_SYNTHESIZED], false);
    }

    #[test]
    fn missing_report_is_synthesized() {
        let record = extract_findings(JSON_BLOCK);
        assert_eq!(record.missing(), &[REPORT.to_string()]);
        let fields = record.fields().unwrap();
        assert!(fields[REPORT].as_str().unwrap().starts_with(SYNTHESIZED_REPORT_TITLE));
        assert_eq!(fields[NARRATIVE_SYNTHESIZED], true);
    }

    #[test]
    fn broken_json_is_repaired() {
        let text =
            "```json\n{\"component_id\": \"IMG-7\", \"check_status\": \"PASSED\", \"issues_detected\": [], \"missing_information\": [],\n\"recommendations\": [\"Keep going\",\n```\nHUMAN-READABLE REPORT:\nAll good.";
        let record = extract_findings(text);
        let fields = record.fields().unwrap();
        assert_eq!(fields[FINDINGS]["component_id"], "IMG-7");
        assert_eq!(fields[FINDINGS]["recommendations"][0], "Keep going");
        assert_eq!(fields[REPORT], "All good.");
        assert_eq!(fields[FINDINGS_SYNTHESIZED], false);
    }

    #[test]
    fn report_fills_what_broken_json_lacks() {
        let text =
            "```json\n{\"component_id\": \"IMG-9\", \"check_status\": \"FAI\nHUMAN-READABLE REPORT:\nComponent: Poster\nComponent ID: IMG-9\nStatus: FAILED\n\nIssues Detected: 1\n1. [Visual Quality] Image is blurred\n   Action: Reshoot\n\nMissing Information: 1\n1. [usage_rights] Rights metadata not provided\n\nRecommendations:\n1. Provide usage rights";
        let record = extract_findings(text);
        assert!(!record.is_structured());
        let fields = record.fields().unwrap();
        let findings: Findings = serde_json::from_value(fields[FINDINGS].clone()).unwrap();
        assert_eq!(findings.component_id, "IMG-9");
        assert_eq!(findings.component_name, "Poster");
        assert_eq!(findings.check_status, CheckStatus::Failed);
        assert_eq!(findings.issues_detected.len(), 1);
        assert_eq!(findings.issues_detected[0].action, "Reshoot");
        assert_eq!(findings.missing_information[0].field, "usage_rights");
        assert!(fields[REPORT].as_str().unwrap().starts_with("Component: Poster"));
    }

    #[test]
    fn prose_without_json_yields_findings() {
        let text = "HUMAN-READABLE REPORT:\nComponent ID: IMG-3\nStatus: PASSED\n\nRecommendations:\n- Keep the current crop";
        let record = extract_findings(text);
        assert_eq!(record.missing(), &[FINDINGS.to_string()]);
        let fields = record.fields().unwrap();
        assert_eq!(fields[FINDINGS_SYNTHESIZED], true);
        assert_eq!(fields[FINDINGS]["component_id"], "IMG-3");
        assert_eq!(fields[FINDINGS]["recommendations"][0], "Keep the current crop");
    }

    #[test]
    fn rendered_report_parses_back() {
        let findings = Findings {
            component_id: "IMG-1".into(),
            component_name: "Hero".into(),
            check_status: CheckStatus::Failed,
            issues_detected: vec![Issue {
                category: "Visual Quality".into(),
                description: "Image is blurred".into(),
                action: "Reshoot".into(),
            }],
            missing_information: vec![MissingInfo {
                field: "usage_rights".into(),
                description: "Rights metadata not provided".into(),
                action: String::new(),
            }],
            recommendations: vec!["Provide usage rights".into()],
        };
        let parsed = findings_from_prose(&render_report(&findings));
        assert_eq!(parsed, findings);
    }

    #[test]
    fn combined_object_report_is_read_from_its_key() {
        let text = "```json\n{\"json_output\": {\"component_id\": \"IMG-4\", \"component_name\": \"Hero\", \"check_status\": \"PASSED\", \"issues_detected\": [], \"missing_information\": [], \"recommendations\": []}, \"human_readable_report\": \"The hero image passed all checks.\\nNo action needed.\"}\n```";
        let record = extract_findings(text);
        assert!(record.is_structured());
        let fields = record.fields().unwrap();
        assert_eq!(
            fields[REPORT],
            "The hero image passed all checks.\nNo action needed."
        );
        assert_eq!(fields[FINDINGS]["component_id"], "IMG-4");
        assert_eq!(fields[FINDINGS]["check_status"], "PASSED");
        assert_eq!(fields[NARRATIVE_SYNTHESIZED], false);
    }

    #[test]
    fn report_key_is_not_a_heading() {
        let text = "{\n  \"check_status\": \"PASSED\",\n  \"issues_detected\": [],\n  \"human_readable_report\": \"\"\n}";
        let record = extract_findings(text);
        let fields = record.fields().unwrap();
        assert!(fields[REPORT]
            .as_str()
            .unwrap()
            .starts_with(SYNTHESIZED_REPORT_TITLE));
        assert_eq!(fields[NARRATIVE_SYNTHESIZED], true);
    }

    #[test]
    fn bare_string_issue_is_kept() {
        let text = r#"{"component_id": "IMG-5", "component_name": "Card", "check_status": "FAILED",
 "issues_detected": "Usage rights are missing", "missing_information": [], "recommendations": []}
HUMAN-READABLE REPORT:
The card cannot be published yet."#;
        let record = extract_findings(text);
        assert!(!record.is_structured());
        assert!(record
            .missing()
            .contains(&"findings.issues_detected".to_string()));
        let findings: Findings =
            serde_json::from_value(record.fields().unwrap()[FINDINGS].clone()).unwrap();
        assert_eq!(findings.check_status, CheckStatus::Failed);
        assert_eq!(findings.issues_detected.len(), 1);
        assert_eq!(
            findings.issues_detected[0].description,
            "Usage rights are missing"
        );
    }

    #[test]
    fn wrong_typed_keys_are_reported_missing() {
        let cases = [
            ("component_id", json!({"id": "IMG-7"})),
            ("component_name", json!(["Banner"])),
            ("check_status", json!(true)),
            ("issues_detected", json!([42])),
            ("missing_information", json!({"field": "usage_rights"})),
            ("recommendations", json!(7)),
        ];
        for (key, value) in cases {
            let mut object = json!({
                "component_id": "IMG-7",
                "component_name": "Banner",
                "check_status": "FAILED",
                "issues_detected": [{"category": "Metadata", "description": "Usage rights absent", "action": "Add rights"}],
                "missing_information": [],
                "recommendations": ["Add usage rights"]
            });
            object[key] = value;
            let text = format!("{}\nHUMAN-READABLE REPORT:\nThe banner failed review.", object);

            let record = extract_findings(&text);

            assert!(!record.is_structured(), "{} was accepted", key);
            assert!(
                record.missing().contains(&format!("findings.{}", key)),
                "{} not reported: {:?}",
                key,
                record.missing()
            );
        }
    }

    #[test]
    fn numbered_heading_is_found() {
        let text = format!(
            "{}\n\n2. **HUMAN-READABLE REPORT:**\nThe banner failed review.",
            JSON_BLOCK
        );
        let record = extract_findings(&text);
        assert!(record.is_structured());
        assert_eq!(record.fields().unwrap()[REPORT], "The banner failed review.");
    }

    #[test]
    fn nothing_usable_is_unparseable() {
        assert!(extract_findings("Sorry, I cannot help with that.").is_unparseable());
    }

    #[test]
    fn extraction_is_repeatable() {
        let text = format!("{}\nsome trailing words", JSON_BLOCK);
        assert_eq!(extract_findings(&text), extract_findings(&text));
    }
}
