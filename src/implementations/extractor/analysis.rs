use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use super::json::locate_object;
use super::sections::{list_item, list_items, scan_sections, snake_key};
use crate::models::common::ItemStatus;
use crate::models::record::ExtractedRecord;

pub const NOTES: &str = "notes";
pub const JOB_AID_ASSESSMENT: &str = "job_aid_assessment";
pub const HUMAN_READABLE_SECTION: &str = "human_readable_section";
pub const NEXT_STEPS: &str = "next_steps";

pub const ANALYSIS_FIELDS: [&str; 4] =
    [NOTES, JOB_AID_ASSESSMENT, HUMAN_READABLE_SECTION, NEXT_STEPS];

const HEADINGS: [&str; 4] = ["NOTES", "JOB AID ASSESSMENT", "HUMAN-READABLE SECTION", "NEXT STEPS"];

/// Step 1: JSON document first, labelled sections for whatever it lacks
pub fn extract_analysis(text: &str) -> ExtractedRecord {
    let mut fields = Map::new();

    if let Some(found) = locate_object(text, |m| {
        ANALYSIS_FIELDS.iter().any(|f| m.contains_key(*f))
    }) {
        debug!("Step 1 JSON located ({:?})", found.source);
        for name in ANALYSIS_FIELDS {
            if let Some(value) = found.object.get(name).and_then(|v| conform(name, v)) {
                fields.insert(name.to_string(), value);
            }
        }
    }

    if fields.len() < ANALYSIS_FIELDS.len() {
        let sections = scan_sections(text, &HEADINGS);
        for (index, body) in sections {
            let name = ANALYSIS_FIELDS[index];
            if fields.contains_key(name) {
                continue;
            }
            if let Some(value) = section_value(name, &body) {
                debug!("Step 1 field '{}' taken from heading section", name);
                fields.insert(name.to_string(), value);
            }
        }
    }

    if fields.is_empty() {
        return ExtractedRecord::Unparseable(text.to_string());
    }

    let missing: Vec<String> = ANALYSIS_FIELDS.iter()
        .filter(|f| !fields.contains_key(**f))
        .map(|f| f.to_string())
        .collect();

    if missing.is_empty() {
        ExtractedRecord::Structured(fields)
    } else {
        ExtractedRecord::PartiallyStructured { fields, missing }
    }
}

/// Keep a JSON field only if it has the documented type, normalizing lists
fn conform(name: &str, value: &Value) -> Option<Value> {
    match name {
        NOTES | HUMAN_READABLE_SECTION => {
            value
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
        }
        JOB_AID_ASSESSMENT => {
            let areas = value.as_object()?;
            let mut normalized = Map::new();
            for (area, entry) in areas {
                if let Some(assessment) = conform_area(entry) {
                    normalized.insert(area.clone(), assessment);
                }
            }
            Some(Value::Object(normalized))
        }
        NEXT_STEPS => {
            match value {
                Value::Array(items) => {
                    let steps: Vec<Value> = items
                        .iter()
                        .filter_map(|i| i.as_str())
                        .map(|s| s.trim())
                        .filter(|s| !s.is_empty())
                        .map(|s| Value::String(s.to_string()))
                        .collect();
                    Some(Value::Array(steps))
                }
                Value::String(s) if !s.trim().is_empty() => {
                    Some(Value::Array(list_items(s, true).into_iter().map(Value::String).collect()))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// `{assessment, issues}`, or a bare status string
fn conform_area(entry: &Value) -> Option<Value> {
    match entry {
        Value::String(s) => {
            let status = ItemStatus::parse(s)?;
            Some(json!({ "assessment": status.as_str(), "issues": [] }))
        }
        Value::Object(obj) => {
            let status = obj
                .get("assessment")
                .or_else(|| obj.get("status"))
                .and_then(|v| v.as_str())
                .and_then(ItemStatus::parse)
                .unwrap_or(ItemStatus::Blank);
            let issues: Vec<Value> = match obj.get("issues") {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| Value::String(s.trim().to_string()))
                    .collect(),
                Some(Value::String(s)) if !s.trim().is_empty() => {
                    vec![Value::String(s.trim().to_string())]
                }
                _ => Vec::new(),
            };
            Some(json!({ "assessment": status.as_str(), "issues": issues }))
        }
        _ => None,
    }
}

fn section_value(name: &str, body: &str) -> Option<Value> {
    match name {
        NOTES | HUMAN_READABLE_SECTION => Some(Value::String(body.to_string())),
        NEXT_STEPS => {
            let steps = list_items(body, true);
            if steps.is_empty() {
                None
            } else {
                Some(Value::Array(steps.into_iter().map(Value::String).collect()))
            }
        }
        JOB_AID_ASSESSMENT => {
            let areas = parse_area_lines(body);
            if areas.is_empty() { None } else { Some(Value::Object(areas)) }
        }
        _ => None,
    }
}

static STATUS_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(needs[ _-]review|not[ _-]evaluated|n/a|passed|pass|failed|fail|partial|blank)\b",
    )
    .expect("status prefix pattern is valid")
});

/// Lines like `- Visual Quality: FAIL - blurred edges`.
/// Lines without a recognisable status are skipped rather than guessed.
fn parse_area_lines(body: &str) -> Map<String, Value> {
    let mut areas = Map::new();
    for line in body.lines() {
        let line = list_item(line).unwrap_or(line).trim();
        let Some((label, rest)) = line.split_once(':') else {
            continue;
        };
        let rest = rest.trim().trim_start_matches('*').trim();
        let Some(found) = STATUS_PREFIX.find(rest) else {
            continue;
        };
        let Some(status) = ItemStatus::parse(found.as_str()) else {
            continue;
        };
        let key = snake_key(label);
        if key.is_empty() {
            continue;
        }
        let remainder = rest[found.end()..]
            .trim_start_matches(|c: char| {
                c == '*' || c == '-' || c == ':' || c == ',' || c.is_whitespace()
            })
            .trim();
        let issues: Vec<Value> = if remainder.is_empty() {
            Vec::new()
        } else {
            vec![Value::String(remainder.to_string())]
        };
        areas.insert(key, json!({ "assessment": status.as_str(), "issues": issues }));
    }
    areas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_json_is_structured() {
        let text =
            r#"```json
{"notes": "Sharp product photo.", "job_aid_assessment": {"visual_quality": {"assessment": "PASS", "issues": []}},
 "human_readable_section": "Looks good.", "next_steps": ["Add rights metadata"]}
```"#;
        let record = extract_analysis(text);
        assert!(record.is_structured());
        let fields = record.fields().unwrap();
        assert_eq!(fields["job_aid_assessment"]["visual_quality"]["assessment"], "PASS");
    }

    #[test]
    fn headings_fill_missing_fields() {
        let text =
            "NOTES: The image is slightly soft.\n\nJOB AID ASSESSMENT:\n- Visual Quality: NEEDS REVIEW - soft focus\n- Brand Compliance: PASS\n- Metadata Completeness: unclear\n\nNEXT STEPS:\n1. Reshoot\n2. Add metadata";
        let record = extract_analysis(text);
        match record {
            ExtractedRecord::PartiallyStructured { fields, missing } => {
                assert_eq!(missing, vec!["human_readable_section".to_string()]);
                assert_eq!(fields["notes"], "The image is slightly soft.");
                let areas = fields["job_aid_assessment"].as_object().unwrap();
                assert_eq!(areas["visual_quality"]["assessment"], "PARTIAL");
                assert_eq!(areas["visual_quality"]["issues"][0], "soft focus");
                assert_eq!(areas["brand_compliance"]["assessment"], "PASS");
                assert!(!areas.contains_key("metadata_completeness"));
                assert_eq!(fields["next_steps"][1], "Add metadata");
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn json_wins_over_headings() {
        let text = "NOTES: from heading\n```json\n{\"notes\": \"from json\"}\n```";
        let record = extract_analysis(text);
        assert_eq!(record.fields().unwrap()["notes"], "from json");
    }

    #[test]
    fn free_prose_is_unparseable() {
        let record = extract_analysis("I looked at the picture and it is nice.");
        assert!(record.is_unparseable());
    }
}
