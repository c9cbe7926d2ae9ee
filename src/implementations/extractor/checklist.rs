use log::debug;
use serde_json::{json, Map, Value};

use super::json::locate_object;
use crate::models::checklist::{
    Checklist,
    ChecklistCategory,
    ChecklistItem,
    ChecklistSubcategory,
    JobAidSchema,
    OverallAssessment,
};
use crate::models::common::ItemStatus;
use crate::models::record::ExtractedRecord;

pub const WRAPPER_KEY: &str = "digital_component_analysis";
pub const OVERALL_KEY: &str = "overall_assessment";

/// Step 2: the job aid as a category → subcategory → item mapping.
///
/// Every schema leaf appears in the result. A leaf the reply does not state
/// is written as blank and listed as missing; it is never defaulted to a
/// pass or a fail.
pub fn extract_checklist(text: &str, schema: &JobAidSchema) -> ExtractedRecord {
    let located = locate_object(text, |m| {
        m.contains_key(WRAPPER_KEY) ||
            m.contains_key(OVERALL_KEY) ||
            schema.categories.iter().any(|c| lookup(m, &c.name).is_some())
    });
    let Some(found) = located else {
        return ExtractedRecord::Unparseable(text.to_string());
    };
    debug!("Step 2 JSON located ({:?})", found.source);

    let root = match found.object.get(WRAPPER_KEY) {
        Some(Value::Object(inner)) => inner,
        _ => &found.object,
    };

    let any_category = schema.categories.iter().any(|c| lookup(root, &c.name).is_some());
    let overall = root.get(OVERALL_KEY).and_then(conform_overall);
    if !any_category && overall.is_none() {
        return ExtractedRecord::Unparseable(text.to_string());
    }

    let mut fields = Map::new();
    let mut missing = Vec::new();

    for category in &schema.categories {
        let category_value = lookup(root, &category.name).and_then(Value::as_object);
        let mut subs = Map::new();
        for sub in &category.subcategories {
            let sub_value = category_value
                .and_then(|c| lookup(c, &sub.name))
                .and_then(Value::as_object);
            let mut items = Map::new();
            for item in &sub.items {
                let leaf = sub_value.and_then(|s| lookup(s, item)).and_then(conform_leaf);
                let leaf = match leaf {
                    Some(leaf) => leaf,
                    None => {
                        missing.push(format!("{}.{}.{}", category.name, sub.name, item));
                        json!({ "assessment": ItemStatus::Blank.as_str() })
                    }
                };
                items.insert(item.clone(), leaf);
            }
            subs.insert(sub.name.clone(), Value::Object(items));
        }
        fields.insert(category.name.clone(), Value::Object(subs));
    }

    if let Some(overall) = overall {
        fields.insert(OVERALL_KEY.to_string(), overall);
    }

    if missing.is_empty() {
        ExtractedRecord::Structured(fields)
    } else {
        debug!("Step 2 reply left {} checklist item(s) unstated", missing.len());
        ExtractedRecord::PartiallyStructured { fields, missing }
    }
}

/// Exact key first, then a case- and separator-insensitive match
fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    let wanted = fold(key);
    map.iter()
        .find(|(k, _)| fold(k) == wanted)
        .map(|(_, v)| v)
}

fn fold(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// A leaf is a status string or an object carrying `assessment`/`status`
fn conform_leaf(value: &Value) -> Option<Value> {
    let (raw_status, notes) = match value {
        Value::String(s) => (Some(s.as_str()), None),
        Value::Object(obj) => {
            let status = obj
                .get("assessment")
                .or_else(|| obj.get("status"))
                .and_then(Value::as_str);
            let notes = obj
                .get("notes")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty());
            (status, notes)
        }
        _ => (None, None),
    };

    let status = ItemStatus::parse(raw_status?)?;
    let mut leaf = Map::new();
    leaf.insert("assessment".to_string(), Value::String(status.as_str().to_string()));
    if let Some(notes) = notes {
        leaf.insert("notes".to_string(), Value::String(notes.to_string()));
    }
    Some(Value::Object(leaf))
}

fn conform_overall(value: &Value) -> Option<Value> {
    let obj = value.as_object()?;
    let status = obj
        .get("status")
        .or_else(|| obj.get("assessment"))
        .and_then(Value::as_str)
        .and_then(ItemStatus::parse)
        .unwrap_or(ItemStatus::Blank);
    let overall = OverallAssessment {
        status,
        summary: obj
            .get("summary")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        critical_issues: string_list(obj.get("critical_issues")),
        recommendations: string_list(obj.get("recommendations")),
    };
    serde_json::to_value(overall).ok()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Rebuild the typed checklist from extracted fields, in schema order
pub fn checklist_from_fields(fields: &Map<String, Value>, schema: &JobAidSchema) -> Checklist {
    let categories = schema
        .categories
        .iter()
        .map(|category| {
            let category_value = fields.get(&category.name);
            ChecklistCategory {
                name: category.name.clone(),
                subcategories: category.subcategories
                    .iter()
                    .map(|sub| {
                        let sub_value = category_value.and_then(|c| c.get(&sub.name));
                        ChecklistSubcategory {
                            name: sub.name.clone(),
                            items: sub.items
                                .iter()
                                .map(|item| {
                                    let leaf = sub_value.and_then(|s| s.get(item));
                                    ChecklistItem {
                                        name: item.clone(),
                                        status: leaf
                                            .and_then(|l| l.get("assessment"))
                                            .and_then(Value::as_str)
                                            .and_then(ItemStatus::parse)
                                            .unwrap_or(ItemStatus::Blank),
                                        notes: leaf
                                            .and_then(|l| l.get("notes"))
                                            .and_then(Value::as_str)
                                            .map(str::to_string),
                                    }
                                })
                                .collect(),
                        }
                    })
                    .collect(),
            }
        })
        .collect();
    Checklist { categories }
}

pub fn overall_from_fields(fields: &Map<String, Value>) -> Option<OverallAssessment> {
    fields
        .get(OVERALL_KEY)
        .and_then(|v| serde_json::from_value::<OverallAssessment>(v.clone()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::checklist::{CategorySchema, SubcategorySchema};

    fn small_schema() -> JobAidSchema {
        JobAidSchema {
            categories: vec![CategorySchema {
                name: "component_qc".into(),
                subcategories: vec![SubcategorySchema {
                    name: "visual_quality_checks".into(),
                    items: vec!["clarity".into(), "lighting".into()],
                }],
            }],
        }
    }

    #[test]
    fn complete_reply_is_structured() {
        let text =
            r#"{"digital_component_analysis": {"component_qc": {"visual_quality_checks": {
                "clarity": {"assessment": "PASS", "notes": "crisp"}, "lighting": "FAIL"}}}}"#;
        let record = extract_checklist(text, &small_schema());
        assert!(record.is_structured());
        let checklist = checklist_from_fields(record.fields().unwrap(), &small_schema());
        assert_eq!(
            checklist
                .get("component_qc.visual_quality_checks.clarity")
                .unwrap()
                .status,
            ItemStatus::Pass
        );
        assert_eq!(
            checklist.get("component_qc.visual_quality_checks.clarity").unwrap().notes.as_deref(),
            Some("crisp")
        );
        assert_eq!(
            checklist
                .get("component_qc.visual_quality_checks.lighting")
                .unwrap()
                .status,
            ItemStatus::Fail
        );
    }

    #[test]
    fn absent_leaf_becomes_blank_never_pass() {
        let text = r#"```json
{"component_qc": {"visual_quality_checks": {"clarity": {"assessment": "PASS"}}}}
```"#;
        let record = extract_checklist(text, &small_schema());
        assert_eq!(record.missing(), &["component_qc.visual_quality_checks.lighting".to_string()]);
        let checklist = checklist_from_fields(record.fields().unwrap(), &small_schema());
        assert_eq!(
            checklist
                .get("component_qc.visual_quality_checks.lighting")
                .unwrap()
                .status,
            ItemStatus::Blank
        );
    }

    #[test]
    fn unrecognised_status_is_blank() {
        let text = r#"{"component_qc": {"visual_quality_checks": {"clarity": "looks ok", "lighting": "N/A"}}}"#;
        let record = extract_checklist(text, &small_schema());
        assert_eq!(record.missing(), &["component_qc.visual_quality_checks.clarity".to_string()]);
        let checklist = checklist_from_fields(record.fields().unwrap(), &small_schema());
        assert_eq!(checklist.counts().blank, 2);
    }

    #[test]
    fn keys_match_loosely() {
        let text = r#"{"Component QC": {"Visual Quality Checks": {"Clarity": "PASS", "LIGHTING": "needs review"}}}"#;
        let record = extract_checklist(text, &small_schema());
        assert!(record.is_structured());
        let checklist = checklist_from_fields(record.fields().unwrap(), &small_schema());
        assert_eq!(checklist.counts().partial, 1);
    }

    #[test]
    fn overall_assessment_is_carried() {
        let text =
            r#"{"digital_component_analysis": {"overall_assessment": {"status": "FAIL", "critical_issues": ["No rights"]}}}"#;
        let record = extract_checklist(text, &small_schema());
        let overall = overall_from_fields(record.fields().unwrap()).unwrap();
        assert_eq!(overall.status, ItemStatus::Fail);
        assert_eq!(overall.critical_issues, vec!["No rights".to_string()]);
        assert_eq!(record.missing().len(), 2);
    }

    #[test]
    fn prose_reply_is_unparseable() {
        let record = extract_checklist("Everything passes, great image!", &small_schema());
        assert!(record.is_unparseable());
        let record = extract_checklist(r#"{"unrelated": true}"#, &small_schema());
        assert!(record.is_unparseable());
    }
}
