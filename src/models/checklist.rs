use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::models::common::ItemStatus;

/// Shape of the job aid: category → subcategory → item names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAidSchema {
    pub categories: Vec<CategorySchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySchema {
    pub name: String,
    pub subcategories: Vec<SubcategorySchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategorySchema {
    pub name: String,
    pub items: Vec<String>,
}

impl CategorySchema {
    fn new(name: &str, subcategories: Vec<SubcategorySchema>) -> Self {
        Self { name: name.to_string(), subcategories }
    }
}

impl SubcategorySchema {
    fn new(name: &str, items: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for JobAidSchema {
    fn default() -> Self {
        Self {
            categories: vec![
                CategorySchema::new("component_specifications", vec![
                    SubcategorySchema::new("file_format_requirements", &[
                        "allowed_formats",
                        "format_restrictions",
                    ]),
                    SubcategorySchema::new("resolution_requirements", &[
                        "minimum_resolution",
                        "optimal_resolution",
                    ]),
                    SubcategorySchema::new("color_profile_requirements", &[
                        "required_profile",
                        "color_space",
                    ]),
                    SubcategorySchema::new("naming_convention_requirements", &["pattern"]),
                ]),
                CategorySchema::new("component_metadata", vec![
                    SubcategorySchema::new("required_metadata", &[
                        "component_id",
                        "component_name",
                        "description",
                    ]),
                    SubcategorySchema::new("rights_and_restrictions", &[
                        "usage_rights",
                        "geographic_restrictions",
                    ]),
                    SubcategorySchema::new("distribution_metadata", &[
                        "channel_requirements",
                        "file_specifications",
                    ]),
                ]),
                CategorySchema::new("component_qc", vec![
                    SubcategorySchema::new("visual_quality_checks", &[
                        "clarity",
                        "lighting",
                        "composition",
                        "color_accuracy",
                    ]),
                    SubcategorySchema::new("technical_quality_checks", &[
                        "compression_artifacts",
                        "noise_levels",
                        "sharpness",
                    ]),
                    SubcategorySchema::new("compliance_checks", &[
                        "brand_guidelines",
                        "legal_requirements",
                        "accessibility_standards",
                    ]),
                ]),
                CategorySchema::new("component_linking", vec![
                    SubcategorySchema::new("relationship_requirements", &["required_links"]),
                    SubcategorySchema::new("dependency_checks", &["dependencies"]),
                ]),
                CategorySchema::new("material_distribution_package_qc", vec![
                    SubcategorySchema::new("package_integrity_checks", &[
                        "completeness",
                        "consistency",
                    ]),
                    SubcategorySchema::new("distribution_readiness_checks", &[
                        "channel_requirements",
                        "delivery_specifications",
                    ]),
                ]),
            ],
        }
    }
}

impl JobAidSchema {
    /// Reject schemas that would make every reply unparseable
    pub fn validate(&self) -> Result<(), String> {
        if self.categories.is_empty() {
            return Err("job aid schema has no categories".to_string());
        }
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err("job aid category with an empty name".to_string());
            }
            if category.subcategories.is_empty() {
                return Err(format!("category '{}' has no subcategories", category.name));
            }
            for sub in &category.subcategories {
                if sub.items.is_empty() {
                    return Err(format!(
                        "subcategory '{}.{}' has no items",
                        category.name, sub.name
                    ));
                }
            }
        }
        Ok(())
    }

    /// Dotted paths of every leaf item, in schema order
    pub fn item_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for category in &self.categories {
            for sub in &category.subcategories {
                for item in &sub.items {
                    paths.push(format!("{}.{}.{}", category.name, sub.name, item));
                }
            }
        }
        paths
    }

    pub fn item_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| c.subcategories.iter())
            .map(|s| s.items.len())
            .sum()
    }

    /// Empty job aid document the model is asked to fill in
    pub fn to_prompt_json(&self) -> Value {
        let mut analysis = Map::new();
        for category in &self.categories {
            let mut subs = Map::new();
            for sub in &category.subcategories {
                let mut items = Map::new();
                for item in &sub.items {
                    items.insert(
                        item.clone(),
                        json!({ "assessment": "PASS | FAIL | PARTIAL | (blank)", "notes": "" }),
                    );
                }
                subs.insert(sub.name.clone(), Value::Object(items));
            }
            analysis.insert(category.name.clone(), Value::Object(subs));
        }
        analysis.insert(
            "overall_assessment".to_string(),
            json!({
                "status": "PASS | FAIL | PARTIAL",
                "summary": "",
                "critical_issues": [],
                "recommendations": []
            })
        );
        json!({ "digital_component_analysis": Value::Object(analysis) })
    }
}

/// One evaluated checklist leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub name: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistSubcategory {
    pub name: String,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistCategory {
    pub name: String,
    pub subcategories: Vec<ChecklistSubcategory>,
}

/// A fully keyed checklist: every schema leaf is present, unstated ones are blank
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Checklist {
    pub categories: Vec<ChecklistCategory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusCounts {
    pub pass: usize,
    pub fail: usize,
    pub partial: usize,
    pub blank: usize,
}

impl Checklist {
    /// Every item of the schema set to blank
    pub fn blank(schema: &JobAidSchema) -> Self {
        Self {
            categories: schema.categories
                .iter()
                .map(|c| ChecklistCategory {
                    name: c.name.clone(),
                    subcategories: c.subcategories
                        .iter()
                        .map(|s| ChecklistSubcategory {
                            name: s.name.clone(),
                            items: s.items
                                .iter()
                                .map(|i| ChecklistItem {
                                    name: i.clone(),
                                    status: ItemStatus::Blank,
                                    notes: None,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = (String, &ChecklistItem)> {
        self.categories.iter().flat_map(|c| {
            c.subcategories.iter().flat_map(move |s| {
                s.items.iter().map(move |i| (format!("{}.{}.{}", c.name, s.name, i.name), i))
            })
        })
    }

    pub fn get(&self, path: &str) -> Option<&ChecklistItem> {
        self.items()
            .find(|(p, _)| p == path)
            .map(|(_, item)| item)
    }

    pub fn blank_items(&self) -> Vec<String> {
        self.items()
            .filter(|(_, item)| item.status.is_blank())
            .map(|(path, _)| path)
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for (_, item) in self.items() {
            match item.status {
                ItemStatus::Pass => counts.pass += 1,
                ItemStatus::Fail => counts.fail += 1,
                ItemStatus::Partial => counts.partial += 1,
                ItemStatus::Blank => counts.blank += 1,
            }
        }
        counts
    }

    /// Nested category → subcategory → item object for prompts
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        for category in &self.categories {
            let mut subs = Map::new();
            for sub in &category.subcategories {
                let mut items = Map::new();
                for item in &sub.items {
                    let mut leaf = Map::new();
                    leaf.insert(
                        "assessment".to_string(),
                        Value::String(item.status.as_str().to_string()),
                    );
                    if let Some(notes) = &item.notes {
                        leaf.insert("notes".to_string(), Value::String(notes.clone()));
                    }
                    items.insert(item.name.clone(), Value::Object(leaf));
                }
                subs.insert(sub.name.clone(), Value::Object(items));
            }
            root.insert(category.name.clone(), Value::Object(subs));
        }
        Value::Object(root)
    }
}

/// Model-reported verdict accompanying the checklist
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverallAssessment {
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub critical_issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Plain-text summary of a Step 2 assessment
pub fn assessment_summary(overall: Option<&OverallAssessment>, checklist: &Checklist) -> String {
    let status = overall
        .map(|o| o.status)
        .filter(|s| !s.is_blank())
        .map(|s| s.as_str())
        .unwrap_or("NEEDS_REVIEW");

    let summary = overall
        .and_then(|o| o.summary.as_deref())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            (
                match status {
                    "PASS" => "The digital component meets all compliance requirements.",
                    "FAIL" => "The digital component has compliance issues that need to be addressed.",
                    _ => "The digital component requires further review.",
                }
            ).to_string()
        });

    let counts = checklist.counts();
    let mut out = format!(
        "Assessment Status: {}\n\n{}\n\nChecklist: {} pass, {} fail, {} partial, {} not evaluated",
        status,
        summary,
        counts.pass,
        counts.fail,
        counts.partial,
        counts.blank
    );

    if let Some(overall) = overall {
        if !overall.critical_issues.is_empty() {
            out.push_str("\n\nCritical Issues:");
            for (i, issue) in overall.critical_issues.iter().enumerate() {
                out.push_str(&format!("\n{}. {}", i + 1, issue));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_has_five_categories() {
        let schema = JobAidSchema::default();
        assert_eq!(schema.categories.len(), 5);
        assert!(schema.validate().is_ok());
        assert!(schema
            .item_paths()
            .contains(&"component_metadata.required_metadata.component_id".to_string()));
        assert_eq!(schema.item_paths().len(), schema.item_count());
    }

    #[test]
    fn blank_checklist_counts_every_item_as_blank() {
        let schema = JobAidSchema::default();
        let checklist = Checklist::blank(&schema);
        assert_eq!(checklist.counts().blank, schema.item_count());
        assert_eq!(checklist.blank_items(), schema.item_paths());
    }

    #[test]
    fn summary_defaults_when_overall_missing() {
        let checklist = Checklist::blank(&JobAidSchema::default());
        let text = assessment_summary(None, &checklist);
        assert!(text.starts_with("Assessment Status: NEEDS_REVIEW"));
        assert!(text.contains("requires further review"));
    }

    #[test]
    fn summary_lists_critical_issues() {
        let overall = OverallAssessment {
            status: ItemStatus::Fail,
            summary: None,
            critical_issues: vec!["No usage rights".into()],
            recommendations: vec![],
        };
        let checklist = Checklist::blank(&JobAidSchema::default());
        let text = assessment_summary(Some(&overall), &checklist);
        assert!(text.contains("Assessment Status: FAIL"));
        assert!(text.contains("1. No usage rights"));
    }

    #[test]
    fn empty_schema_is_invalid() {
        let schema = JobAidSchema { categories: vec![] };
        assert!(schema.validate().is_err());
    }
}
