use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::config::GenerationParams;
use crate::errors::ValidationError;
use crate::models::common::MediaType;

/// Default ceiling for uploaded images (10 MiB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Metadata fields every component is expected to carry
pub const RECOMMENDED_METADATA_FIELDS: [&str; 2] = ["component_id", "component_name"];

/// One analysis request: the image, its media type and the component metadata.
///
/// Construction validates everything the Gateway would otherwise reject,
/// so an `AnalysisInput` that exists is always safe to send.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    image: Arc<[u8]>,
    media_type: MediaType,
    metadata: Map<String, Value>,
}

impl AnalysisInput {
    pub fn new(
        image: Vec<u8>,
        declared_type: Option<MediaType>,
        metadata: Option<Value>,
    ) -> Result<Self, ValidationError> {
        Self::with_size_limit(image, declared_type, metadata, DEFAULT_MAX_IMAGE_BYTES)
    }

    pub fn with_size_limit(
        image: Vec<u8>,
        declared_type: Option<MediaType>,
        metadata: Option<Value>,
        max_image_bytes: usize,
    ) -> Result<Self, ValidationError> {
        if image.is_empty() {
            return Err(ValidationError::EmptyImage);
        }
        if image.len() > max_image_bytes {
            return Err(ValidationError::ImageTooLarge {
                size: image.len(),
                limit: max_image_bytes,
            });
        }

        let media_type = match (declared_type, MediaType::detect(&image)) {
            (Some(declared), Some(detected)) if declared != detected => {
                return Err(ValidationError::MediaTypeMismatch {
                    declared: declared.to_string(),
                    detected: detected.to_string(),
                });
            }
            (_, Some(detected)) => detected,
            (Some(declared), None) => declared,
            (None, None) => {
                return Err(ValidationError::UnsupportedMediaType(
                    "unrecognised image data".to_string(),
                ));
            }
        };

        let metadata = match metadata {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ValidationError::InvalidMetadata(format!(
                    "expected an object, got {}",
                    type_name(&other)
                )));
            }
        };

        Ok(Self {
            image: Arc::from(image),
            media_type,
            metadata,
        })
    }

    pub fn image(&self) -> &Arc<[u8]> {
        &self.image
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn has_metadata(&self) -> bool {
        !self.metadata.is_empty()
    }

    /// Recommended fields that are absent or empty
    pub fn missing_recommended_fields(&self) -> Vec<&'static str> {
        RECOMMENDED_METADATA_FIELDS.iter()
            .copied()
            .filter(|field| {
                match self.metadata.get(*field) {
                    None | Some(Value::Null) => true,
                    Some(Value::String(s)) => s.trim().is_empty(),
                    Some(_) => false,
                }
            })
            .collect()
    }

    /// Metadata rendered for inclusion in a prompt
    pub fn metadata_block(&self) -> String {
        if self.metadata.is_empty() {
            return "No metadata provided. Checks that depend on metadata cannot be evaluated and must be left blank.".to_string();
        }

        let mut lines = vec!["COMPONENT METADATA:".to_string()];
        lines.push(format!("- Component ID: {}", self.text_field("component_id")));
        lines.push(format!("- Component Name: {}", self.text_field("component_name")));
        lines.push(format!("- Description: {}", self.text_field("description")));

        for (key, label) in [
            ("usage_rights", "Usage Rights"),
            ("geographic_restrictions", "Geographic Restrictions"),
            ("channel_requirements", "Channel Requirements"),
            ("file_specifications", "File Specifications"),
        ] {
            lines.push(format_nested(label, self.metadata.get(key)));
        }

        let extra: Vec<&String> = self.metadata
            .keys()
            .filter(|k| {
                ![
                    "component_id",
                    "component_name",
                    "description",
                    "usage_rights",
                    "geographic_restrictions",
                    "channel_requirements",
                    "file_specifications",
                ].contains(&k.as_str())
            })
            .collect();
        for key in extra {
            lines.push(format!("- {}: {}", title_case(key), compact(&self.metadata[key])));
        }

        lines.join("\n")
    }

    fn text_field(&self, key: &str) -> String {
        match self.metadata.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Null) | None => "Not provided".to_string(),
            Some(Value::String(_)) => "Not provided".to_string(),
            Some(other) => compact(other),
        }
    }
}

fn format_nested(label: &str, value: Option<&Value>) -> String {
    match value {
        Some(Value::Object(map)) => {
            let entries: Vec<String> = map
                .iter()
                .filter(|(_, v)| !is_empty_value(v))
                .map(|(k, v)| format!("  - {}: {}", title_case(k), compact(v)))
                .collect();
            if entries.is_empty() {
                format!("- {}: Not specified", label)
            } else {
                format!("- {}:\n{}", label, entries.join("\n"))
            }
        }
        Some(Value::Array(items)) if !items.is_empty() => {
            let joined: Vec<String> = items.iter().map(compact).collect();
            format!("- {}: {}", label, joined.join(", "))
        }
        Some(v) if !is_empty_value(v) => format!("- {}: {}", label, compact(v)),
        _ => format!("- {}: Not specified", label),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A single call to the multimodal model
#[derive(Debug, Clone)]
pub struct ModelRequest {
    image: Arc<[u8]>,
    media_type: MediaType,
    prompt: String,
    params: GenerationParams,
}

impl ModelRequest {
    pub fn new(
        image: Arc<[u8]>,
        media_type: MediaType,
        prompt: String,
        params: GenerationParams,
    ) -> Result<Self, ValidationError> {
        if image.is_empty() {
            return Err(ValidationError::EmptyImage);
        }
        if prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        Ok(Self { image, media_type, prompt, params })
    }

    pub fn for_input(
        input: &AnalysisInput,
        prompt: String,
        params: GenerationParams,
    ) -> Result<Self, ValidationError> {
        Self::new(Arc::clone(input.image()), input.media_type(), prompt, params)
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }
}

/// Raw text returned by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub latency: Duration,
    pub finish_reason: Option<String>,
}

impl ModelReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            latency: Duration::ZERO,
            finish_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

    #[test]
    fn metadata_must_be_an_object() {
        let err = AnalysisInput::new(PNG.to_vec(), None, Some(json!(["a"]))).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMetadata(_)));
    }

    #[test]
    fn absent_metadata_defaults_to_empty_object() {
        let input = AnalysisInput::new(PNG.to_vec(), None, None).unwrap();
        assert!(!input.has_metadata());
        assert_eq!(input.media_type(), MediaType::Png);
        assert_eq!(input.missing_recommended_fields(), vec!["component_id", "component_name"]);
        assert!(input.metadata_block().starts_with("No metadata provided"));
    }

    #[test]
    fn declared_type_must_match_content() {
        let err = AnalysisInput::new(PNG.to_vec(), Some(MediaType::Jpeg), None).unwrap_err();
        assert!(matches!(err, ValidationError::MediaTypeMismatch { .. }));
    }

    #[test]
    fn oversized_image_is_rejected() {
        let err = AnalysisInput::with_size_limit(PNG.to_vec(), None, None, 4).unwrap_err();
        assert_eq!(err, ValidationError::ImageTooLarge { size: PNG.len(), limit: 4 });
    }

    #[test]
    fn metadata_block_lists_known_fields() {
        let input = AnalysisInput::new(
            PNG.to_vec(),
            None,
            Some(json!({
                "component_id": "IMG-001",
                "usage_rights": {"commercial_use": "yes", "editorial_use": null},
                "geographic_restrictions": ["EU", "US"],
                "campaign": "spring"
            }))
        ).unwrap();
        let block = input.metadata_block();
        assert!(block.contains("- Component ID: IMG-001"));
        assert!(block.contains("- Component Name: Not provided"));
        assert!(block.contains("  - Commercial Use: yes"));
        assert!(!block.contains("Editorial Use"));
        assert!(block.contains("- Geographic Restrictions: EU, US"));
        assert!(block.contains("- Channel Requirements: Not specified"));
        assert!(block.contains("- Campaign: spring"));
    }

    #[test]
    fn request_rejects_blank_prompt() {
        let input = AnalysisInput::new(PNG.to_vec(), None, None).unwrap();
        let err =
            ModelRequest::for_input(&input, "   ".into(), GenerationParams::default()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyPrompt);
    }
}
