use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info, warn};
use serde_json::{json, Value};

use crate::errors::TransportError;
use crate::implementations::config::{AnalyzerConfig, ConfigError};
use crate::models::input::{ModelReply, ModelRequest};
use crate::traits::ModelTransport;

/// Finish reasons that mean the service refused the content
const BLOCKING_FINISH_REASONS: [&str; 4] = ["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

/// One-shot transport for the Gemini `generateContent` REST API
pub struct GeminiTransport {
    http_client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    system_instruction: Option<String>,
}

impl GeminiTransport {
    pub fn new(
        api_key: String,
        endpoint: String,
        model: String,
        system_instruction: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            system_instruction,
        })
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ConfigError> {
        let api_key = config.get_api_key()?;
        // Leave the per-attempt deadline to the gateway; this only stops a hung socket.
        let request_timeout = config.retry.call_timeout() + Duration::from_secs(5);
        Self::new(
            api_key,
            config.model.api_endpoint.clone(),
            config.model.model.clone(),
            config.model.system_instruction.clone(),
            request_timeout
        )
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn request_body(&self, request: &ModelRequest) -> Value {
        let mut generation_config = serde_json::Map::new();
        if let Some(max) = request.params().max_output_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(max));
        }
        if let Some(temperature) = request.params().temperature {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }

        let mut body =
            json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": request.media_type().mime(),
                            "data": STANDARD.encode(request.image())
                        }
                    },
                    { "text": request.prompt() },
                ]
            }],
            "generationConfig": Value::Object(generation_config),
            "safetySettings": [
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
            ]
        });

        if let Some(instruction) = self
            .system_instruction
            .as_ref()
            .filter(|s| !s.trim().is_empty())
        {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }
        body
    }
}

#[async_trait]
impl ModelTransport for GeminiTransport {
    async fn send(&self, request: &ModelRequest) -> Result<ModelReply, TransportError> {
        let body = self.request_body(request);
        let started = Instant::now();

        debug!("POST {}", self.url());

        let response = self.http_client
            .post(self.url())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send().await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let response_text = response
            .text().await
            .map_err(|e| {
                TransportError::transient(format!("failed to read response body: {}", e))
            })?;

        if !(200..300).contains(&status) {
            warn!("API error: HTTP {} ({} bytes)", status, response_text.len());
            return Err(classify_status(status, &response_text));
        }

        let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
            warn!("JSON parsing error: {}", e);
            TransportError::fatal(format!("undecodable response body: {}", e))
        })?;

        let (text, finish_reason) = parse_response(&response_json)?;
        let latency = started.elapsed();

        info!("Received {} characters from {} in {:?}", text.len(), self.model, latency);
        Ok(ModelReply { text, latency, finish_reason })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        warn!("Request timed out");
        TransportError::transient(format!("request timed out: {}", e))
    } else if e.is_connect() {
        warn!("Connection error - check network connectivity");
        TransportError::transient(format!("connection failed: {}", e))
    } else if e.is_request() || e.is_body() {
        TransportError::transient(format!("request failed: {}", e))
    } else {
        TransportError::fatal(format!("HTTP client error: {}", e))
    }
}

/// Map a non-success HTTP status onto the gateway error taxonomy
pub fn classify_status(status: u16, body: &str) -> TransportError {
    let message = error_message(body).unwrap_or_else(|| truncate(body, 300));
    let message = format!("HTTP {}: {}", status, message);
    match status {
        429 => TransportError::rate_limited(message),
        500 | 502 | 503 | 504 => TransportError::transient(message),
        400 => TransportError::malformed(message),
        _ => TransportError::fatal(message),
    }
}

/// Pull reply text and finish reason out of a `generateContent` response
pub fn parse_response(response: &Value) -> Result<(String, Option<String>), TransportError> {
    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        return Err(TransportError::malformed(format!("prompt blocked: {}", reason)));
    }

    let candidate = response["candidates"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| TransportError::fatal("response contained no candidates"))?;

    let finish_reason = candidate["finishReason"].as_str().map(|s| s.to_string());
    if let Some(reason) = finish_reason.as_deref() {
        if BLOCKING_FINISH_REASONS.contains(&reason) {
            return Err(TransportError::malformed(format!("response blocked: {}", reason)));
        }
    }

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    Ok((text, finish_reason))
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(|s| s.to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportErrorKind;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(429, "").kind, TransportErrorKind::RateLimited);
        assert_eq!(classify_status(503, "").kind, TransportErrorKind::Transient);
        assert_eq!(classify_status(400, "").kind, TransportErrorKind::Malformed);
        assert_eq!(classify_status(401, "").kind, TransportErrorKind::Fatal);
        assert_eq!(classify_status(404, "").kind, TransportErrorKind::Fatal);
    }

    #[test]
    fn error_body_message_is_used() {
        let err = classify_status(400, r#"{"error": {"message": "Image too small"}}"#);
        assert_eq!(err.message, "HTTP 400: Image too small");
    }

    #[test]
    fn parses_candidate_text() {
        let response =
            json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] },
                "finishReason": "STOP"
            }]
        });
        let (text, reason) = parse_response(&response).unwrap();
        assert_eq!(text, "Hello world");
        assert_eq!(reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn safety_blocks_are_malformed() {
        let prompt_block = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert_eq!(parse_response(&prompt_block).unwrap_err().kind, TransportErrorKind::Malformed);

        let candidate_block = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert_eq!(
            parse_response(&candidate_block).unwrap_err().kind,
            TransportErrorKind::Malformed
        );
    }

    #[test]
    fn missing_candidates_is_fatal() {
        assert_eq!(parse_response(&json!({})).unwrap_err().kind, TransportErrorKind::Fatal);
    }
}
