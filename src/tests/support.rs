use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::info;

use crate::errors::TransportError;
use crate::models::input::{ModelReply, ModelRequest};
use crate::traits::ModelTransport;

/// What the scripted transport does on one call
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(String),
    Fail(TransportError),
    /// Never answers
    Hang,
}

/// In-memory transport that replays a queue of outcomes and counts calls.
///
/// Clones share the queue, the counter and the prompt log.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    outcomes: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<Scripted>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            ..Self::default()
        }
    }

    pub fn replies(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| Scripted::Reply(t.to_string()))
                .collect(),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.outcomes.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    async fn send(&self, request: &ModelRequest) -> Result<ModelReply, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt().to_string());
        }
        let next = self.outcomes.lock().ok().and_then(|mut queue| queue.pop_front());
        info!("Scripted call {} ({} outcome(s) left)", call, self.remaining());

        match next {
            Some(Scripted::Reply(text)) => Ok(ModelReply::new(text)),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(TransportError::fatal("script exhausted")),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Smallest byte string that passes as a JPEG
pub fn jpeg_bytes() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00]
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const STEP1_REPLY: &str =
    r#"NOTES: Product photo of a red chair on a white background. Lighting is even and the image is sharp.

JOB AID ASSESSMENT:
- Visual Quality: PASS
- Metadata Completeness: FAIL - no metadata supplied
- Brand Compliance: NEEDS REVIEW - logo not visible

HUMAN-READABLE SECTION:
The image itself is usable, but it cannot be cleared without component metadata.

NEXT STEPS:
1. Supply component metadata
2. Confirm usage rights"#;

pub const STEP2_REPLY: &str =
    r#"```json
{
  "digital_component_analysis": {
    "component_specifications": {
      "file_format_requirements": {
        "allowed_formats": {"assessment": "PASS", "notes": "JPEG"},
        "format_restrictions": {"assessment": "PASS"}
      }
    },
    "component_metadata": {
      "required_metadata": {
        "component_id": {"assessment": "", "notes": "No metadata provided"},
        "component_name": {"assessment": "N/A"}
      }
    },
    "component_qc": {
      "visual_quality_checks": {
        "clarity": {"assessment": "PASS"},
        "lighting": {"assessment": "PASS"}
      }
    },
    "overall_assessment": {
      "status": "FAIL",
      "summary": "Required metadata is missing.",
      "critical_issues": ["Component metadata was not supplied"],
      "recommendations": ["Provide component_id and component_name"]
    }
  }
}
```"#;

pub const STEP3_REPLY: &str =
    r#"```json
{
  "component_id": "",
  "component_name": "",
  "check_status": "PASSED",
  "issues_detected": [
    {"category": "Metadata", "description": "Required component metadata is missing", "action": "Supply component_id and component_name"}
  ],
  "missing_information": [
    {"field": "component_id", "description": "No metadata was provided with the asset", "action": "Provide a component ID"}
  ],
  "recommendations": ["Resubmit the asset with complete metadata"]
}
```

HUMAN-READABLE REPORT:
The red chair photo is technically sound but cannot be approved because no component metadata was supplied."#;
