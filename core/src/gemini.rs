use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::generation::GenerationError;
use crate::generation::schema::{FieldType, ResponseSchema};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: &'static str,
    pub response_schema: Value,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

fn field_schema(kind: FieldType) -> Value {
    match kind {
        FieldType::String => json!({ "type": "STRING" }),
        FieldType::Number => json!({ "type": "NUMBER" }),
        FieldType::StringArray => json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
    }
}

/// Render a schema in the `responseSchema` dialect: an ARRAY of OBJECTs.
#[must_use]
pub fn render_schema(schema: &ResponseSchema) -> Value {
    let properties: Map<String, Value> = schema
        .fields
        .iter()
        .map(|f| (f.name.to_string(), field_schema(f.kind)))
        .collect();
    let required: Vec<&str> = schema.required_fields().collect();
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        }
    })
}

#[must_use]
pub fn build_request(prompt: &str, schema: &ResponseSchema) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(prompt.to_string()),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: render_schema(schema),
        },
    }
}

/// Concatenated text of the first candidate.
pub fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    if let Some(error) = response.error {
        return Err(GenerationError::ResponseError(error.message));
    }
    let text: String = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

/// Pull the service's message out of a non-2xx body, falling back to the raw body.
#[must_use]
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map_or_else(|_| body.to_string(), |e| e.error.message)
}
