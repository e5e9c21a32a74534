//! Wire payloads for the model providers we talk to.
//!
//! Two dialects are covered: the OpenAI-compatible chat completions format
//! that OpenRouter serves (non-streaming, so responses carry a full
//! `message` rather than deltas), and Google's `generateContent` format for
//! Gemini, including inline image data for vision requests.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    pub message: ChatResponseMessage,
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

impl ChatResponse {
    /// First choice's content, if the provider returned one.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<GenerateContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
pub struct GenerateContent {
    pub parts: Vec<GeneratePart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl GeneratePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline_image(mime_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: base64_data.into(),
            }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<GenerateCandidate>,
}

#[derive(Deserialize)]
pub struct GenerateCandidate {
    pub content: Option<CandidateContent>,
}

#[derive(Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let mut out = String::new();
        for part in &content.parts {
            if let Some(text) = &part.text {
                out.push_str(text);
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_text_reads_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), Some("hi"));
    }

    #[test]
    fn chat_response_tolerates_missing_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), None);

        let raw = r#"{"choices":[]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), None);
    }

    #[test]
    fn generate_request_serializes_camel_case() {
        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![
                    GeneratePart::inline_image("image/jpeg", "QUJD"),
                    GeneratePart::text("describe this"),
                ],
            }],
            generation_config: Some(GenerationConfig::default()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "image/jpeg"
        );
        assert_eq!(value["contents"][0]["parts"][1]["text"], "describe this");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 2048);
        assert!(value["contents"][0]["parts"][1]
            .as_object()
            .unwrap()
            .get("inlineData")
            .is_none());
    }

    #[test]
    fn generate_response_concatenates_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there"}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello there"));
    }

    #[test]
    fn generate_response_handles_empty_candidates() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());
    }
}
