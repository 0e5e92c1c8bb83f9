use std::time::Duration;

use async_trait::async_trait;
use cheapfinds_contracts::chat::ChatMessage;
use cheapfinds_contracts::results::GroundingMetadata;
use cheapfinds_contracts::{PipelineError, TransportError};
use serde::{Deserialize, Serialize};

use super::{ProviderAnswer, SearchProvider};
use crate::codec::InlineImage;
use crate::config::{non_empty_env, EngineConfig};
use crate::query::{ChatRequest, ProviderRequest};

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Google Generative Language REST backend with the `googleSearch` tool
/// enabled on every call.
pub struct GeminiProvider {
    api_base: String,
    model: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.request_timeout,
            http: reqwest::Client::new(),
        }
    }

    fn api_key() -> Option<String> {
        non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
    }

    fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn search_body(request: &ProviderRequest) -> GenerateContentRequest {
        let mut parts: Vec<Part> = request
            .images
            .iter()
            .cloned()
            .map(|inline_data| Part::InlineData { inline_data })
            .collect();
        parts.push(Part::text(&request.instruction));
        GenerateContentRequest {
            contents: vec![Content::new(Some("user"), parts)],
            system_instruction: None,
            tools: vec![Tool::google_search()],
        }
    }

    fn chat_body(request: &ChatRequest<'_>) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|message: &ChatMessage| {
                Content::new(Some(message.role.as_str()), vec![Part::text(&message.text)])
            })
            .collect();
        contents.push(Content::new(Some("user"), vec![Part::text(request.message)]));
        GenerateContentRequest {
            contents,
            system_instruction: Some(Content::new(
                None,
                vec![Part::text(request.system_instruction)],
            )),
            tools: vec![Tool::google_search()],
        }
    }

    async fn post(&self, body: &GenerateContentRequest) -> Result<ProviderAnswer, TransportError> {
        let api_key = Self::api_key()
            .ok_or_else(|| TransportError::new("GEMINI_API_KEY or GOOGLE_API_KEY not set"))?;
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key.as_str())])
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| TransportError::new(format!("Gemini request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read Gemini error body".to_string());
            return Err(map_http_error(status.as_u16(), &body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            TransportError::new(format!("Gemini returned an invalid payload: {err}"))
        })?;
        Ok(parsed.into_answer())
    }
}

#[async_trait]
impl SearchProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn check_configured(&self) -> Result<(), PipelineError> {
        match Self::api_key() {
            Some(_) => Ok(()),
            None => Err(PipelineError::Configuration(
                "GEMINI_API_KEY or GOOGLE_API_KEY not set".to_string(),
            )),
        }
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderAnswer, TransportError> {
        self.post(&Self::search_body(request)).await
    }

    async fn converse(&self, request: &ChatRequest<'_>) -> Result<ProviderAnswer, TransportError> {
        self.post(&Self::chat_body(request)).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

impl Content {
    fn new(role: Option<&str>, parts: Vec<Part>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineImage,
    },
}

impl Part {
    fn text(text: &str) -> Self {
        Self::Text {
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

impl Tool {
    fn google_search() -> Self {
        Self {
            google_search: GoogleSearch {},
        }
    }
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ContentResponse>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate (all text parts joined) and its web citations.
    fn into_answer(self) -> ProviderAnswer {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return ProviderAnswer::default();
        };
        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        ProviderAnswer {
            text: Some(text).filter(|text| !text.trim().is_empty()),
            citations: candidate
                .grounding_metadata
                .map(|metadata| metadata.web_citations())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn map_http_error(status: u16, body: &str) -> TransportError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .and_then(|wrapper| {
            let message = wrapper.error.message?;
            Some(match wrapper.error.status.filter(|text| !text.is_empty()) {
                Some(status_text) => format!("{status_text}: {message}"),
                None => message,
            })
        })
        .unwrap_or_else(|| format!("Gemini request failed ({status}): {}", truncate(body)));
    TransportError::with_status(status, message)
}

fn truncate(value: &str) -> String {
    if value.chars().count() <= MAX_ERROR_BODY_CHARS {
        return value.to_string();
    }
    value.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use cheapfinds_contracts::chat::ChatSession;
    use cheapfinds_contracts::results::CitationLink;
    use cheapfinds_contracts::search::SearchMode;
    use serde_json::{json, Value};

    use super::{map_http_error, GenerateContentResponse, GeminiProvider};
    use crate::codec::InlineImage;
    use crate::config::EngineConfig;
    use crate::query::{ChatRequest, ProviderRequest};

    #[test]
    fn endpoint_accepts_bare_and_prefixed_model_names() {
        let mut config = EngineConfig {
            api_base: "http://localhost:9000/v1beta/".to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(
            GeminiProvider::new(&config).endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
        config.model = "models/gemini-2.5-pro".to_string();
        assert_eq!(
            GeminiProvider::new(&config).endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn search_body_puts_images_before_instruction_and_enables_search() -> anyhow::Result<()> {
        let request = ProviderRequest {
            mode: SearchMode::Single,
            images: vec![InlineImage {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            }],
            instruction: "find it".to_string(),
        };
        let body = serde_json::to_value(GeminiProvider::search_body(&request))?;
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                        {"text": "find it"}
                    ]
                }],
                "tools": [{"googleSearch": {}}]
            })
        );
        Ok(())
    }

    #[test]
    fn chat_body_replays_history_then_new_message() -> anyhow::Result<()> {
        let session = ChatSession::new("Global").with_turn("hi", "hello there");
        let request = ChatRequest {
            system_instruction: &session.system_directive,
            history: session.messages(),
            message: "find me AirPods Pro",
        };
        let body = serde_json::to_value(GeminiProvider::chat_body(&request))?;
        let roles: Vec<&str> = body["contents"]
            .as_array()
            .map(|rows| rows.iter().filter_map(|row| row["role"].as_str()).collect())
            .unwrap_or_default();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(body["contents"][2]["parts"][0]["text"], json!("find me AirPods Pro"));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            Value::String(session.system_directive.clone())
        );
        assert!(body["systemInstruction"].get("role").is_none());
        Ok(())
    }

    #[test]
    fn response_text_and_web_citations_are_extracted() -> anyhow::Result<()> {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "### 🥇 Gold"}, {"text": " Choice"}]
                },
                "groundingMetadata": {
                    "webSearchQueries": ["cheap kettle"],
                    "groundingChunks": [
                        {"web": {"uri": "https://a.example", "title": "a.example"}},
                        {"retrievedContext": {"uri": "gs://x"}},
                        {"web": {"uri": "https://b.example", "title": "b.example"}}
                    ]
                }
            }],
            "usageMetadata": {"totalTokenCount": 10}
        }))?;
        let answer = response.into_answer();
        assert_eq!(answer.text.as_deref(), Some("### 🥇 Gold Choice"));
        assert_eq!(
            answer.citations,
            vec![
                CitationLink::new("https://a.example", "a.example"),
                CitationLink::new("https://b.example", "b.example"),
            ]
        );
        Ok(())
    }

    #[test]
    fn empty_candidates_yield_no_text() -> anyhow::Result<()> {
        let response: GenerateContentResponse = serde_json::from_value(json!({}))?;
        assert_eq!(response.into_answer().text, None);
        let blank: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "  "}]}}]
        }))?;
        assert_eq!(blank.into_answer().text, None);
        Ok(())
    }

    #[test]
    fn http_errors_keep_status_and_provider_message() {
        let err = map_http_error(
            503,
            r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#,
        );
        assert_eq!(err.status, Some(503));
        assert_eq!(err.message, "UNAVAILABLE: The model is overloaded.");

        let plain = map_http_error(502, "<html>bad gateway</html>");
        assert_eq!(plain.status, Some(502));
        assert!(plain.message.contains("bad gateway"));
    }
}
