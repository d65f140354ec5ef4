use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analysis::domain::error::AnalysisError;
use crate::analysis::domain::prompt::{system_prompt, USER_INSTRUCTION};
use crate::analysis::domain::transport::{ClassificationRequest, ClassifierTransport};
use crate::analysis::infrastructure::endpoint_transport::error_message;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionModelConfig {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            temperature: 0.3,
            max_tokens: 200,
            timeout_secs: crate::shared::constants::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Classifies directly against a vision-capable chat-completions API.
///
/// The blocking HTTP client is built per request, so the transport can be
/// created and dropped on async threads and only `send` needs a blocking
/// context.
pub struct VisionModelTransport {
    config: VisionModelConfig,
}

impl VisionModelTransport {
    pub fn new(config: VisionModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VisionModelConfig {
        &self.config
    }

    fn request_body(&self, request: &ClassificationRequest) -> Value {
        json!({
            "model": self.config.model,
            "response_format": {"type": "json_object"},
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {"role": "system", "content": system_prompt(Some(&request.corrections))},
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": USER_INSTRUCTION},
                        {"type": "image_url", "image_url": {"url": request.image_data}}
                    ]
                }
            ]
        })
    }
}

impl ClassifierTransport for VisionModelTransport {
    fn send(&self, request: &ClassificationRequest) -> Result<String, AnalysisError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;

        let mut http = client.post(&url).json(&self.request_body(request));
        if !self.config.api_key.is_empty() {
            http = http.bearer_auth(&self.config.api_key);
        }

        let response = http.send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(AnalysisError::transport(
                Some(status.as_u16()),
                vendor_error(&text).unwrap_or_else(|| error_message(&text, status)),
            ));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::MalformedPayload(e.to_string()))?;
        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AnalysisError::MalformedPayload("missing message content in completion".to_string())
            })
    }
}

/// `{"error": {"message": ...}}`, the chat-completions error envelope.
fn vendor_error(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::mood::Mood;
    use crate::feedback::domain::feedback_store::{Correction, CorrectionHistory};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn config(base_url: String) -> VisionModelConfig {
        VisionModelConfig {
            base_url,
            api_key: "sk-test".to_string(),
            ..VisionModelConfig::default()
        }
    }

    fn request() -> ClassificationRequest {
        ClassificationRequest {
            image_data: "data:image/jpeg;base64,AAAA".to_string(),
            corrections: CorrectionHistory::from(vec![Correction {
                predicted: Mood::Happy,
                actual: Mood::Anxious,
                notes: None,
            }]),
            session_id: "anonymous".to_string(),
        }
    }

    async fn send(base_url: String) -> Result<String, AnalysisError> {
        tokio::task::spawn_blocking(move || VisionModelTransport::new(config(base_url)).send(&request()))
            .await
            .unwrap()
    }

    fn completion(content: &str) -> Value {
        json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]})
    }

    #[test]
    fn test_request_body_shape() {
        let transport = VisionModelTransport::new(VisionModelConfig::default());
        let body = transport.request_body(&request());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["max_tokens"], 200);
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("LEARNING CONTEXT"));
        assert_eq!(
            body["messages"][1]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[tokio::test]
    async fn test_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion(r#"{"mood":"happy","confidence":82}"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let content = send(server.uri()).await.unwrap();
        assert_eq!(content, r#"{"mood":"happy","confidence":82}"#);

        let received: Vec<Request> = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn test_vendor_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        assert_eq!(
            send(server.uri()).await.unwrap_err(),
            AnalysisError::transport(Some(401), "Incorrect API key provided")
        );
    }

    #[tokio::test]
    async fn test_completion_without_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        assert!(matches!(
            send(server.uri()).await,
            Err(AnalysisError::MalformedPayload(_))
        ));
    }
}
