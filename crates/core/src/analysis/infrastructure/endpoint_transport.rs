use std::time::Duration;

use crate::analysis::domain::error::AnalysisError;
use crate::analysis::domain::transport::{ClassificationRequest, ClassifierTransport};
use crate::analysis::domain::wire::{AnalyzeRequest, ErrorBody};

/// Posts captures to a remote analyze endpoint (`POST {imageData, feedback?, sessionId?}`).
pub struct EndpointTransport {
    url: String,
    client: reqwest::blocking::Client,
}

impl EndpointTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ClassifierTransport for EndpointTransport {
    fn send(&self, request: &ClassificationRequest) -> Result<String, AnalysisError> {
        let body = AnalyzeRequest {
            image_data: request.image_data.clone(),
            feedback: (!request.corrections.is_empty()).then(|| request.corrections.clone()),
            session_id: Some(request.session_id.clone()),
        };

        let response = self.client.post(&self.url).json(&body).send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(AnalysisError::transport(
                Some(status.as_u16()),
                error_message(&text, status),
            ));
        }
        Ok(text)
    }
}

/// Prefers the endpoint's `{error, details}` body over the bare status text.
pub(crate) fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => err.message(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}
