use std::time::Duration;

use thiserror::Error;

use crate::analysis::domain::wire::{ErrorBody, FeedbackRequest, FeedbackResponse};
use crate::feedback::domain::feedback_store::FeedbackRecord;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("feedback request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feedback endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected feedback response: {0}")]
    InvalidResponse(String),
}

/// Destination for feedback records outside the session store.
pub trait FeedbackSink: Send {
    fn submit(&mut self, record: &FeedbackRecord) -> Result<FeedbackResponse, FeedbackError>;
}

/// Posts records to the remote feedback endpoint.
pub struct EndpointFeedbackSink {
    url: String,
    client: reqwest::blocking::Client,
}

impl EndpointFeedbackSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedbackError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl FeedbackSink for EndpointFeedbackSink {
    fn submit(&mut self, record: &FeedbackRecord) -> Result<FeedbackResponse, FeedbackError> {
        let response = self
            .client
            .post(&self.url)
            .json(&FeedbackRequest::from(record))
            .send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.message())
                .unwrap_or(text);
            return Err(FeedbackError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: FeedbackResponse = serde_json::from_str(&text)
            .map_err(|e| FeedbackError::InvalidResponse(e.to_string()))?;
        if !parsed.success {
            return Err(FeedbackError::InvalidResponse(
                "endpoint reported success: false".to_string(),
            ));
        }
        Ok(parsed)
    }
}
