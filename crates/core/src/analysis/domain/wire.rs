//! JSON bodies exchanged with the analyze and feedback endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::analysis::domain::mood::Mood;
use crate::analysis::domain::response_parser::confidence_number;
use crate::feedback::domain::feedback_store::{CorrectionHistory, FeedbackRecord, LearningType};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Empty when the caller omitted it or sent `null`; the endpoint
    /// rejects that.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<CorrectionHistory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub predicted_mood: Option<Mood>,
    #[serde(default)]
    pub actual_mood: Option<Mood>,
    /// Accepts any numeric form; anything else is dropped rather than
    /// rejecting the whole record.
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub image_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&FeedbackRecord> for FeedbackRequest {
    fn from(record: &FeedbackRecord) -> Self {
        Self {
            session_id: Some(record.session_id.clone()),
            predicted_mood: Some(record.predicted_mood),
            actual_mood: Some(record.actual_mood),
            confidence: Some(record.confidence),
            image_hash: Some(record.image_fingerprint.clone()),
            notes: record.notes.clone(),
            timestamp: Some(record.timestamp),
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(confidence_number(&value)
        .filter(|c| c.is_finite())
        .map(|c| c.round().clamp(0.0, 100.0) as u8))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub learning_type: LearningType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Most specific human-readable text in the body.
    pub fn message(&self) -> String {
        match &self.details {
            Some(details) => format!("{}: {details}", self.error),
            None => self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::domain::feedback_store::Correction;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_analyze_request_wire_shape() {
        let request = AnalyzeRequest {
            image_data: "data:image/jpeg;base64,AAAA".to_string(),
            feedback: Some(CorrectionHistory::from(vec![Correction {
                predicted: Mood::Angry,
                actual: Mood::Confused,
                notes: None,
            }])),
            session_id: Some("s1".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "imageData": "data:image/jpeg;base64,AAAA",
                "feedback": {"corrections": [{"predicted": "angry", "actual": "confused"}]},
                "sessionId": "s1"
            })
        );
    }

    #[test]
    fn test_analyze_request_tolerates_missing_fields() {
        let request: AnalyzeRequest = serde_json::from_str("{}").unwrap();
        assert!(request.image_data.is_empty());
        assert!(request.feedback.is_none());
    }

    #[test]
    fn test_null_image_data_reads_as_empty() {
        let request: AnalyzeRequest =
            serde_json::from_value(json!({"imageData": null, "sessionId": "s"})).unwrap();
        assert!(request.image_data.is_empty());
        assert_eq!(request.session_id.as_deref(), Some("s"));
    }

    #[rstest]
    #[case::integer(json!(82), Some(82))]
    #[case::fraction(json!(82.5), Some(83))]
    #[case::numeric_string(json!("82"), Some(82))]
    #[case::percent_string(json!("64%"), Some(64))]
    #[case::above_range(json!(150), Some(100))]
    #[case::below_range(json!(-3), Some(0))]
    #[case::text(json!("very"), None)]
    #[case::null(json!(null), None)]
    fn test_feedback_confidence_is_lenient(#[case] raw: Value, #[case] expected: Option<u8>) {
        let request: FeedbackRequest = serde_json::from_value(json!({
            "predictedMood": "happy",
            "actualMood": "happy",
            "confidence": raw
        }))
        .unwrap();
        assert_eq!(request.confidence, expected);
    }

    #[test]
    fn test_feedback_request_from_json() {
        let request: FeedbackRequest = serde_json::from_value(json!({
            "predictedMood": "angry",
            "actualMood": "confused",
            "confidence": 70,
            "imageHash": "abc123"
        }))
        .unwrap();
        assert_eq!(request.predicted_mood, Some(Mood::Angry));
        assert_eq!(request.actual_mood, Some(Mood::Confused));
        assert!(request.session_id.is_none());
    }

    #[test]
    fn test_error_body_message() {
        let body = ErrorBody::new("Failed to analyze image").with_details("timeout");
        assert_eq!(body.message(), "Failed to analyze image: timeout");
        assert_eq!(
            serde_json::to_value(ErrorBody::new("Method not allowed")).unwrap(),
            json!({"error": "Method not allowed"})
        );
    }
}
