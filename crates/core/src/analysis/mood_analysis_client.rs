use crate::analysis::domain::error::AnalysisError;
use crate::analysis::domain::mood::MoodResult;
use crate::analysis::domain::response_parser::parse_classification;
use crate::analysis::domain::transport::{ClassificationRequest, ClassifierTransport};
use crate::capture::domain::image_payload::ImagePayload;
use crate::feedback::domain::feedback_store::CorrectionHistory;
use crate::shared::constants::ANONYMOUS_SESSION;

/// Sends captured faces to a classifier and validates what comes back.
///
/// One request per call, no retries. Callers keep at most one analysis in
/// flight; the scan lifecycle enforces that.
pub struct MoodAnalysisClient {
    transport: Box<dyn ClassifierTransport>,
    session_id: String,
}

impl MoodAnalysisClient {
    pub fn new(transport: Box<dyn ClassifierTransport>) -> Self {
        Self {
            transport,
            session_id: ANONYMOUS_SESSION.to_string(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        if !session_id.trim().is_empty() {
            self.session_id = session_id;
        }
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn analyze(
        &self,
        payload: &ImagePayload,
        context: Option<&CorrectionHistory>,
    ) -> Result<MoodResult, AnalysisError> {
        self.analyze_for_session(&self.session_id, payload, context)
    }

    /// Like [`analyze`](Self::analyze) but stamps `session_id` instead of
    /// the client's own, for callers serving many sessions.
    pub fn analyze_for_session(
        &self,
        session_id: &str,
        payload: &ImagePayload,
        context: Option<&CorrectionHistory>,
    ) -> Result<MoodResult, AnalysisError> {
        let session_id = if session_id.trim().is_empty() {
            ANONYMOUS_SESSION
        } else {
            session_id
        };
        let request = ClassificationRequest {
            image_data: payload.data_uri.clone(),
            corrections: context.cloned().unwrap_or_default(),
            session_id: session_id.to_string(),
        };
        log::debug!(
            "Requesting classification ({} corrections, session {session_id})",
            request.corrections.len()
        );

        let body = self.transport.send(&request)?;
        let classification = parse_classification(&body)?;

        Ok(MoodResult {
            mood: classification.mood,
            confidence: classification.confidence,
            reasoning: classification.reasoning,
            timestamp: payload.captured_at,
            session_id: session_id.to_string(),
            version: classification.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::mood::Mood;
    use crate::feedback::domain::feedback_store::Correction;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    /// Returns a canned reply and remembers what it was asked.
    struct CannedTransport {
        reply: Result<String, AnalysisError>,
        seen: Arc<Mutex<Vec<ClassificationRequest>>>,
    }

    impl ClassifierTransport for CannedTransport {
        fn send(&self, request: &ClassificationRequest) -> Result<String, AnalysisError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    fn client(
        reply: Result<&str, AnalysisError>,
    ) -> (MoodAnalysisClient, Arc<Mutex<Vec<ClassificationRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let transport = CannedTransport {
            reply: reply.map(str::to_string),
            seen: Arc::clone(&seen),
        };
        (MoodAnalysisClient::new(Box::new(transport)), seen)
    }

    fn payload() -> ImagePayload {
        ImagePayload::from_data_uri(
            "data:image/jpeg;base64,AAAA",
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_valid_reply_is_stamped() {
        let (client, _) = client(Ok(r#"{"mood":"happy","confidence":82}"#));
        let result = client.analyze(&payload(), None).unwrap();
        assert_eq!(result.mood, Mood::Happy);
        assert_eq!(result.confidence, 82);
        assert_eq!(result.session_id, "anonymous");
        assert_eq!(result.timestamp, payload().captured_at);
    }

    #[test]
    fn test_missing_confidence_is_invalid() {
        let (client, _) = client(Ok(r#"{"mood":"happy"}"#));
        assert!(matches!(
            client.analyze(&payload(), None),
            Err(AnalysisError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_transport_error_is_passed_through() {
        let (client, _) = client(Err(AnalysisError::transport(Some(503), "unavailable")));
        assert_eq!(
            client.analyze(&payload(), None).unwrap_err(),
            AnalysisError::transport(Some(503), "unavailable")
        );
    }

    #[test]
    fn test_session_and_corrections_reach_transport() {
        let (client, seen) = client(Ok(r#"{"mood":"relaxed","confidence":40}"#));
        let client = client.with_session_id("session_abc");
        let history = CorrectionHistory::from(vec![Correction {
            predicted: Mood::Angry,
            actual: Mood::Confused,
            notes: None,
        }]);

        let result = client.analyze(&payload(), Some(&history)).unwrap();
        assert_eq!(result.session_id, "session_abc");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].session_id, "session_abc");
        assert_eq!(seen[0].corrections, history);
        assert_eq!(seen[0].image_data, "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_blank_session_falls_back_to_anonymous() {
        let (client, _) = client(Ok(r#"{"mood":"relaxed","confidence":40}"#));
        let client = client.with_session_id("  ");
        assert_eq!(client.session_id(), "anonymous");
        let result = client
            .analyze_for_session("", &payload(), None)
            .unwrap();
        assert_eq!(result.session_id, "anonymous");
    }
}
