use crate::analysis::domain::error::AnalysisError;
use crate::feedback::domain::feedback_store::CorrectionHistory;

/// Everything a classifier needs for one image.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationRequest {
    /// `data:image/...;base64,` URI.
    pub image_data: String,
    pub corrections: CorrectionHistory,
    pub session_id: String,
}

/// Request/response channel to a mood classifier.
///
/// Implementations return the raw response text; validating its shape is
/// left to the caller so every transport is held to the same rules.
pub trait ClassifierTransport: Send + Sync {
    fn send(&self, request: &ClassificationRequest) -> Result<String, AnalysisError>;
}
