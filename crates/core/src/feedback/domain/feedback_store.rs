use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::domain::mood::Mood;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningType {
    Correction,
    Confirmation,
}

impl LearningType {
    pub fn between(predicted: Mood, actual: Mood) -> Self {
        if predicted == actual {
            LearningType::Confirmation
        } else {
            LearningType::Correction
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub session_id: String,
    pub predicted_mood: Mood,
    pub actual_mood: Mood,
    pub confidence: u8,
    pub image_fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub learning_type: LearningType,
}

/// One prior mistake, rendered into the classifier prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub predicted: Mood,
    pub actual: Mood,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionHistory {
    pub corrections: Vec<Correction>,
}

impl CorrectionHistory {
    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }
}

impl From<Vec<Correction>> for CorrectionHistory {
    fn from(corrections: Vec<Correction>) -> Self {
        Self { corrections }
    }
}

/// Append-only, session-scoped feedback log.
pub struct FeedbackStore {
    session_id: String,
    records: Vec<FeedbackRecord>,
    max_corrections: Option<usize>,
}

impl FeedbackStore {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            records: Vec::new(),
            max_corrections: None,
        }
    }

    /// Caps the history handed to the classifier to the most recent entries.
    pub fn with_max_corrections(mut self, max: usize) -> Self {
        self.max_corrections = Some(max);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record(
        &mut self,
        predicted: Mood,
        actual: Mood,
        confidence: u8,
        image_fingerprint: impl Into<String>,
        notes: Option<String>,
    ) -> FeedbackRecord {
        self.record_at(
            predicted,
            actual,
            confidence,
            image_fingerprint,
            notes,
            Utc::now(),
        )
    }

    pub fn record_at(
        &mut self,
        predicted: Mood,
        actual: Mood,
        confidence: u8,
        image_fingerprint: impl Into<String>,
        notes: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> FeedbackRecord {
        let record = FeedbackRecord {
            session_id: self.session_id.clone(),
            predicted_mood: predicted,
            actual_mood: actual,
            confidence,
            image_fingerprint: image_fingerprint.into(),
            notes,
            timestamp,
            learning_type: LearningType::between(predicted, actual),
        };
        log::debug!(
            "Recorded {:?}: predicted {predicted}, actual {actual}",
            record.learning_type
        );
        self.records.push(record.clone());
        record
    }

    pub fn records(&self) -> &[FeedbackRecord] {
        &self.records
    }

    /// Corrections recorded at or after `since`, oldest first.
    ///
    /// Confirmations carry no new information for the classifier and are
    /// left out.
    pub fn corrections_since(&self, since: DateTime<Utc>) -> CorrectionHistory {
        let mut corrections: Vec<Correction> = self
            .records
            .iter()
            .filter(|r| r.learning_type == LearningType::Correction && r.timestamp >= since)
            .map(|r| Correction {
                predicted: r.predicted_mood,
                actual: r.actual_mood,
                notes: r.notes.clone(),
            })
            .collect();
        if let Some(max) = self.max_corrections {
            let excess = corrections.len().saturating_sub(max);
            corrections.drain(..excess);
        }
        CorrectionHistory { corrections }
    }
}
