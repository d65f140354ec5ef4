use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::analysis::domain::error::AnalysisError;
use crate::analysis::domain::mood::{Mood, MoodResult};
use crate::analysis::mood_analysis_client::MoodAnalysisClient;
use crate::capture::domain::frame_source::{FrameSource, FrameSourceError};
use crate::capture::domain::image_payload::ImagePayload;
use crate::capture::infrastructure::capture_encoder::{CaptureEncoder, EncodingError};
use crate::detection::domain::face_region::derive_face_region;
use crate::feedback::domain::feedback_store::{CorrectionHistory, FeedbackRecord, FeedbackStore};
use crate::pipeline::detection_loop::{DetectionLoop, TickOutcome};
use crate::shared::subject::SubjectClass;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    InProgress,
    #[error("no stable subject in view")]
    NoSubject,
    #[error("scan failed: {0}")]
    Encoding(#[from] EncodingError),
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("camera access denied; retry to scan again")]
    CameraDenied,
    #[error("the scanner has been stopped")]
    Stopped,
}

/// A captured face waiting for classification.
#[derive(Clone, Debug)]
pub struct AnalysisJob {
    /// Must be handed back to [`ScanMoodUseCase::complete_scan`].
    pub sequence: u64,
    pub payload: ImagePayload,
    pub corrections: CorrectionHistory,
    pub session_id: String,
    pub subject: SubjectClass,
}

#[derive(Clone, Debug, PartialEq)]
struct PendingScan {
    sequence: u64,
    fingerprint: String,
}

#[derive(Clone, Debug, PartialEq)]
struct LastResult {
    result: MoodResult,
    fingerprint: String,
}

/// Owns the scan lifecycle around a running detection loop.
///
/// A scan pauses the loop, captures the tracked face, and hands out an
/// [`AnalysisJob`] that the host runs wherever it likes. Results come back
/// through [`complete_scan`](Self::complete_scan) tagged with the job's
/// sequence number; anything but the pending sequence is stale and dropped.
pub struct ScanMoodUseCase {
    detection_loop: DetectionLoop,
    encoder: CaptureEncoder,
    feedback: FeedbackStore,
    session_started: DateTime<Utc>,
    next_sequence: u64,
    pending: Option<PendingScan>,
    last: Option<LastResult>,
}

impl ScanMoodUseCase {
    pub fn new(detection_loop: DetectionLoop, encoder: CaptureEncoder, feedback: FeedbackStore) -> Self {
        Self {
            detection_loop,
            encoder,
            feedback,
            session_started: Utc::now(),
            next_sequence: 1,
            pending: None,
            last: None,
        }
    }

    pub fn detection_loop(&self) -> &DetectionLoop {
        &self.detection_loop
    }

    pub fn feedback(&self) -> &FeedbackStore {
        &self.feedback
    }

    pub fn session_id(&self) -> &str {
        self.feedback.session_id()
    }

    pub fn is_scanning(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_sequence(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.sequence)
    }

    pub fn last_result(&self) -> Option<&MoodResult> {
        self.last.as_ref().map(|l| &l.result)
    }

    pub fn tick(&mut self, now: Duration, source: &mut dyn FrameSource) -> TickOutcome {
        self.detection_loop.tick(now, source)
    }

    pub fn begin_scan(
        &mut self,
        now: Duration,
        source: &mut dyn FrameSource,
    ) -> Result<AnalysisJob, ScanError> {
        if !self.detection_loop.is_active() {
            return Err(ScanError::Stopped);
        }
        if self.detection_loop.is_denied() {
            return Err(ScanError::CameraDenied);
        }
        if self.pending.is_some() {
            return Err(ScanError::InProgress);
        }
        let subject = self
            .detection_loop
            .current()
            .cloned()
            .ok_or(ScanError::NoSubject)?;

        self.detection_loop.pause();
        let region = derive_face_region(&subject.bbox, &subject.class);
        let payload = match self.encoder.capture(source, &region) {
            Ok(payload) => payload,
            Err(EncodingError::Source(FrameSourceError::PermissionDenied(msg))) => {
                self.detection_loop.deny(&msg);
                return Err(ScanError::CameraDenied);
            }
            Err(e) => {
                log::warn!("Capture failed: {e}");
                self.detection_loop.resume(now);
                return Err(e.into());
            }
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending = Some(PendingScan {
            sequence,
            fingerprint: payload.fingerprint(),
        });

        let corrections = self.feedback.corrections_since(self.session_started);
        self.detection_loop.logger_mut().event(&format!(
            "Scan {sequence} started: {} at stability {:.1}, {}x{} capture, {} corrections",
            subject.class.display_label(),
            subject.stability,
            payload.width,
            payload.height,
            corrections.len()
        ));

        Ok(AnalysisJob {
            sequence,
            payload,
            corrections,
            session_id: self.feedback.session_id().to_string(),
            subject: subject.class,
        })
    }

    /// Accepts the outcome of scan `sequence`.
    ///
    /// Returns `None` when the outcome is stale (superseded, abandoned, or
    /// arriving after [`stop`](Self::stop)); the caller must not surface it.
    pub fn complete_scan(
        &mut self,
        sequence: u64,
        outcome: Result<MoodResult, AnalysisError>,
        now: Duration,
    ) -> Option<Result<MoodResult, AnalysisError>> {
        if !self.detection_loop.is_active() {
            log::debug!("Ignoring scan {sequence} result after stop");
            return None;
        }
        let pending = match self.pending.take() {
            Some(p) if p.sequence == sequence => p,
            other => {
                log::debug!(
                    "Discarding stale result for scan {sequence} (pending: {:?})",
                    other.as_ref().map(|p| p.sequence)
                );
                self.pending = other;
                return None;
            }
        };
        self.detection_loop.resume(now);

        match &outcome {
            Ok(result) => {
                self.detection_loop.logger_mut().event(&format!(
                    "Scan {sequence} finished: {} ({}%)",
                    result.mood.title(),
                    result.confidence
                ));
                self.last = Some(LastResult {
                    result: result.clone(),
                    fingerprint: pending.fingerprint,
                });
            }
            Err(e) => log::warn!("Scan {sequence} failed: {e}"),
        }
        Some(outcome)
    }

    /// Gives up on the pending scan; its eventual outcome becomes stale.
    pub fn abandon_scan(&mut self, now: Duration) {
        if let Some(pending) = self.pending.take() {
            self.detection_loop
                .logger_mut()
                .event(&format!("Scan {} abandoned", pending.sequence));
            self.detection_loop.resume(now);
        }
    }

    /// Runs begin, analysis and completion on the calling thread.
    pub fn scan_blocking(
        &mut self,
        now: Duration,
        source: &mut dyn FrameSource,
        client: &MoodAnalysisClient,
    ) -> Result<MoodResult, ScanError> {
        let job = self.begin_scan(now, source)?;
        let outcome = client.analyze_for_session(&job.session_id, &job.payload, Some(&job.corrections));
        match self.complete_scan(job.sequence, outcome, now) {
            Some(outcome) => Ok(outcome?),
            None => Err(ScanError::Stopped),
        }
    }

    /// Records what the subject's mood actually was for the last result.
    ///
    /// Returns `None` when nothing has been analyzed yet.
    pub fn record_feedback(&mut self, actual: Mood, notes: Option<String>) -> Option<FeedbackRecord> {
        let last = self.last.as_ref()?;
        Some(self.feedback.record(
            last.result.mood,
            actual,
            last.result.confidence,
            last.fingerprint.clone(),
            notes,
        ))
    }

    /// Asks for the camera again after a denial. The session's feedback
    /// history is kept, so later scans still carry earlier corrections.
    pub fn retry_camera(&mut self) -> bool {
        self.detection_loop.retry()
    }

    pub fn stop(&mut self) {
        self.pending = None;
        self.detection_loop.stop();
    }
}
