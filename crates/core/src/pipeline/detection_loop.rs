use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::capture::domain::frame_source::{FrameSource, FrameSourceError};
use crate::detection::domain::detection_smoother::{DetectionSmoother, SmoothedDetection};
use crate::detection::domain::detector::{Detector, RawDetection};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::subject::SubjectClass;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Minimum time between two detector calls.
    pub min_interval_ms: u64,
    /// Grace period after a capture before detection restarts.
    pub resume_delay_ms: u64,
    /// Candidates must score strictly above this.
    pub min_score: f64,
    pub subject_classes: Vec<SubjectClass>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 150,
            resume_delay_ms: 100,
            min_score: 0.25,
            subject_classes: SubjectClass::defaults(),
        }
    }
}

/// What one tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Too soon after the previous detection.
    Throttled,
    /// A capture holds the loop, or the resume grace has not elapsed.
    Paused,
    /// The loop was stopped and will not detect again.
    Stopped,
    /// Camera access was refused; nothing runs until [`DetectionLoop::retry`].
    Denied,
    /// A detection cycle ran. Carries the track only when it is presentable.
    Cycle(Option<SmoothedDetection>),
}

/// Cooperative, rate-limited detection scheduler.
///
/// The host calls [`tick`](Self::tick) from its refresh callback with a
/// monotonic timestamp. The pause flag is checked before every detector
/// call, so once [`pause`](Self::pause) returns no further detection runs
/// until the loop is resumed.
pub struct DetectionLoop {
    config: LoopConfig,
    detector: Box<dyn Detector>,
    smoother: DetectionSmoother,
    logger: Box<dyn PipelineLogger>,
    last_detection: Option<Duration>,
    paused: bool,
    resume_at: Option<Duration>,
    denied: bool,
    active: bool,
}

impl DetectionLoop {
    pub fn new(
        config: LoopConfig,
        detector: Box<dyn Detector>,
        smoother: DetectionSmoother,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            config,
            detector,
            smoother,
            logger,
            last_detection: None,
            paused: false,
            resume_at: None,
            denied: false,
            active: true,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn smoother(&self) -> &DetectionSmoother {
        &self.smoother
    }

    /// Presentable track, if any.
    pub fn current(&self) -> Option<&SmoothedDetection> {
        self.smoother.presentable()
    }

    pub fn logger_mut(&mut self) -> &mut dyn PipelineLogger {
        self.logger.as_mut()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_denied(&self) -> bool {
        self.denied
    }

    /// Holds the loop until [`resume`](Self::resume) is called.
    pub fn pause(&mut self) {
        self.paused = true;
        self.resume_at = None;
    }

    /// Lets detection restart once the resume grace period has passed.
    pub fn resume(&mut self, now: Duration) {
        if self.paused {
            self.resume_at = Some(now + Duration::from_millis(self.config.resume_delay_ms));
        }
    }

    /// Halts detection after the frame source refused access. The track is
    /// dropped since the subject may be gone by the time access returns.
    pub fn deny(&mut self, reason: &str) {
        if !self.denied {
            log::error!("Camera access denied, halting detection: {reason}");
            self.logger.event("Camera access denied");
        }
        self.denied = true;
        self.paused = false;
        self.resume_at = None;
        self.smoother.reset();
    }

    /// Clears a denial so the next tick asks the frame source again.
    /// Returns `false` when there was nothing to retry or the loop is stopped.
    pub fn retry(&mut self) -> bool {
        if !self.active || !self.denied {
            return false;
        }
        self.denied = false;
        self.last_detection = None;
        self.smoother.reset();
        self.logger.event("Camera access retried");
        true
    }

    pub fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.logger.summary();
        }
    }

    pub fn tick(&mut self, now: Duration, source: &mut dyn FrameSource) -> TickOutcome {
        if !self.active {
            return TickOutcome::Stopped;
        }
        if self.denied {
            return TickOutcome::Denied;
        }
        if self.paused {
            match self.resume_at {
                Some(at) if now >= at => {
                    self.paused = false;
                    self.resume_at = None;
                }
                _ => return TickOutcome::Paused,
            }
        }
        if let Some(last) = self.last_detection {
            if now.saturating_sub(last) < Duration::from_millis(self.config.min_interval_ms) {
                return TickOutcome::Throttled;
            }
        }
        self.last_detection = Some(now);

        let candidate = match source.current_frame() {
            Ok(Some(frame)) => {
                let started = Instant::now();
                let result = self.detector.detect(&frame);
                self.logger
                    .timing("detect", started.elapsed().as_secs_f64() * 1000.0);
                match result {
                    Ok(detections) => select_candidate(&detections, &self.config),
                    Err(e) => {
                        log::warn!("Detection cycle failed: {e}");
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(FrameSourceError::PermissionDenied(msg)) => {
                self.deny(&msg);
                return TickOutcome::Denied;
            }
            Err(e) => {
                log::warn!("Frame unavailable: {e}");
                None
            }
        };

        let smoothed = self.smoother.update(candidate);
        self.logger.metric("stability", self.smoother.stability());
        self.logger.cycle();

        TickOutcome::Cycle(smoothed.filter(|d| self.smoother.is_presentable(d)))
    }
}

/// Highest-scoring detection of an allowed class above the score floor.
/// Ties keep the first one seen.
pub fn select_candidate(detections: &[RawDetection], config: &LoopConfig) -> Option<RawDetection> {
    let mut best: Option<&RawDetection> = None;
    for d in detections {
        let below_floor = d.score.is_nan() || d.score <= config.min_score;
        if below_floor || !config.subject_classes.contains(&d.class) {
            continue;
        }
        if best.map_or(true, |b| d.score > b.score) {
            best = Some(d);
        }
    }
    best.cloned()
}
