use serde::{Deserialize, Serialize};

use super::detector::RawDetection;
use crate::shared::bbox::BoundingBox;
use crate::shared::subject::SubjectClass;

/// Tuning for [`DetectionSmoother`].
///
/// These are empirical values for a ~150 ms detection cadence on 720p
/// frames, not physical constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    /// Max center-to-center distance (frame pixels) for a detection to
    /// continue the current track.
    pub proximity_threshold: f64,
    pub seed_stability: f64,
    pub max_stability: f64,
    /// Stability gained per consistent detection.
    pub growth_step: f64,
    /// Stability lost per cycle without a detection.
    pub miss_decay: f64,
    /// Stability lost when a detection jumps or changes class.
    pub jump_penalty: f64,
    pub base_smoothing: f64,
    pub smoothing_per_stability: f64,
    pub max_smoothing: f64,
    /// A track is drawn / actionable only while stability is strictly above this.
    pub presentation_threshold: f64,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 60.0,
            seed_stability: 7.0,
            max_stability: 15.0,
            growth_step: 2.0,
            miss_decay: 2.0,
            jump_penalty: 0.5,
            base_smoothing: 0.6,
            smoothing_per_stability: 0.02,
            max_smoothing: 0.85,
            presentation_threshold: 5.0,
        }
    }
}

impl SmootherConfig {
    /// Weight given to the previous box; grows with stability so settled
    /// tracks damp jitter harder.
    pub fn smoothing_factor(&self, stability: f64) -> f64 {
        (self.base_smoothing + stability * self.smoothing_per_stability).min(self.max_smoothing)
    }
}

/// Read-only snapshot of the tracked subject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmoothedDetection {
    pub class: SubjectClass,
    pub score: f64,
    pub bbox: BoundingBox,
    pub stability: f64,
}

/// Everything the smoother remembers between cycles.
///
/// Kept as a plain value so tests and hosts can inspect, persist across a
/// camera restart, or inject synthetic tracks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SmootherState {
    pub stability: f64,
    pub track: Option<SmoothedDetection>,
}

/// Adaptive exponential tracker with hysteresis over per-frame detections.
///
/// - Consistent detections (near the previous center, same class) raise
///   stability and are blended into the previous box with a weight that
///   increases with stability.
/// - Jumps or class changes cost a small penalty and snap the box.
/// - Missed cycles decay stability; the last box is held while stability
///   stays positive, and the track is dropped when it reaches zero.
pub struct DetectionSmoother {
    config: SmootherConfig,
    state: SmootherState,
}

impl DetectionSmoother {
    pub fn new(config: SmootherConfig) -> Self {
        Self::with_state(config, SmootherState::default())
    }

    pub fn with_state(config: SmootherConfig, state: SmootherState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    pub fn state(&self) -> &SmootherState {
        &self.state
    }

    pub fn into_state(self) -> SmootherState {
        self.state
    }

    pub fn stability(&self) -> f64 {
        self.state.stability
    }

    /// Current track, whether or not it is presentable.
    pub fn track(&self) -> Option<&SmoothedDetection> {
        self.state.track.as_ref()
    }

    pub fn is_presentable(&self, detection: &SmoothedDetection) -> bool {
        detection.stability > self.config.presentation_threshold
    }

    /// Current track if it is stable enough to draw or act on.
    pub fn presentable(&self) -> Option<&SmoothedDetection> {
        self.track().filter(|d| self.is_presentable(d))
    }

    pub fn reset(&mut self) {
        self.state = SmootherState::default();
    }

    /// Feeds one cycle's best detection (or `None` for a miss).
    ///
    /// The returned detection may be below the presentation threshold; use
    /// [`is_presentable`](Self::is_presentable) before drawing it.
    pub fn update(&mut self, raw: Option<RawDetection>) -> Option<SmoothedDetection> {
        match raw {
            None => self.on_miss(),
            Some(raw) => Some(self.on_detection(raw)),
        }
    }

    fn on_miss(&mut self) -> Option<SmoothedDetection> {
        let stability = (self.state.stability - self.config.miss_decay).max(0.0);
        self.state.stability = stability;

        if stability > 0.0 {
            if let Some(track) = self.state.track.as_mut() {
                track.stability = stability;
                return Some(track.clone());
            }
        }
        self.state.track = None;
        None
    }

    fn on_detection(&mut self, raw: RawDetection) -> SmoothedDetection {
        let cfg = &self.config;

        let (stability, bbox) = match self.state.track.as_ref() {
            None => (cfg.seed_stability, raw.bbox),
            Some(prev) => {
                let distance = prev.bbox.center_distance(&raw.bbox);
                if distance < cfg.proximity_threshold && raw.class == prev.class {
                    let stability = (self.state.stability + cfg.growth_step).min(cfg.max_stability);
                    let factor = cfg.smoothing_factor(stability);
                    (stability, BoundingBox::blend(&prev.bbox, &raw.bbox, factor))
                } else {
                    let stability = (self.state.stability - cfg.jump_penalty).max(0.0);
                    (stability, raw.bbox)
                }
            }
        };

        let detection = SmoothedDetection {
            class: raw.class,
            score: raw.score,
            bbox,
            stability,
        };
        self.state.stability = stability;
        self.state.track = Some(detection.clone());
        detection
    }
}

impl Default for DetectionSmoother {
    fn default() -> Self {
        Self::new(SmootherConfig::default())
    }
}
