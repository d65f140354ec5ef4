use serde::{Deserialize, Serialize};

use crate::shared::bbox::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::subject::SubjectClass;

/// One detector output for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class: SubjectClass,
    pub score: f64,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(class: SubjectClass, score: f64, bbox: BoundingBox) -> Self {
        Self { class, score, bbox }
    }
}

/// Object-detection capability consumed by the detection loop.
///
/// Implementations may be stateful (model sessions, replay cursors), hence
/// `&mut self`. Output order is irrelevant.
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>>;
}
