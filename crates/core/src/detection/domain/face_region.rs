use crate::shared::bbox::BoundingBox;
use crate::shared::frame::PixelRect;
use crate::shared::subject::SubjectClass;

/// Sub-rectangle of a detection box assumed to contain the face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Proportions of a subject box occupied by the face: (width, height, top offset).
struct FaceProportions {
    width: f64,
    height: f64,
    top: f64,
}

const PERSON_FACE: FaceProportions = FaceProportions {
    width: 0.7,
    height: 0.4,
    top: 0.1,
};

/// Quadruped heads take a larger share of the body box at typical angles.
const ANIMAL_FACE: FaceProportions = FaceProportions {
    width: 0.6,
    height: 0.5,
    top: 0.15,
};

/// Maps a subject box to the horizontally centered face area in its upper part.
pub fn derive_face_region(bbox: &BoundingBox, subject: &SubjectClass) -> CaptureRegion {
    let p = match subject {
        SubjectClass::Person => &PERSON_FACE,
        SubjectClass::Dog | SubjectClass::Cat | SubjectClass::Other(_) => &ANIMAL_FACE,
    };
    let width = bbox.width * p.width;
    let height = bbox.height * p.height;
    CaptureRegion {
        x: bbox.x + (bbox.width - width) / 2.0,
        y: bbox.y + bbox.height * p.top,
        width,
        height,
    }
}

impl CaptureRegion {
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            x: bbox.x,
            y: bbox.y,
            width: bbox.width,
            height: bbox.height,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Keeps only the top `fraction` of the region's height.
    pub fn upper(&self, fraction: f64) -> CaptureRegion {
        CaptureRegion {
            height: self.height * fraction.clamp(0.0, 1.0),
            ..*self
        }
    }

    /// Rounds to whole pixels and clamps to the frame.
    ///
    /// Returns `None` when nothing of the region is inside the frame.
    pub fn to_pixel_rect(&self, frame_w: u32, frame_h: u32) -> Option<PixelRect> {
        if self.is_empty() || !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }
        let x1 = self.x.round().max(0.0);
        let y1 = self.y.round().max(0.0);
        let x2 = (self.x + self.width).round().min(frame_w as f64);
        let y2 = (self.y + self.height).round().min(frame_h as f64);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(PixelRect {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}
