use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::domain::frame_source::{FrameSource, FrameSourceError};
use crate::capture::domain::image_payload::ImagePayload;
use crate::detection::domain::face_region::CaptureRegion;
use crate::shared::bbox::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("no frame available: the camera stream has ended")]
    FrameUnavailable,
    #[error(transparent)]
    Source(#[from] FrameSourceError),
    #[error("capture region is empty")]
    EmptyRegion,
    #[error("capture region lies outside the {width}x{height} frame")]
    RegionOutsideFrame { width: u32, height: u32 },
    #[error("unsupported frame layout: {0} channels")]
    UnsupportedFrame(u8),
    #[error("frame buffer holds {actual} bytes, dimensions need {expected}")]
    MalformedFrame { expected: usize, actual: usize },
    #[error("failed to encode capture: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Share of an uncropped subject box (from the top) kept as the face.
    pub body_face_fraction: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_width: 300,
            max_height: 300,
            jpeg_quality: 80,
            body_face_fraction: 0.6,
        }
    }
}

/// Crops a region out of the current frame and encodes it as a JPEG data URI.
pub struct CaptureEncoder {
    config: CaptureConfig,
}

impl CaptureEncoder {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Captures an already face-cropped region.
    pub fn capture(
        &self,
        source: &mut dyn FrameSource,
        region: &CaptureRegion,
    ) -> Result<ImagePayload, EncodingError> {
        if region.is_empty() {
            return Err(EncodingError::EmptyRegion);
        }
        let frame = source
            .current_frame()?
            .ok_or(EncodingError::FrameUnavailable)?;
        self.encode_region(&frame, region)
    }

    /// Captures the upper part of an uncropped subject box.
    pub fn capture_body(
        &self,
        source: &mut dyn FrameSource,
        bbox: &BoundingBox,
    ) -> Result<ImagePayload, EncodingError> {
        let region = CaptureRegion::from_bbox(bbox).upper(self.config.body_face_fraction);
        self.capture(source, &region)
    }

    pub fn encode_region(
        &self,
        frame: &Frame,
        region: &CaptureRegion,
    ) -> Result<ImagePayload, EncodingError> {
        if region.is_empty() {
            return Err(EncodingError::EmptyRegion);
        }
        check_layout(frame)?;
        let rect = region
            .to_pixel_rect(frame.width(), frame.height())
            .ok_or(EncodingError::RegionOutsideFrame {
                width: frame.width(),
                height: frame.height(),
            })?;
        let face = frame.crop(&rect).ok_or(EncodingError::MalformedFrame {
            expected: frame.expected_len(),
            actual: frame.data().len(),
        })?;
        self.encode_frame(&face)
    }

    /// Downscales (if needed) and encodes a whole frame.
    pub fn encode_frame(&self, frame: &Frame) -> Result<ImagePayload, EncodingError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(EncodingError::EmptyRegion);
        }
        check_layout(frame)?;
        let img = frame
            .to_rgb_image()
            .ok_or(EncodingError::UnsupportedFrame(frame.channels()))?;

        let (w, h) = fit_within(
            frame.width(),
            frame.height(),
            self.config.max_width,
            self.config.max_height,
        );
        let img = if (w, h) == img.dimensions() {
            img
        } else {
            image::imageops::resize(&img, w, h, FilterType::Triangle)
        };

        let mut bytes = Vec::new();
        let quality = self.config.jpeg_quality.clamp(1, 100);
        JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(&img)?;

        Ok(ImagePayload {
            data_uri: format!("data:image/jpeg;base64,{}", STANDARD.encode(&bytes)),
            width: w,
            height: h,
            captured_at: Utc::now(),
        })
    }
}

impl Default for CaptureEncoder {
    fn default() -> Self {
        Self::new(CaptureConfig::default())
    }
}

fn check_layout(frame: &Frame) -> Result<(), EncodingError> {
    if frame.is_well_formed() {
        Ok(())
    } else {
        Err(EncodingError::MalformedFrame {
            expected: frame.expected_len(),
            actual: frame.data().len(),
        })
    }
}

/// Largest size with the same aspect ratio that fits `max_w` x `max_h`.
/// Never upscales and never returns a zero dimension.
fn fit_within(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let scale = (max_w as f64 / w as f64)
        .min(max_h as f64 / h as f64)
        .min(1.0);
    if scale >= 1.0 {
        return (w, h);
    }
    let fw = ((w as f64 * scale).round() as u32).max(1);
    let fh = ((h as f64 * scale).round() as u32).max(1);
    (fw, fh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct StubSource {
        frame: Option<Frame>,
    }

    impl FrameSource for StubSource {
        fn current_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
            Ok(self.frame.clone())
        }
    }

    struct DeniedSource;

    impl FrameSource for DeniedSource {
        fn current_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
            Err(FrameSourceError::PermissionDenied("user declined".to_string()))
        }
    }

    fn solid_frame(width: u32, height: u32) -> Frame {
        let data = [40u8, 160, 90].repeat((width * height) as usize);
        Frame::new(data, width, height, 3, 0)
    }

    fn source(width: u32, height: u32) -> StubSource {
        StubSource {
            frame: Some(solid_frame(width, height)),
        }
    }

    fn region(x: f64, y: f64, width: f64, height: f64) -> CaptureRegion {
        CaptureRegion {
            x,
            y,
            width,
            height,
        }
    }

    fn decode(payload: &ImagePayload) -> image::DynamicImage {
        let b64 = payload
            .data_uri
            .strip_prefix("data:image/jpeg;base64,")
            .unwrap();
        let bytes = STANDARD.decode(b64).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_capture_produces_jpeg_data_uri() {
        let encoder = CaptureEncoder::default();
        let payload = encoder
            .capture(&mut source(640, 480), &region(100.0, 50.0, 120.0, 90.0))
            .unwrap();
        assert!(payload.data_uri.starts_with("data:image/jpeg;base64,"));
        assert_eq!((payload.width, payload.height), (120, 90));

        let img = decode(&payload);
        assert_eq!((img.width(), img.height()), (120, 90));
    }

    #[test]
    fn test_large_region_is_downscaled_preserving_aspect() {
        let encoder = CaptureEncoder::default();
        let payload = encoder
            .capture(&mut source(1280, 720), &region(0.0, 0.0, 600.0, 360.0))
            .unwrap();
        assert_eq!((payload.width, payload.height), (300, 180));
    }

    #[test]
    fn test_capture_body_keeps_upper_sixty_percent() {
        let encoder = CaptureEncoder::default();
        let bbox = BoundingBox::new(0.0, 0.0, 300.0, 300.0);
        let payload = encoder.capture_body(&mut source(640, 480), &bbox).unwrap();
        assert_eq!((payload.width, payload.height), (300, 180));
    }

    #[test]
    fn test_region_is_clamped_to_frame() {
        let encoder = CaptureEncoder::default();
        let payload = encoder
            .capture(&mut source(200, 100), &region(150.0, 60.0, 100.0, 100.0))
            .unwrap();
        assert_eq!((payload.width, payload.height), (50, 40));
    }

    #[test]
    fn test_empty_region_fails() {
        let encoder = CaptureEncoder::default();
        let err = encoder
            .capture(&mut source(200, 100), &region(10.0, 10.0, 0.0, 20.0))
            .unwrap_err();
        assert!(matches!(err, EncodingError::EmptyRegion));
    }

    #[test]
    fn test_region_outside_frame_fails() {
        let encoder = CaptureEncoder::default();
        let err = encoder
            .capture(&mut source(200, 100), &region(500.0, 10.0, 50.0, 20.0))
            .unwrap_err();
        assert!(matches!(
            err,
            EncodingError::RegionOutsideFrame {
                width: 200,
                height: 100
            }
        ));
    }

    #[test]
    fn test_ended_stream_fails() {
        let encoder = CaptureEncoder::default();
        let mut ended = StubSource { frame: None };
        let err = encoder
            .capture(&mut ended, &region(0.0, 0.0, 10.0, 10.0))
            .unwrap_err();
        assert!(matches!(err, EncodingError::FrameUnavailable));
    }

    #[test]
    fn test_permission_error_is_surfaced() {
        let encoder = CaptureEncoder::default();
        let err = encoder
            .capture(&mut DeniedSource, &region(0.0, 0.0, 10.0, 10.0))
            .unwrap_err();
        assert!(matches!(
            err,
            EncodingError::Source(FrameSourceError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_short_buffer_is_an_error_not_a_panic() {
        let encoder = CaptureEncoder::default();
        let frame = Frame::new(vec![0u8; 100], 200, 200, 3, 0);
        let region = CaptureRegion {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 50.0,
        };
        assert!(matches!(
            encoder.encode_region(&frame, &region).unwrap_err(),
            EncodingError::MalformedFrame {
                expected: 120_000,
                actual: 100
            }
        ));
        assert!(matches!(
            encoder.encode_frame(&frame).unwrap_err(),
            EncodingError::MalformedFrame { .. }
        ));
    }

    #[test]
    fn test_grayscale_frame_is_unsupported() {
        let encoder = CaptureEncoder::default();
        let frame = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        let err = encoder.encode_frame(&frame).unwrap_err();
        assert!(matches!(err, EncodingError::UnsupportedFrame(1)));
    }

    #[test]
    fn test_lower_quality_produces_smaller_payload() {
        let mut data = Vec::new();
        for i in 0..(200 * 200) {
            data.extend_from_slice(&[(i % 251) as u8, (i % 13 * 19) as u8, (i % 7 * 31) as u8]);
        }
        let frame = Frame::new(data, 200, 200, 3, 0);
        let high = CaptureEncoder::new(CaptureConfig {
            jpeg_quality: 95,
            ..CaptureConfig::default()
        });
        let low = CaptureEncoder::new(CaptureConfig {
            jpeg_quality: 20,
            ..CaptureConfig::default()
        });
        let high = high.encode_frame(&frame).unwrap();
        let low = low.encode_frame(&frame).unwrap();
        assert!(low.data_uri.len() < high.data_uri.len());
    }

    #[rstest]
    #[case::fits(100, 80, (100, 80))]
    #[case::wide(600, 360, (300, 180))]
    #[case::tall(200, 900, (67, 300))]
    #[case::sliver(3000, 2, (300, 1))]
    fn test_fit_within(#[case] w: u32, #[case] h: u32, #[case] expected: (u32, u32)) {
        assert_eq!(fit_within(w, h, 300, 300), expected);
    }
}
