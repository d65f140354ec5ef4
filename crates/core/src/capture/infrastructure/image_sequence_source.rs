use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::{FrameSource, FrameSourceError};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// A directory of still images played back as a camera stream.
///
/// Files are ordered by name. The cursor only moves on [`advance`] or
/// [`seek`], so repeated `current_frame` calls observe the same frame the
/// way a live video element exposes its current picture.
///
/// [`advance`]: ImageSequenceSource::advance
/// [`seek`]: ImageSequenceSource::seek
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    position: usize,
    cached: Option<Frame>,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, FrameSourceError> {
        let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                FrameSourceError::PermissionDenied(format!("{}: {e}", dir.display()))
            }
            _ => FrameSourceError::Unavailable(format!("{}: {e}", dir.display())),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(FrameSourceError::Unavailable(format!(
                "no images found in {}",
                dir.display()
            )));
        }
        log::debug!("Opened {} frames from {}", paths.len(), dir.display());

        Ok(Self {
            paths,
            position: 0,
            cached: None,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.paths.len()
    }

    /// Moves to the next frame. Past the last file the stream has ended.
    pub fn advance(&mut self) {
        if self.position < self.paths.len() {
            self.position += 1;
            self.cached = None;
        }
    }

    pub fn seek(&mut self, index: usize) {
        let index = index.min(self.paths.len());
        if index != self.position {
            self.position = index;
            self.cached = None;
        }
    }

    fn load(&self, index: usize) -> Result<Frame, FrameSourceError> {
        let path = &self.paths[index];
        let img = image::open(path)
            .map_err(|e| FrameSourceError::Unavailable(format!("{}: {e}", path.display())))?;
        Ok(Frame::from_rgb_image(img.to_rgb8(), index))
    }
}

impl FrameSource for ImageSequenceSource {
    fn current_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        if self.is_finished() {
            return Ok(None);
        }
        if self.cached.is_none() {
            self.cached = Some(self.load(self.position)?);
        }
        Ok(self.cached.clone())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
