use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum FrameSourceError {
    /// Camera access was refused; the capture pipeline stays down until the
    /// user grants access and the host rebuilds the source.
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    #[error("frame source unavailable: {0}")]
    Unavailable(String),
}

/// Exposes the live frame at call time.
///
/// Returning `Ok(None)` means the stream has ended; consumers treat that
/// as "nothing to detect / nothing to capture" rather than waiting.
pub trait FrameSource: Send {
    fn current_frame(&mut self) -> Result<Option<Frame>, FrameSourceError>;
}
