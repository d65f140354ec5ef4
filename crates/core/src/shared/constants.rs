/// Session marker used when the caller supplies no session id.
pub const ANONYMOUS_SESSION: &str = "anonymous";

/// Version tag of the classification prompt, echoed in analyze responses.
pub const PROMPT_VERSION: &str = "2.0";

pub const ANALYZE_PATH: &str = "/api/analyze";
pub const FEEDBACK_PATH: &str = "/api/feedback";

pub const DEFAULT_ENDPOINT_BASE: &str = "http://localhost:3000";

/// Round-trip ceiling for classifier requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Generates a fresh session id of the form `session_<uuid>`.
pub fn new_session_id() -> String {
    format!("session_{}", uuid::Uuid::new_v4().simple())
}
