use chrono::{DateTime, Utc};

use crate::feedback::domain::fingerprint::content_fingerprint;

/// Encoded face crop ready for transport.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePayload {
    /// `data:image/jpeg;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl ImagePayload {
    /// Wraps an already encoded data URI whose pixel size is unknown (0x0).
    pub fn from_data_uri(data_uri: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            data_uri: data_uri.into(),
            width: 0,
            height: 0,
            captured_at,
        }
    }

    /// Non-cryptographic hash of the data URI, sent with feedback in place
    /// of the image itself.
    pub fn fingerprint(&self) -> String {
        content_fingerprint(&self.data_uri)
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
    }
}
