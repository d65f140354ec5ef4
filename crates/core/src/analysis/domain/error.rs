use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Network failure or non-2xx reply. `status` is `None` when no HTTP
    /// response was received at all.
    #[error("classifier request failed{}: {message}", status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Transport { status: Option<u16>, message: String },
    /// The reply parsed but lacks a usable `mood` or `confidence`.
    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),
    /// The reply is not the expected JSON object at all.
    #[error("malformed classifier payload: {0}")]
    MalformedPayload(String),
}

impl AnalysisError {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        AnalysisError::Transport {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        AnalysisError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_includes_status_when_known() {
        let err = AnalysisError::transport(Some(502), "bad gateway");
        assert_eq!(
            err.to_string(),
            "classifier request failed with status 502: bad gateway"
        );
        let err = AnalysisError::transport(None, "connection refused");
        assert_eq!(
            err.to_string(),
            "classifier request failed: connection refused"
        );
    }
}
