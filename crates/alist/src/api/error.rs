use common::{FsError, Retryable};
use reqwest::StatusCode;

/// Envelope code meaning the request succeeded
pub const CODE_OK: i64 = 200;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("{message} (Error {code})")]
    Api { code: i64, message: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("response carried no data")]
    MissingData,
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        ApiError::Api {
            code,
            message: message.into(),
        }
    }

    /// Envelope code, when the server answered with a JSON error
    pub fn api_code(&self) -> Option<i64> {
        match self {
            ApiError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            ApiError::HttpStatus(status, _) => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Envelope 404, HTTP 404, or a "not found" message from the backend
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::Api { code, message } => {
                *code == 404 || message.to_lowercase().contains("not found")
            }
            ApiError::HttpStatus(status, _) => *status == StatusCode::NOT_FOUND,
            _ => false,
        }
    }

    /// Attach the path being operated on and classify for the planner
    pub fn into_fs_error(self, path: &str) -> FsError {
        if matches!(self, ApiError::Cancelled) {
            return FsError::Cancelled;
        }
        if self.is_not_found() {
            return FsError::NotFound(path.to_string());
        }
        if self.is_retryable() {
            return FsError::Transient {
                path: path.to_string(),
                status: self.http_status().map(|s| s.as_u16()),
                message: self.to_string(),
            };
        }
        match self {
            ApiError::Api { code, message } => {
                FsError::fatal(path, u16::try_from(code).ok(), message)
            }
            ApiError::HttpStatus(status, body) => {
                FsError::fatal(path, Some(status.as_u16()), body)
            }
            other => FsError::fatal(path, None, other.to_string()),
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED
            | StatusCode::REQUEST_TIMEOUT
            | StatusCode::LOCKED
            | StatusCode::TOO_MANY_REQUESTS
    ) || status.is_server_error()
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(e) => match e.status() {
                Some(status) => is_retryable_status(status),
                None => !e.is_builder() && !e.is_decode() && !e.is_redirect(),
            },
            ApiError::HttpStatus(status, _) => is_retryable_status(*status),
            _ => false,
        }
    }

    fn cancelled() -> Self {
        ApiError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for code in [401u16, 408, 423, 429, 500, 502, 503, 504, 507] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(ApiError::HttpStatus(status, String::new()).is_retryable(), "{code}");
        }
        for code in [400u16, 403, 404, 405, 409] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(!ApiError::HttpStatus(status, String::new()).is_retryable(), "{code}");
        }
    }

    #[test]
    fn test_envelope_errors_are_terminal() {
        assert!(!ApiError::api(500, "storage driver failed").is_retryable());
        assert!(!ApiError::Cancelled.is_retryable());
    }

    #[test]
    fn test_not_found_detection() {
        assert!(ApiError::api(404, "").is_not_found());
        assert!(ApiError::api(500, "object not found").is_not_found());
        assert!(ApiError::api(500, "Object Not Found").is_not_found());
        assert!(ApiError::HttpStatus(StatusCode::NOT_FOUND, String::new()).is_not_found());
        assert!(!ApiError::api(403, "exists").is_not_found());
    }

    #[test]
    fn test_into_fs_error() {
        let err = ApiError::api(404, "missing").into_fs_error("/a");
        assert!(matches!(err, FsError::NotFound(p) if p == "/a"));

        let err = ApiError::HttpStatus(StatusCode::BAD_GATEWAY, "upstream".into()).into_fs_error("/a");
        assert!(matches!(err, FsError::Transient { status: Some(502), .. }));

        let err = ApiError::api(403, "permission denied").into_fs_error("/a/b");
        assert_eq!(err.to_string(), "/a/b: permission denied (code 403)");

        assert!(matches!(ApiError::Cancelled.into_fs_error("/a"), FsError::Cancelled));
    }
}
