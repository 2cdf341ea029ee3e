// Error handling module
// Defines the error taxonomy surfaced by the transport

use thiserror::Error;

use crate::response::ResponseRecord;

/// Errors that can occur while talking to the Log Insight API
#[derive(Error, Debug)]
pub enum ClientError {
    /// Login was required but no username/password is configured
    #[error("Cannot authenticate without username/password")]
    MissingCredentials,

    /// Login did not yield a session, or the re-authorized request was rejected again
    #[error("Authentication failed: {reason} (status {})", .response.status)]
    AuthenticationFailed {
        reason: String,
        response: Box<ResponseRecord>,
    },

    /// Connectivity, TLS or timeout error from the HTTP client
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub(crate) fn authentication_failed(reason: impl Into<String>, response: ResponseRecord) -> Self {
        ClientError::AuthenticationFailed {
            reason: reason.into(),
            response: Box::new(response),
        }
    }

    /// The drained response that triggered an authentication failure, if any
    pub fn response(&self) -> Option<&ResponseRecord> {
        match self {
            ClientError::AuthenticationFailed { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::header::HeaderMap;
    use reqwest::{StatusCode, Url};

    fn record(status: u16) -> ResponseRecord {
        ResponseRecord {
            status: StatusCode::from_u16(status).unwrap(),
            url: Url::parse("https://li.example.com:9543/api/v1/sessions").unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{}"),
        }
    }

    #[test]
    fn test_error_messages() {
        let err = ClientError::MissingCredentials;
        assert_eq!(err.to_string(), "Cannot authenticate without username/password");

        let err = ClientError::authentication_failed("no sessionId in login response", record(200));
        assert_eq!(
            err.to_string(),
            "Authentication failed: no sessionId in login response (status 200 OK)"
        );

        let err = ClientError::InvalidRequest("bad url".to_string());
        assert_eq!(err.to_string(), "Invalid request: bad url");
    }

    #[test]
    fn test_response_accessor() {
        let err = ClientError::authentication_failed("rejected", record(440));
        assert_eq!(err.response().map(|r| r.status.as_u16()), Some(440));
        assert!(ClientError::MissingCredentials.response().is_none());
    }
}
