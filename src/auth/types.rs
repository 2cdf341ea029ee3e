// Authentication wire types

use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/sessions`
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub provider: &'a str,
}

/// Successful login response. Only `sessionId` is read; other fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_login_request() {
        let request = LoginRequest {
            username: "admin",
            password: "secret",
            provider: "Local",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"username": "admin", "password": "secret", "provider": "Local"})
        );
    }

    #[test]
    fn test_deserialize_login_response() {
        let json = r#"{"userId":"012345","sessionId":"abc123","ttl":1800}"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.session_id, "abc123");

        let resp: LoginResponse = serde_json::from_str(r#"{"sessionId":"only"}"#).unwrap();
        assert_eq!(resp.session_id, "only");
    }

    #[test]
    fn test_deserialize_login_response_ignores_other_field_types() {
        let json = r#"{"userId":42,"sessionId":"abc123","ttl":"1800"}"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.session_id, "abc123");
    }

    #[test]
    fn test_deserialize_login_response_missing_session() {
        assert!(serde_json::from_str::<LoginResponse>(r#"{"errorMessage":"nope"}"#).is_err());
    }
}
