use thiserror::Error;

/// Failure classes of the bilibili client.
///
/// `Api` carries the platform's numeric status code so callers can apply
/// per-code policy (`-352` risk control, `-799` rate limit) without string
/// matching.
#[derive(Debug, Error)]
pub enum BiliError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("bilibili api error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("wbi signing unavailable: {0}")]
    Signing(String),

    #[error("unexpected response payload: {0}")]
    Payload(String),
}

impl BiliError {
    /// The platform status code, when this is an API-level rejection.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            BiliError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Check the top-level status code of a JSON envelope. Zero or absent means
/// success; anything else is an API error carrying code and message.
pub fn raise_for_code(payload: &serde_json::Value) -> Result<(), BiliError> {
    if !payload.is_object() {
        return Err(BiliError::Payload(format!(
            "expected a JSON object, got: {payload}"
        )));
    }
    match payload.get("code").and_then(|c| c.as_i64()) {
        None | Some(0) => Ok(()),
        Some(code) => {
            let message = payload
                .get("message")
                .or_else(|| payload.get("msg"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            Err(BiliError::Api { code, message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_or_missing_code_is_success() {
        assert!(raise_for_code(&json!({ "code": 0, "data": {} })).is_ok());
        assert!(raise_for_code(&json!({ "data": {} })).is_ok());
    }

    #[test]
    fn nonzero_code_carries_code_and_message() {
        let err = raise_for_code(&json!({ "code": -352, "message": "risk control" }))
            .expect_err("should be an error");
        assert_eq!(err.api_code(), Some(-352));
        assert!(err.to_string().contains("risk control"));

        let err = raise_for_code(&json!({ "code": -799, "msg": "too fast" }))
            .expect_err("should be an error");
        assert_eq!(err.api_code(), Some(-799));
    }

    #[test]
    fn non_object_payload_is_a_payload_error() {
        assert!(matches!(
            raise_for_code(&json!([1, 2, 3])),
            Err(BiliError::Payload(_))
        ));
    }
}
