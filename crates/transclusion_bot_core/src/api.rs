use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parameter list for a single MediaWiki API call. Empty values are dropped
/// by the client before sending.
pub type ApiParams<'a> = [(&'a str, String)];

/// Capability to talk to an (optionally authenticated) MediaWiki API.
///
/// `Err` means the request never produced a JSON payload (transport, HTTP
/// status, undecodable body). API-level `error` objects come back as `Ok`
/// payloads and are classified with [`decode`].
pub trait WikiSession {
    fn query(&self, params: &ApiParams<'_>) -> anyhow::Result<Value>;
    fn edit(&self, params: &ApiParams<'_>) -> anyhow::Result<Value>;
    fn request_count(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The server answered with an `error` object.
    Api { code: String },
    /// The payload did not have the shape expected at this call site.
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failure { kind: FailureKind, message: String },
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> anyhow::Result<T> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure {
                kind: FailureKind::Api { code },
                message,
            } => anyhow::bail!("MediaWiki API error [{code}]: {message}"),
            Self::Failure {
                kind: FailureKind::Malformed,
                message,
            } => anyhow::bail!("malformed MediaWiki API response: {message}"),
        }
    }
}

pub fn decode<T: DeserializeOwned>(payload: Value) -> ApiResponse<T> {
    if let Some(error) = payload.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        let message = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("unknown info")
            .to_string();
        return ApiResponse::Failure {
            kind: FailureKind::Api { code },
            message,
        };
    }

    match serde_json::from_value(payload) {
        Ok(data) => ApiResponse::Success(data),
        Err(error) => ApiResponse::Failure {
            kind: FailureKind::Malformed,
            message: error.to_string(),
        },
    }
}
