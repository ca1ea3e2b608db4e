use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RemoteEndpoint;

pub const TRENDING_TOPICS_FUNCTION: &str = "trending-topics";

/// Outcome of a remote function call. Exactly one side is set.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> FunctionResponse<T> {
    fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (Some(data), None) => Ok(data),
            (None, None) => Err("function returned no data".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct FunctionInvoker {
    client: reqwest::Client,
    endpoint: RemoteEndpoint,
}

impl FunctionInvoker {
    pub fn new(client: reqwest::Client, endpoint: RemoteEndpoint) -> Self {
        Self { client, endpoint }
    }

    /// POSTs `body` (or `{}`) to the named function. Transport, status and
    /// decode failures all come back in `error`; this never returns early
    /// through a panic or an `Err`.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        name: &str,
        body: Option<&Value>,
    ) -> FunctionResponse<T> {
        if !is_valid_function_name(name) {
            warn!(function = name, "refusing to invoke function with malformed name");
            return FunctionResponse::failure(format!("invalid function name: {name:?}"));
        }

        let url = format!("{}/functions/v1/{name}", self.endpoint.base_url);
        let payload = body.cloned().unwrap_or_else(|| Value::Object(Default::default()));
        debug!(function = name, %url, "invoking remote function");

        let response = match self
            .client
            .post(&url)
            .bearer_auth(&self.endpoint.anon_key)
            .header("apikey", &self.endpoint.anon_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(function = name, %error, "function request failed");
                return FunctionResponse::failure(error.to_string());
            }
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(function = name, %error, "failed to read function response");
                return FunctionResponse::failure(error.to_string());
            }
        };

        if !status.is_success() {
            let message = error_message(&bytes).unwrap_or_else(|| {
                format!("function {name} failed with status {}", status.as_u16())
            });
            warn!(function = name, status = status.as_u16(), %message, "function returned an error");
            return FunctionResponse::failure(message);
        }

        match serde_json::from_slice::<T>(&bytes) {
            Ok(data) => FunctionResponse::success(data),
            Err(error) => {
                warn!(function = name, %error, "function response did not decode");
                FunctionResponse::failure(format!("invalid response from function {name}: {error}"))
            }
        }
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.error? {
        Value::String(message) if !message.trim().is_empty() => Some(message),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        _ => None,
    }
}

fn is_valid_function_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}
