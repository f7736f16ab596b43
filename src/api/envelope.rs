use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::models::lenient;
use crate::error::{ConsoleError, Result};

/// Decoded `{"success": ..., ...}` response body.
///
/// The endpoints are not consistent about where they put their payload:
/// lists show up as a bare array, under `data`, under `items`, or under a
/// resource-specific key (`queues`, `statuses`, ...), sometimes nested one
/// level inside `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    body: Value,
}

impl Envelope {
    /// Accepts the body when `success` is truthy or absent; otherwise turns
    /// the server's `error`/`message` into [`ConsoleError::Api`].
    pub fn parse(body: Value) -> Result<Self> {
        if let Some(flag) = body.get("success") {
            if !lenient::truthy(flag) {
                return Err(ConsoleError::Api(
                    error_message(&body).unwrap_or_else(|| "Request failed".into()),
                ));
            }
        }
        Ok(Self { body })
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Optional human readable `message` that accompanies a success.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// The array carrying the response's list, looked up under `data`,
    /// `items`, then each of `keys`.
    pub fn items(&self, keys: &[&str]) -> Vec<Value> {
        self.find_list(keys).unwrap_or_default()
    }

    /// Like [`items`](Self::items) but tells an empty list apart from a
    /// response that carries none.
    pub fn find_list(&self, keys: &[&str]) -> Option<Vec<Value>> {
        if let Some(arr) = self.body.as_array() {
            return Some(arr.clone());
        }
        let mut candidates = vec!["data", "items"];
        candidates.extend_from_slice(keys);
        for scope in [Some(&self.body), self.body.get("data")].into_iter().flatten() {
            for key in &candidates {
                if let Some(arr) = scope.get(*key).and_then(Value::as_array) {
                    return Some(arr.clone());
                }
            }
        }
        None
    }

    /// Decodes the list item by item; rows that do not fit `T` are skipped.
    pub fn list<T: DeserializeOwned>(&self, keys: &[&str]) -> Vec<T> {
        self.items(keys)
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<T>(item) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("skipping undecodable row: {e}");
                    None
                }
            })
            .collect()
    }

    /// A single object payload: the first of `keys` or `data` that holds an
    /// object, or the envelope itself with `success`/`message` stripped.
    pub fn object(&self, keys: &[&str]) -> Value {
        for key in keys.iter().chain(["data"].iter()) {
            if let Some(obj) = self.body.get(*key).filter(|v| v.is_object()) {
                return obj.clone();
            }
        }
        let mut body = self.body.clone();
        if let Some(map) = body.as_object_mut() {
            map.remove("success");
            map.remove("message");
        }
        body
    }

    pub fn decode<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<T> {
        Ok(serde_json::from_value(self.object(keys))?)
    }
}

/// `error`, then `message`, from a failure body.
pub fn error_message(body: &Value) -> Option<String> {
    ["error", "message"].iter().find_map(|key| match body.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Object(obj)) => obj.get("message").and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}
