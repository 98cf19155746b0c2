// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API Gateway proxy-style responses.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Response returned for every invocation.
///
/// Serializes with the proxy integration field names (`statusCode`,
/// `isBase64Encoded`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// JSON-encoded body
    pub body: String,
    pub is_base64_encoded: bool,
}

impl ApiResponse {
    fn json(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            headers: BTreeMap::from([("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string())]),
            body: json!({ "message": message }).to_string(),
            is_base64_encoded: false,
        }
    }

    /// 200 carrying the database server time.
    pub fn ok(timestamp: &str) -> Self {
        Self::json(200, &format!("DB Response: {}", timestamp))
    }

    /// Generic 500. Carries no detail about the failure.
    pub fn internal_error() -> Self {
        Self::json(500, "Internal Server Error")
    }

    /// The `message` field of the body, if the body is a JSON object.
    pub fn message(&self) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response_shape() {
        let response = ApiResponse::ok("2024-01-01T00:00:00Z");

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "statusCode": 200,
                "headers": {"Content-Type": "application/json"},
                "body": "{\"message\":\"DB Response: 2024-01-01T00:00:00Z\"}",
                "isBase64Encoded": false
            })
        );
    }

    #[test]
    fn test_internal_error_is_generic() {
        let response = ApiResponse::internal_error();

        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, r#"{"message":"Internal Server Error"}"#);
        assert_eq!(response.message().as_deref(), Some("Internal Server Error"));
    }
}
