// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Database connection secret payload.
//!
//! A payload is validated as a whole before any field is used: every required
//! key must be present and non-empty, and `port` must coerce to a TCP port.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Key holding the cluster endpoint host.
pub const FIELD_HOST: &str = "host";
/// Key holding the cluster endpoint port.
pub const FIELD_PORT: &str = "port";
/// Key holding the database user name.
pub const FIELD_USERNAME: &str = "username";
/// Key holding the database password.
pub const FIELD_PASSWORD: &str = "password";
/// Key holding the database name.
pub const FIELD_DBNAME: &str = "dbname";

/// Required keys, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 5] = [
    FIELD_HOST,
    FIELD_PORT,
    FIELD_USERNAME,
    FIELD_PASSWORD,
    FIELD_DBNAME,
];

/// Errors raised while validating a secret payload.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PayloadError {
    /// The payload is not parseable JSON.
    #[error("secret payload is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The payload parsed but is not a JSON object.
    #[error("secret payload is not a JSON object")]
    NotAnObject,

    /// A required key is absent, null, or empty.
    #[error("secret payload is missing required field '{0}'")]
    MissingField(&'static str),

    /// A key is present but its value cannot be used.
    #[error("secret payload field '{field}' is invalid: {reason}")]
    InvalidField {
        /// The offending key.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl PayloadError {
    /// The field this error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField(field) | Self::InvalidField { field, .. } => Some(*field),
            Self::Malformed(_) | Self::NotAnObject => None,
        }
    }
}

/// Validated database connection credentials.
///
/// Instances only exist after every required field has been checked, so
/// holders never need to re-validate.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretPayload {
    /// Cluster endpoint host.
    pub host: String,
    /// Cluster endpoint port.
    pub port: u16,
    /// Database user name.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub dbname: String,
}

impl SecretPayload {
    /// Parse and validate a serialized secret with no database name fallback.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        Self::parse_with_fallback(raw, None)
    }

    /// Parse and validate a serialized secret.
    ///
    /// When `default_dbname` is `Some`, a missing `dbname` resolves to it
    /// instead of failing. Every other key is strictly required.
    pub fn parse_with_fallback(
        raw: &str,
        default_dbname: Option<&str>,
    ) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_str(raw).map_err(PayloadError::Malformed)?;
        let object = value.as_object().ok_or(PayloadError::NotAnObject)?;
        Self::from_object(object, default_dbname)
    }

    /// Validate an already-parsed JSON object.
    pub fn from_object(
        object: &Map<String, Value>,
        default_dbname: Option<&str>,
    ) -> Result<Self, PayloadError> {
        // Presence is checked for every key before any value is interpreted,
        // so a missing field is always reported ahead of a malformed one.
        for field in REQUIRED_FIELDS {
            if field == FIELD_DBNAME && default_dbname.is_some() {
                continue;
            }
            if !is_present(object.get(field)) {
                return Err(PayloadError::MissingField(field));
            }
        }

        let dbname = if is_present(object.get(FIELD_DBNAME)) {
            string_field(object, FIELD_DBNAME)?
        } else {
            // Only reachable when a fallback was supplied.
            default_dbname.unwrap_or_default().to_string()
        };

        Ok(Self {
            host: string_field(object, FIELD_HOST)?,
            port: object
                .get(FIELD_PORT)
                .ok_or(PayloadError::MissingField(FIELD_PORT))
                .and_then(coerce_port)?,
            username: string_field(object, FIELD_USERNAME)?,
            password: string_field(object, FIELD_PASSWORD)?,
            dbname,
        })
    }

    /// Serialize back to the stored JSON shape (`port` as a number).
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            FIELD_HOST: self.host,
            FIELD_PORT: self.port,
            FIELD_USERNAME: self.username,
            FIELD_PASSWORD: self.password,
            FIELD_DBNAME: self.dbname,
        })
    }
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPayload")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .finish()
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn string_field(object: &Map<String, Value>, field: &'static str) -> Result<String, PayloadError> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(PayloadError::InvalidField {
            field,
            reason: format!("expected a string, found {}", json_type(other)),
        }),
        None => Err(PayloadError::MissingField(field)),
    }
}

/// Coerce a JSON number or numeric string to a non-zero TCP port.
fn coerce_port(value: &Value) -> Result<u16, PayloadError> {
    let invalid = |reason: String| PayloadError::InvalidField {
        field: FIELD_PORT,
        reason,
    };

    let port = match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| invalid(format!("{} is not a valid port number", n)))?,
        Value::String(s) => s
            .trim()
            .parse::<u16>()
            .map_err(|_| invalid(format!("'{}' is not a valid port number", s)))?,
        other => return Err(invalid(format!("unexpected {}", json_type(other)))),
    };

    if port == 0 {
        return Err(invalid("port must be non-zero".to_string()));
    }
    Ok(port)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
