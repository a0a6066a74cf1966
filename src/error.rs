use reqwest::StatusCode;
use serde_json::Value;

/// Message carried by every [`RdpError::InvalidArgument`].
pub const INVALID_ARGUMENTS: &str = "Received invalid (None or Empty) arguments";

/// Errors raised by [`Controller`](crate::Controller) operations.
///
/// Transport failures are not errors: they come back as
/// [`Reply::Unreachable`](crate::Reply::Unreachable).
#[derive(Debug, thiserror::Error)]
pub enum RdpError {
    /// A required argument was empty. Raised before any request is sent.
    #[error("{operation}: Received invalid (None or Empty) arguments")]
    InvalidArgument { operation: &'static str },

    /// The token endpoint answered with a status other than 200.
    #[error("authentication failure: {} {reason} - {body}", .status.as_u16())]
    AuthenticationFailure {
        status: StatusCode,
        reason: String,
        body: String,
    },

    /// A data endpoint answered with a status other than 200.
    #[error("{operation} request failure: {} {reason} - {body}", .status.as_u16())]
    RequestFailure {
        operation: &'static str,
        status: StatusCode,
        reason: String,
        body: String,
    },

    /// The token endpoint answered 200 but the body is not a usable token.
    #[error("malformed token response: {body}")]
    MalformedToken {
        body: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A data endpoint answered 200 with a body that is not JSON.
    #[error("{operation}: response is not JSON: {body}")]
    MalformedResponse {
        operation: &'static str,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request payload")]
    Encode(#[from] serde_json::Error),

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

impl RdpError {
    /// HTTP status of an authentication or request failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RdpError::AuthenticationFailure { status, .. }
            | RdpError::RequestFailure { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body of an authentication or request failure.
    pub fn body(&self) -> Option<&str> {
        match self {
            RdpError::AuthenticationFailure { body, .. }
            | RdpError::RequestFailure { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Parses the service's error payload out of a failure body, if it has one.
    pub fn service_error(&self) -> Option<ServiceError> {
        self.body().and_then(ServiceError::parse)
    }
}

/// The two error payload shapes the platform returns.
///
/// The token endpoint uses the OAuth form
/// `{"error":"invalid_client","error_description":"..."}`; data endpoints
/// nest an object: `{"error":{"id","code","message","status","errors":[..]}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
    pub id: Option<String>,
    pub errors: Vec<FieldError>,
}

/// One entry of a validation error's `errors` list.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct NestedError {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Code(String),
    Nested(NestedError),
}

#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorField,
    #[serde(default)]
    error_description: Option<String>,
}

impl ServiceError {
    /// Returns `None` when `body` is not one of the known error payloads.
    pub fn parse(body: &str) -> Option<Self> {
        let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
        let parsed = match envelope.error {
            ErrorField::Code(code) => ServiceError {
                code: Some(code),
                message: envelope.error_description,
                status: None,
                id: None,
                errors: Vec::new(),
            },
            ErrorField::Nested(e) => ServiceError {
                code: e.code.map(scalar_to_string),
                message: e.message.or(e.description),
                status: e.status,
                id: e.id.map(scalar_to_string),
                errors: e.errors,
            },
        };
        Some(parsed)
    }
}

// Codes arrive as "401" or 412 depending on the endpoint.
fn scalar_to_string(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
