//! Token endpoint request and response types.
//!
//! The platform issues tokens through two grants that share one endpoint:
//! a password grant for the first sign-in and a refresh grant that trades a
//! previously issued refresh token for a new pair. Both are sent as
//! `application/x-www-form-urlencoded` bodies via reqwest's `.form()`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RdpError;

/// Which grant a [`GrantRequest`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    Password,
    Refresh,
}

/// Form body sent to the token endpoint. Exactly one shape per call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub enum GrantRequest<'a> {
    Password {
        username: &'a str,
        password: &'a str,
        scope: &'a str,
        #[serde(rename = "takeExclusiveSignOnControl")]
        take_exclusive_sign_on_control: bool,
        client_id: &'a str,
    },
    RefreshToken {
        username: &'a str,
        refresh_token: &'a str,
        client_id: &'a str,
    },
}

impl<'a> GrantRequest<'a> {
    /// Picks the grant from the presence of a prior refresh token.
    pub fn new(
        username: &'a str,
        password: &'a str,
        scope: &'a str,
        client_id: &'a str,
        prior_refresh_token: Option<&'a str>,
    ) -> Self {
        match prior_refresh_token {
            None => GrantRequest::Password {
                username,
                password,
                scope,
                take_exclusive_sign_on_control: true,
                client_id,
            },
            Some(refresh_token) => GrantRequest::RefreshToken {
                username,
                refresh_token,
                client_id,
            },
        }
    }

    pub fn kind(&self) -> GrantKind {
        match self {
            GrantRequest::Password { .. } => GrantKind::Password,
            GrantRequest::RefreshToken { .. } => GrantKind::Refresh,
        }
    }
}

/// Tokens issued by a successful authentication.
///
/// Invariant: `access_token` and `refresh_token` are non-empty and
/// `expires_in > 0`. Use [`SessionToken::from_body`] to build one from a
/// token endpoint response.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Value,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl SessionToken {
    /// Parses a 200 body from the token endpoint.
    ///
    /// `expires_in` is sent as a string (`"600"`) by the service but a plain
    /// number is accepted too.
    pub fn from_body(body: &str) -> Result<Self, RdpError> {
        let malformed = |source: Option<serde_json::Error>| RdpError::MalformedToken {
            body: body.to_string(),
            source,
        };

        let resp: TokenResponse =
            serde_json::from_str(body).map_err(|e| malformed(Some(e)))?;

        let expires_in = match &resp.expires_in {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .filter(|secs| *secs > 0)
        .ok_or_else(|| malformed(None))?;

        if resp.access_token.is_empty() || resp.refresh_token.is_empty() {
            return Err(malformed(None));
        }

        Ok(SessionToken {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_in,
            scope: resp.scope,
            token_type: resp.token_type,
        })
    }

    /// The `(access_token, refresh_token, expires_in)` triple.
    pub fn into_parts(self) -> (String, String, u64) {
        (self.access_token, self.refresh_token, self.expires_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_names(req: &GrantRequest<'_>) -> String {
        serde_json::to_value(req)
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn password_grant_without_refresh_token() {
        let req = GrantRequest::new("user", "pass", "trapi", "cid", None);
        assert_eq!(req.kind(), GrantKind::Password);

        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["grant_type"], "password");
        assert_eq!(v["username"], "user");
        assert_eq!(v["password"], "pass");
        assert_eq!(v["scope"], "trapi");
        assert_eq!(v["takeExclusiveSignOnControl"], true);
        assert_eq!(v["client_id"], "cid");
    }

    #[test]
    fn refresh_grant_omits_password_and_scope() {
        let req = GrantRequest::new("user", "pass", "trapi", "cid", Some("old-refresh"));
        assert_eq!(req.kind(), GrantKind::Refresh);

        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["grant_type"], "refresh_token");
        assert_eq!(v["username"], "user");
        assert_eq!(v["refresh_token"], "old-refresh");
        assert_eq!(v["client_id"], "cid");

        let keys = field_names(&req);
        assert!(!keys.contains("password"), "fields: {keys}");
        assert!(!keys.contains("scope"), "fields: {keys}");
        assert!(!keys.contains("takeExclusiveSignOnControl"));
    }

    #[test]
    fn parses_token_with_string_expiry() {
        let body = r#"{
            "access_token": "A",
            "refresh_token": "R",
            "expires_in": "600",
            "scope": "test1 test2",
            "token_type": "Bearer"
        }"#;
        let token = SessionToken::from_body(body).unwrap();
        assert_eq!(token.token_type.as_deref(), Some("Bearer"));
        assert_eq!(
            token.into_parts(),
            ("A".to_string(), "R".to_string(), 600)
        );
    }

    #[test]
    fn parses_token_with_numeric_expiry() {
        let body = r#"{"access_token":"A","refresh_token":"R","expires_in":300}"#;
        let token = SessionToken::from_body(body).unwrap();
        assert_eq!(token.expires_in, 300);
        assert!(token.scope.is_none());
    }

    #[test]
    fn rejects_missing_fields() {
        let err = SessionToken::from_body(r#"{"access_token":"A","expires_in":"600"}"#)
            .unwrap_err();
        assert!(matches!(err, RdpError::MalformedToken { source: Some(_), .. }));
    }

    #[test]
    fn rejects_zero_or_garbage_expiry() {
        for expiry in [r#""0""#, "0", r#""soon""#, "-5", "null"] {
            let body =
                format!(r#"{{"access_token":"A","refresh_token":"R","expires_in":{expiry}}}"#);
            let err = SessionToken::from_body(&body).unwrap_err();
            assert!(
                matches!(err, RdpError::MalformedToken { .. }),
                "expires_in={expiry} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_empty_tokens() {
        let body = r#"{"access_token":"","refresh_token":"R","expires_in":"600"}"#;
        assert!(SessionToken::from_body(body).is_err());
    }

    #[test]
    fn debug_redacts_tokens() {
        let token = SessionToken::from_body(
            r#"{"access_token":"secret-a","refresh_token":"secret-r","expires_in":"600"}"#,
        )
        .unwrap();
        let dbg = format!("{token:?}");
        assert!(!dbg.contains("secret-a"));
        assert!(!dbg.contains("secret-r"));
        assert!(dbg.contains("600"));
    }
}
