use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::auth::{GrantKind, GrantRequest, SessionToken};
use crate::error::RdpError;
use crate::util::{is_empty_arg, is_empty_payload};

/// Authorization scope requested by password grants unless overridden.
pub const DEFAULT_SCOPE: &str = "trapi";

const ESG_OPERATION: &str = "ESG data";
const SEARCH_OPERATION: &str = "Search Explore";

/// Arguments a refresh grant must carry besides the refresh token.
///
/// The platform only needs the refresh token, username and client id to
/// renew a session, but callers have always had to pass the password as
/// well. `RequirePassword` keeps that behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshArguments {
    #[default]
    RequirePassword,
    UsernameOnly,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Scope sent with password grants.
    pub scope: String,
    /// Transport timeout applied to every request.
    pub timeout: Duration,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    pub refresh_arguments: RefreshArguments,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            scope: DEFAULT_SCOPE.to_string(),
            timeout: Duration::from_secs(60),
            verify: true,
            refresh_arguments: RefreshArguments::default(),
        }
    }
}

/// Outcome of a call that passed argument validation.
///
/// HTTP error statuses are reported through `Err`; a request that never
/// reached the service is `Unreachable` so callers can tell the two apart.
#[derive(Debug)]
pub enum Reply<T> {
    Received(T),
    Unreachable(reqwest::Error),
}

impl<T> Reply<T> {
    /// Drops the transport error, leaving `None` for an unreachable service.
    pub fn into_option(self) -> Option<T> {
        match self {
            Reply::Received(v) => Some(v),
            Reply::Unreachable(_) => None,
        }
    }

    pub fn is_received(&self) -> bool {
        matches!(self, Reply::Received(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Reply::Received(v) => Reply::Received(f(v)),
            Reply::Unreachable(e) => Reply::Unreachable(e),
        }
    }
}

/// Blocking controller for the platform's token, ESG and search endpoints.
///
/// The controller holds no per-call state; one instance can be shared
/// between threads.
#[derive(Debug, Clone)]
pub struct Controller {
    scope: String,
    refresh_arguments: RefreshArguments,
    // Token endpoint client secret; the platform issues public clients.
    client_secret: String,
    http: HttpClient,
}

impl Controller {
    /// Creates a controller with the default `trapi` scope.
    pub fn new() -> Result<Self, RdpError> {
        Self::with_options(ControllerOptions::default())
    }

    pub fn with_options(options: ControllerOptions) -> Result<Self, RdpError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("rdpapi-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("rdpapi-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(options.timeout);

        if !options.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(RdpError::Client)?;

        Ok(Self {
            scope: options.scope,
            refresh_arguments: options.refresh_arguments,
            client_secret: String::new(),
            http,
        })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Requests a token pair from the token endpoint.
    ///
    /// Without `prior_refresh_token` this is a password grant; with one it
    /// is a refresh grant that omits the password and scope. `username`,
    /// `password` and `client_id` are validated in both cases unless the
    /// controller was built with [`RefreshArguments::UsernameOnly`].
    pub fn authenticate(
        &self,
        auth_endpoint: &str,
        username: &str,
        password: &str,
        client_id: &str,
        prior_refresh_token: Option<&str>,
    ) -> Result<Reply<SessionToken>, RdpError> {
        let password_waived = prior_refresh_token.is_some()
            && self.refresh_arguments == RefreshArguments::UsernameOnly;
        if is_empty_arg(auth_endpoint)
            || is_empty_arg(username)
            || (is_empty_arg(password) && !password_waived)
            || is_empty_arg(client_id)
        {
            return Err(RdpError::InvalidArgument {
                operation: "authenticate",
            });
        }

        let grant = GrantRequest::new(
            username,
            password,
            &self.scope,
            client_id,
            prior_refresh_token,
        );
        debug!(url = auth_endpoint, grant = ?grant.kind(), "requesting access token");

        let sent = self
            .http
            .post(auth_endpoint)
            .basic_auth(client_id, Some(&self.client_secret))
            .form(&grant)
            .send();
        let resp = match sent {
            Ok(resp) => resp,
            Err(err) => {
                warn!(url = auth_endpoint, error = %err, "token request did not reach the service");
                return Ok(Reply::Unreachable(err));
            }
        };

        let (status, body) = match read_body(resp) {
            Ok(read) => read,
            Err(err) => {
                warn!(url = auth_endpoint, error = %err, "token response body could not be read");
                return Ok(Reply::Unreachable(err));
            }
        };
        if status != StatusCode::OK {
            warn!(
                status = status.as_u16(),
                reason = reason_phrase(status),
                body = %body,
                "authentication failure"
            );
            return Err(RdpError::AuthenticationFailure {
                status,
                reason: reason_phrase(status).to_string(),
                body,
            });
        }

        let token = SessionToken::from_body(&body)?;
        match grant.kind() {
            GrantKind::Password => info!(expires_in = token.expires_in, "authentication success"),
            GrantKind::Refresh => info!(expires_in = token.expires_in, "session renewed"),
        }
        Ok(Reply::Received(token))
    }

    /// Fetches ESG scores for `universe` with a bearer token.
    ///
    /// A 200 body is returned as-is; it may hold data or an application
    /// error object such as an unresolved identifier.
    pub fn fetch_scored_entities(
        &self,
        endpoint: &str,
        access_token: &str,
        universe: &str,
    ) -> Result<Reply<Value>, RdpError> {
        if is_empty_arg(endpoint) || is_empty_arg(access_token) || is_empty_arg(universe) {
            return Err(RdpError::InvalidArgument {
                operation: "fetch_scored_entities",
            });
        }

        let req = self
            .http
            .get(endpoint)
            .bearer_auth(access_token)
            .query(&[("universe", universe)]);
        self.data_request(ESG_OPERATION, endpoint, req)
    }

    /// Posts a search/explore query with a bearer token.
    ///
    /// `query` is rejected when it serializes to `null`, `false`, `0`, an
    /// empty string, or an empty object or array.
    pub fn fetch_search_results<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        access_token: &str,
        query: &T,
    ) -> Result<Reply<Value>, RdpError> {
        if is_empty_arg(endpoint) || is_empty_arg(access_token) {
            return Err(RdpError::InvalidArgument {
                operation: "fetch_search_results",
            });
        }
        let payload = serde_json::to_value(query)?;
        if is_empty_payload(&payload) {
            return Err(RdpError::InvalidArgument {
                operation: "fetch_search_results",
            });
        }

        let req = self
            .http
            .post(endpoint)
            .header(ACCEPT, "application/json")
            .bearer_auth(access_token)
            .json(&payload);
        self.data_request(SEARCH_OPERATION, endpoint, req)
    }

    fn data_request(
        &self,
        operation: &'static str,
        url: &str,
        req: RequestBuilder,
    ) -> Result<Reply<Value>, RdpError> {
        debug!(url, operation, "sending data request");
        let resp = match req.send() {
            Ok(resp) => resp,
            Err(err) => {
                warn!(url, operation, error = %err, "data request did not reach the service");
                return Ok(Reply::Unreachable(err));
            }
        };

        let (status, body) = match read_body(resp) {
            Ok(read) => read,
            Err(err) => {
                warn!(url, operation, error = %err, "response body could not be read");
                return Ok(Reply::Unreachable(err));
            }
        };
        if status != StatusCode::OK {
            warn!(
                operation,
                status = status.as_u16(),
                reason = reason_phrase(status),
                body = %body,
                "request failure"
            );
            return Err(RdpError::RequestFailure {
                operation,
                status,
                reason: reason_phrase(status).to_string(),
                body,
            });
        }

        let value = serde_json::from_str::<Value>(&body).map_err(|source| {
            RdpError::MalformedResponse {
                operation,
                body: body.clone(),
                source,
            }
        })?;
        info!(operation, "received data");
        Ok(Reply::Received(value))
    }
}

// A connection dropped mid-body is a transport failure like a refused one.
fn read_body(resp: Response) -> Result<(StatusCode, String), reqwest::Error> {
    let status = resp.status();
    let text = resp.text()?;
    Ok((status, text))
}

fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}
