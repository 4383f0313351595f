#![forbid(unsafe_code)]

//! OAuth-style client-credentials exchange, as plain request/response
//! values. Sending the request is left to the caller's HTTP stack.

use crate::AuthError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Production authentication endpoint.
pub const AUTHENTICATE_URL: &str = "https://autenticacao.sapi.serpro.gov.br/authenticate";

/// Value of the `Role-Type` header for third-party callers.
pub const ROLE_TYPE: &str = "TERCEIROS";

const GRANT_CLIENT_CREDENTIALS: &str = "grant_type=client_credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
        }
    }
}

/// A fully described token request.
pub struct TokenRequest {
    pub method: Method,
    pub url: String,
    headers: Vec<(&'static str, Zeroizing<String>)>,
    pub body: String,
}

impl TokenRequest {
    /// Build a `client_credentials` grant for `endpoint`, authenticating
    /// with HTTP Basic over `consumer_key:consumer_secret`.
    pub fn client_credentials(endpoint: &str, consumer_key: &str, consumer_secret: &str) -> Self {
        let credentials = Zeroizing::new(format!("{consumer_key}:{consumer_secret}"));
        let basic = Zeroizing::new(format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes())
        ));
        Self {
            method: Method::Post,
            url: endpoint.to_owned(),
            headers: vec![
                ("Authorization", basic),
                ("Role-Type", Zeroizing::new(ROLE_TYPE.to_owned())),
                (
                    "Content-Type",
                    Zeroizing::new("application/x-www-form-urlencoded".to_owned()),
                ),
            ],
            body: GRANT_CLIENT_CREDENTIALS.to_owned(),
        }
    }

    /// Headers in sending order.
    pub fn headers(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.headers.iter().map(|(name, value)| (*name, value.as_str()))
    }

    /// Look up a header value, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers()
            .map(|(name, value)| if name == "Authorization" { (name, "<redacted>") } else { (name, value) })
            .collect();
        f.debug_struct("TokenRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}

/// The token endpoint's JSON reply.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
    pub token_type: String,
    pub access_token: String,
    pub jwt_token: String,
}

impl TokenResponse {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let response: Self = serde_json::from_str(json)?;
        tracing::debug!(expires_in = response.expires_in, scope = %response.scope, "token response parsed");
        Ok(response)
    }

    /// `Authorization` header value for API calls.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Headers every authenticated API call carries.
    pub fn api_headers(&self) -> [(&'static str, String); 2] {
        [
            ("Authorization", self.bearer_header()),
            ("jwt_token", self.jwt_token.clone()),
        ]
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_credentials_request() {
        let request = TokenRequest::client_credentials(AUTHENTICATE_URL, "key", "secret");
        assert_eq!(request.method.as_str(), "POST");
        assert_eq!(request.url, AUTHENTICATE_URL);
        assert_eq!(request.header("authorization"), Some("Basic a2V5OnNlY3JldA=="));
        assert_eq!(request.header("Role-Type"), Some("TERCEIROS"));
        assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(request.body, "grant_type=client_credentials");
        assert_eq!(request.headers().count(), 3);
    }

    #[test]
    fn test_request_debug_redacts_credentials() {
        let request = TokenRequest::client_credentials(AUTHENTICATE_URL, "key", "secret");
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("a2V5OnNlY3JldA=="));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_parse_response() {
        let json = r#"{
            "expires_in": 2008,
            "scope": "default",
            "token_type": "Bearer",
            "access_token": "06aef429-a981-3ec5-a1f8-71d38d86481e",
            "jwt_token": "eyJhbGciOiJIUzI1NiJ9.e30.sig"
        }"#;
        let response = TokenResponse::from_json(json).unwrap();
        assert_eq!(response.expires_in, 2008);
        assert_eq!(response.bearer_header(), "Bearer 06aef429-a981-3ec5-a1f8-71d38d86481e");
        assert_eq!(response.api_headers()[1], ("jwt_token", "eyJhbGciOiJIUzI1NiJ9.e30.sig".to_owned()));
        assert!(!format!("{response:?}").contains("06aef429"));
    }

    #[test]
    fn test_parse_response_missing_field() {
        assert!(matches!(
            TokenResponse::from_json(r#"{"expires_in": 1}"#),
            Err(AuthError::Json(_))
        ));
    }
}
