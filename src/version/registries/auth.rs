//! Authentication for Docker Registry v2 tag listing
//!
//! Registries answer an unauthenticated request with `401` and a `WWW-Authenticate`
//! challenge, e.g.
//!
//! ```text
//! Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/nginx:pull"
//! ```
//!
//! A `Bearer` challenge names a token endpoint (the realm) which hands out a short-lived
//! token for the given service and scope. ECR answers with `Basic realm="..."` instead and
//! expects the credentials on the original request.

use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::version::error::RegistryError;

/// Username/password pair used for HTTP basic authentication
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Authorization attached to registry requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Basic(BasicCredentials),
    Bearer(String),
}

impl Authorization {
    /// Adds the matching `Authorization` header to a request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Authorization::Basic(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            Authorization::Bearer(token) => request.bearer_auth(token),
        }
    }
}

/// Scheme of a `WWW-Authenticate` challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeScheme {
    Bearer,
    Basic,
}

/// Parsed `WWW-Authenticate` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub scheme: ChallengeScheme,
    pub realm: String,
    /// Remaining parameters (service, scope, ...) in header order
    pub params: Vec<(String, String)>,
}

impl AuthChallenge {
    /// Parse a single `WWW-Authenticate` header value.
    ///
    /// Parameter values may be quoted or bare; quoted values may contain commas
    /// (e.g. `scope="repository:foo:pull,push"`).
    pub fn parse(header: &str) -> Result<Self, RegistryError> {
        let header = header.trim();
        let (scheme, rest) = header
            .split_once(char::is_whitespace)
            .ok_or_else(|| RegistryError::InvalidChallenge(header.to_string()))?;

        let scheme = if scheme.eq_ignore_ascii_case("bearer") {
            ChallengeScheme::Bearer
        } else if scheme.eq_ignore_ascii_case("basic") {
            ChallengeScheme::Basic
        } else {
            return Err(RegistryError::InvalidChallenge(header.to_string()));
        };

        let mut realm = None;
        let mut params = Vec::new();
        for (key, value) in parse_params(rest) {
            if key.eq_ignore_ascii_case("realm") {
                realm = Some(value);
            } else {
                params.push((key, value));
            }
        }

        let realm = realm
            .filter(|r| !r.is_empty())
            .ok_or_else(|| RegistryError::InvalidChallenge(header.to_string()))?;

        Ok(Self {
            scheme,
            realm,
            params,
        })
    }

    /// Extract the challenge from response headers; exactly one challenge is expected
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, RegistryError> {
        let mut values = headers.get_all(WWW_AUTHENTICATE).iter();
        let (Some(value), None) = (values.next(), values.next()) else {
            return Err(RegistryError::InvalidChallenge(format!(
                "expected exactly one {} header",
                WWW_AUTHENTICATE
            )));
        };
        let value = value
            .to_str()
            .map_err(|e| RegistryError::InvalidChallenge(e.to_string()))?;
        debug!("Incoming auth challenge: {}", value);
        Self::parse(value)
    }

    /// Token endpoint: the realm with every other parameter appended as a query pair
    pub fn token_url(&self) -> Result<Url, RegistryError> {
        let mut url = Url::parse(&self.realm)
            .map_err(|e| RegistryError::InvalidChallenge(format!("{}: {}", self.realm, e)))?;
        if !self.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| *c == ',' || c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ',') {
            key.push(c);
        }
        if chars.next_if_eq(&'=').is_none() {
            // bare token without a value
            continue;
        }

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                value.push(c);
            }
        }

        params.push((key.trim().to_string(), value.trim().to_string()));
    }

    params
}

/// Body of a token endpoint response; Docker Hub sends `token`, OAuth2 servers `access_token`
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Option<String> {
        self.token
            .or(self.access_token)
            .filter(|token| !token.is_empty())
    }
}

/// Authentication state of a single tag-listing operation.
///
/// Created fresh for every listing, so a token acquired for one repository is never seen by
/// a concurrent listing of another.
#[derive(Debug, Default)]
pub struct AuthSession {
    credentials: Option<BasicCredentials>,
    authorization: Option<Authorization>,
    token_url: Option<Url>,
    answers_challenges: bool,
}

impl AuthSession {
    /// Session that sends no credentials up front and answers bearer challenges anonymously
    pub fn anonymous() -> Self {
        Self {
            answers_challenges: true,
            ..Self::default()
        }
    }

    /// Session that answers challenges using the given credentials
    pub fn challenged(credentials: Option<BasicCredentials>) -> Self {
        Self {
            credentials,
            answers_challenges: true,
            ..Self::default()
        }
    }

    /// Session that sends basic credentials with every request and never answers challenges
    pub fn basic(credentials: BasicCredentials) -> Self {
        Self {
            authorization: Some(Authorization::Basic(credentials.clone())),
            credentials: Some(credentials),
            token_url: None,
            answers_challenges: false,
        }
    }

    pub fn authorization(&self) -> Option<&Authorization> {
        self.authorization.as_ref()
    }

    /// URL the current bearer token was acquired from
    pub fn token_url(&self) -> Option<&Url> {
        self.token_url.as_ref()
    }

    pub fn answers_challenges(&self) -> bool {
        self.answers_challenges
    }

    /// Answer a challenge, replacing the cached authorization
    pub async fn answer(
        &mut self,
        client: &reqwest::Client,
        challenge: &AuthChallenge,
    ) -> Result<(), RegistryError> {
        match challenge.scheme {
            ChallengeScheme::Basic => {
                let credentials = self.credentials.clone().ok_or_else(|| {
                    RegistryError::Auth(format!(
                        "basic challenge from {} but no credentials configured",
                        challenge.realm
                    ))
                })?;
                self.authorization = Some(Authorization::Basic(credentials));
            }
            ChallengeScheme::Bearer => {
                let url = challenge.token_url()?;
                debug!("Fetching auth token from {}", url);

                let mut request = client.get(url.clone());
                if let Some(credentials) = &self.credentials {
                    request = request.basic_auth(&credentials.username, Some(&credentials.password));
                }
                let response = request.send().await?;

                let status = response.status();
                if status != StatusCode::OK {
                    return Err(RegistryError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let token = response
                    .json::<TokenResponse>()
                    .await
                    .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?
                    .into_token()
                    .ok_or_else(|| {
                        RegistryError::InvalidResponse(format!("no token in response from {}", url))
                    })?;

                self.authorization = Some(Authorization::Bearer(token));
                self.token_url = Some(url);
            }
        }
        Ok(())
    }
}
