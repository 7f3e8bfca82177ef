// Request boundary seen by authenticators
//
// Authenticators never touch the axum request directly: the middleware
// buffers the body and hands them an `AuthRequest`.

use crate::auth::token::AuthToken;
use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use std::collections::HashMap;

/// Headers and buffered body of one inbound request
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    headers: HeaderMap,
    body: Bytes,
}

impl AuthRequest {
    pub fn new(headers: HeaderMap, body: Bytes) -> Self {
        Self { headers, body }
    }

    /// Request without a body
    pub fn from_headers(headers: HeaderMap) -> Self {
        Self::new(headers, Bytes::new())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Extract the token from `Authorization: Bearer <token>`
    ///
    /// The scheme is matched case-insensitively. An empty token is treated
    /// as absent.
    pub fn bearer_token(&self) -> Option<AuthToken> {
        let value = self.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Some(AuthToken::new(token))
    }

    /// Read a cookie by name from every `Cookie` header
    ///
    /// Values are percent-decoded; an undecodable value is returned raw.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|s| s.split(';'))
            .find_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                if key.trim() != name {
                    return None;
                }
                let value = value.trim().trim_matches('"');
                Some(
                    urlencoding::decode(value)
                        .map(|decoded| decoded.into_owned())
                        .unwrap_or_else(|_| value.to_string()),
                )
            })
    }

    /// Whether the declared content type is JSON (`application/json` or `*/*+json`)
    pub fn is_json(&self) -> bool {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| {
                let media_type = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
                media_type == "application/json" || media_type.ends_with("+json")
            })
            .unwrap_or(false)
    }

    /// Decode the body into scalar fields
    ///
    /// JSON bodies must be objects; string values are taken as-is, numbers and
    /// `true` are stringified. `false`, numeric zero, null, arrays and objects
    /// are skipped, so falsy JSON scalars never read as present. Other bodies are
    /// decoded as `application/x-www-form-urlencoded`. A body that fails to
    /// decode yields no fields.
    pub fn body_fields(&self) -> HashMap<String, String> {
        if self.body.is_empty() {
            return HashMap::new();
        }

        if self.is_json() {
            return match serde_json::from_slice::<serde_json::Value>(&self.body) {
                Ok(serde_json::Value::Object(map)) => map
                    .into_iter()
                    .filter_map(|(key, value)| {
                        let value = match value {
                            serde_json::Value::String(s) => s,
                            serde_json::Value::Number(n) if n.as_f64() != Some(0.0) => n.to_string(),
                            serde_json::Value::Bool(true) => "true".to_string(),
                            _ => return None,
                        };
                        Some((key, value))
                    })
                    .collect(),
                _ => HashMap::new(),
            };
        }

        url::form_urlencoded::parse(&self.body)
            .into_owned()
            .collect()
    }
}
