use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use conclave_types::Email;

use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;

/// Header carrying the signed-in user's email for [`HeaderIdentity`].
pub const USER_HEADER: &str = "x-user-email";

/// Resolves the signed-in user of a request.
///
/// `Ok(None)` means the request is anonymous; endpoints that need a user
/// reject it with 401.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identify(&self, headers: &HeaderMap) -> ServerResult<Option<Email>>;
}

/// Trusts an identity header set by a fronting proxy.
#[derive(Clone, Debug)]
pub struct HeaderIdentity {
    header: String,
}

impl HeaderIdentity {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl Default for HeaderIdentity {
    fn default() -> Self {
        Self::new(USER_HEADER)
    }
}

#[async_trait]
impl IdentityProvider for HeaderIdentity {
    async fn identify(&self, headers: &HeaderMap) -> ServerResult<Option<Email>> {
        let Some(value) = headers.get(self.header.as_str()) else {
            return Ok(None);
        };
        let raw = value.to_str().map_err(|_| {
            ServerError::Unauthenticated(format!("{} is not valid text", self.header))
        })?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Email::parse(raw)
            .map(Some)
            .map_err(|e| ServerError::Unauthenticated(e.to_string()))
    }
}

/// Extractor for handlers that require a signed-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser(pub Email);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .identity
            .identify(&parts.headers)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| ServerError::Unauthenticated(format!("missing {USER_HEADER} header")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn header_identity_parses_email() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("Ada@Example.com"));
        let user = HeaderIdentity::default().identify(&headers).await.unwrap();
        assert_eq!(user.unwrap().as_str(), "ada@example.com");
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_anonymous() {
        let provider = HeaderIdentity::default();
        assert!(provider.identify(&HeaderMap::new()).await.unwrap().is_none());

        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("  "));
        assert!(provider.identify(&headers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("not-an-email"));
        let err = HeaderIdentity::default().identify(&headers).await.unwrap_err();
        assert!(matches!(err, ServerError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn custom_header_name() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-user", HeaderValue::from_static("bob@example.com"));
        let user = HeaderIdentity::new("x-forwarded-user")
            .identify(&headers)
            .await
            .unwrap();
        assert!(user.is_some());
    }
}
