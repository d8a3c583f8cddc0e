//! Bearer-token access guard
//!
//! Applied per route group. In [`GuardMode::MutationsOnly`] safe methods
//! (GET, HEAD, OPTIONS) pass untouched and everything else needs
//! `Authorization: Bearer <token>`. [`GuardMode::AllMethods`] checks every
//! request (used by `/auth/verify`).
//!
//! Verified claims are inserted into request extensions so handlers can take
//! `Extension<Claims>`.

use crate::error::ApiError;
use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap, Method},
    response::{IntoResponse, Response},
};
use bandsync_common::api::{verify_token, Claims, TokenError};
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

/// Which requests the guard inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    MutationsOnly,
    AllMethods,
}

/// Tower layer for bearer-token authentication
#[derive(Clone)]
pub struct AuthLayer {
    signing_secret: Arc<str>,
    mode: GuardMode,
}

impl AuthLayer {
    pub fn new(signing_secret: &str, mode: GuardMode) -> Self {
        Self {
            signing_secret: Arc::from(signing_secret),
            mode,
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            signing_secret: self.signing_secret.clone(),
            mode: self.mode,
        }
    }
}

/// Tower service that validates the bearer token
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    signing_secret: Arc<str>,
    mode: GuardMode,
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let signing_secret = self.signing_secret.clone();
        let mode = self.mode;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if mode == GuardMode::MutationsOnly && is_safe_method(request.method()) {
                return inner.call(request).await;
            }

            match authenticate(request.headers(), &signing_secret) {
                Ok(claims) => {
                    request.extensions_mut().insert(claims);
                    inner.call(request).await
                }
                Err(err) => {
                    debug!(
                        method = %request.method(),
                        path = %request.uri().path(),
                        error = %err,
                        "Rejected unauthenticated request"
                    );
                    Ok(err.into_response())
                }
            }
        })
    }
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Extract and verify the bearer token from request headers
pub fn authenticate(headers: &HeaderMap, signing_secret: &str) -> Result<Claims, ApiError> {
    let token = bearer_token(headers)?;

    verify_token(token, signing_secret, Utc::now().timestamp()).map_err(|e| match e {
        TokenError::Expired { .. } => ApiError::Auth("Token expired".to_string()),
        TokenError::InvalidSignature => ApiError::Auth("Invalid token signature".to_string()),
        TokenError::Malformed(_) => ApiError::Auth("Malformed token".to_string()),
    })
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Auth("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Auth("Authorization header is not valid text".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| ApiError::Auth("Expected 'Bearer <token>'".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiError::Auth("Expected 'Bearer <token>'".to_string()));
    }

    Ok(token.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use bandsync_common::api::{admin_claims, issue_token, TOKEN_TTL_SECS};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_valid_bearer_token_yields_claims() {
        let token = issue_token(&admin_claims("admin", Utc::now().timestamp()), SECRET).unwrap();
        let claims = authenticate(&headers_with(&format!("Bearer {}", token)), SECRET).unwrap();
        assert_eq!(claims.username, "admin");
    }

    #[test]
    fn test_missing_header_rejected() {
        let err = authenticate(&HeaderMap::new(), SECRET).unwrap_err();
        assert_eq!(err.code(), "AUTH_ERROR");
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let err = authenticate(&headers_with("Basic YWRtaW46cHc="), SECRET).unwrap_err();
        assert_eq!(err.code(), "AUTH_ERROR");
    }

    #[test]
    fn test_expired_token_rejected() {
        let issued = Utc::now().timestamp() - TOKEN_TTL_SECS - 5;
        let token = issue_token(&admin_claims("admin", issued), SECRET).unwrap();

        let err = authenticate(&headers_with(&format!("Bearer {}", token)), SECRET).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::HEAD));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::DELETE));
    }
}
