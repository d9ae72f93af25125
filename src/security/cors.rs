//! Cross-origin access policy.
//!
//! A single configured origin is granted access. Every response carries the
//! allow headers for that origin; browsers calling from anywhere else see a
//! mismatching `Access-Control-Allow-Origin` and block the call themselves.
//! Preflight requests are answered here and never reach the backend.

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, ORIGIN,
            VARY,
        },
        HeaderMap, HeaderValue, Method, Request, StatusCode,
    },
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::{CorsConfig, ValidationError};

/// Compiled, immutable CORS policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origin: HeaderValue,
    allowed_methods: HeaderValue,
    allowed_headers: HeaderValue,
}

impl CorsPolicy {
    /// Build the policy, rejecting values that cannot be sent as headers.
    pub fn from_config(config: &CorsConfig) -> Result<Self, ValidationError> {
        if config.allowed_origin.trim().is_empty() {
            return Err(ValidationError::EmptyOrigin);
        }

        let allowed_origin = HeaderValue::from_str(config.allowed_origin.trim()).map_err(|_| {
            ValidationError::CorsHeaderValue {
                field: "allowed_origin",
            }
        })?;
        let allowed_methods = HeaderValue::from_str(&config.allowed_methods.join(", "))
            .map_err(|_| ValidationError::CorsHeaderValue {
                field: "allowed_methods",
            })?;
        let allowed_headers = HeaderValue::from_str(&config.allowed_headers.join(", "))
            .map_err(|_| ValidationError::CorsHeaderValue {
                field: "allowed_headers",
            })?;

        Ok(Self {
            allowed_origin,
            allowed_methods,
            allowed_headers,
        })
    }

    /// The configured origin, as sent in `Access-Control-Allow-Origin`.
    pub fn allowed_origin(&self) -> &HeaderValue {
        &self.allowed_origin
    }

    /// Whether a request's `Origin` is the allowed one.
    ///
    /// Requests without an `Origin` header are same-origin or non-browser
    /// callers and are not subject to the policy.
    pub fn is_allowed(&self, origin: Option<&HeaderValue>) -> bool {
        match origin {
            Some(origin) => *origin == self.allowed_origin,
            None => true,
        }
    }

    /// Force the allow headers onto a response header map.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );

        let varies_on_origin = headers
            .get_all(VARY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|v| v.trim().eq_ignore_ascii_case("origin") || v.trim() == "*");
        if !varies_on_origin {
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
    }

    /// The uniform answer to any preflight request.
    pub fn preflight_response(&self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        self.apply(headers);
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allowed_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allowed_headers.clone());
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        response
    }
}

/// Middleware answering preflights and stamping CORS headers on everything else.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        tracing::debug!(path = %request.uri().path(), "Answering preflight request");
        return policy.preflight_response();
    }

    if !policy.is_allowed(request.headers().get(ORIGIN)) {
        tracing::debug!(
            origin = ?request.headers().get(ORIGIN),
            allowed = ?policy.allowed_origin(),
            "Request from an origin without access"
        );
    }

    let mut response = next.run(request).await;
    policy.apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::any, Router};
    use tower::ServiceExt;

    fn policy() -> CorsPolicy {
        let config = CorsConfig {
            allowed_origin: "https://app.example.com".into(),
            ..CorsConfig::default()
        };
        CorsPolicy::from_config(&config).unwrap()
    }

    #[test]
    fn test_apply_sets_allow_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        policy().apply(&mut headers);

        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[VARY], "Origin");
    }

    #[test]
    fn test_apply_does_not_duplicate_vary() {
        let mut headers = HeaderMap::new();
        headers.insert(VARY, HeaderValue::from_static("Accept-Encoding, origin"));
        let policy = policy();
        policy.apply(&mut headers);
        policy.apply(&mut headers);

        assert_eq!(headers.get_all(VARY).iter().count(), 1);
    }

    #[test]
    fn test_preflight_response() {
        let response = policy().preflight_response();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS, DELETE");
        assert_eq!(
            headers[ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, x-api-key, Authorization"
        );
    }

    #[test]
    fn test_is_allowed() {
        let policy = policy();
        assert!(policy.is_allowed(Some(&HeaderValue::from_static("https://app.example.com"))));
        assert!(!policy.is_allowed(Some(&HeaderValue::from_static("https://evil.example"))));
        assert!(policy.is_allowed(None));
    }

    #[test]
    fn test_rejects_unusable_values() {
        let config = CorsConfig {
            allowed_origin: "https://bad\norigin".into(),
            ..CorsConfig::default()
        };
        assert_eq!(
            CorsPolicy::from_config(&config).unwrap_err(),
            ValidationError::CorsHeaderValue {
                field: "allowed_origin"
            }
        );
    }

    #[tokio::test]
    async fn test_middleware_short_circuits_preflight() {
        let policy = Arc::new(policy());
        let app = Router::new()
            .route("/{*path}", any(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .layer(middleware::from_fn_with_state(policy, cors_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS, DELETE"
        );
    }

    #[tokio::test]
    async fn test_middleware_stamps_regular_responses() {
        let policy = Arc::new(policy());
        let app = Router::new()
            .route("/{*path}", any(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") }))
            .layer(middleware::from_fn_with_state(policy, cors_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/tea")
                    .header(ORIGIN, "https://elsewhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
