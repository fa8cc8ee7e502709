use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::identity::IdentityProvider;
use crate::nav::AuthStatus;
use crate::security::rate_limit::TrustedProxies;

pub mod auth;
pub mod nav;
pub mod validate;

/// Shared handler state, injected as an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn IdentityProvider>,
    pub auth_status: Arc<AuthStatus>,
    pub sign_in_debounce: Duration,
}

impl AppState {
    /// Must be called inside a Tokio runtime: the auth status subscribes to the
    /// provider right away.
    pub fn new(provider: Arc<dyn IdentityProvider>, sign_in_debounce: Duration) -> Self {
        let auth_status = Arc::new(AuthStatus::observe(provider.as_ref()));
        Self {
            provider,
            auth_status,
            sign_in_debounce,
        }
    }
}

/// Rate limiters key clients by peer address, or by forwarding headers when the
/// peer is one of `trusted`.
pub fn create_router(trusted: TrustedProxies) -> Router {
    tracing::debug!("Creating application router");
    Router::new()
        .merge(auth::router(&trusted))
        .merge(validate::router(&trusted))
        .merge(nav::router())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::net::SocketAddr;

    use axum::{
        Extension, Router,
        body::Body,
        extract::connect_info::MockConnectInfo,
        http::{Method, Request, StatusCode, header::CONTENT_TYPE},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::identity::memory::test_provider;
    use crate::session::DEFAULT_DEBOUNCE;

    pub(crate) fn app() -> (Router, AppState) {
        let state = AppState::new(Arc::new(test_provider()), DEFAULT_DEBOUNCE);
        let router = create_router(TrustedProxies::none())
            .layer(Extension(state.clone()))
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40_000))));
        (router, state)
    }

    pub(crate) async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        // axum's own rejections (unknown path segment, etc.) are plain text
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }
}
