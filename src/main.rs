use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router, extract::DefaultBodyLimit, middleware, serve};
use talent_vault::config::{AppConfig, ProviderSettings};
use talent_vault::identity::{
    FirebaseIdentityProvider, IdentityProvider, InMemoryIdentityProvider,
};
use talent_vault::routes::{AppState, create_router};
use talent_vault::security::rate_limit::TrustedProxies;
use talent_vault::{logging, security};
use tokio::net::TcpListener;

fn build_provider(settings: &ProviderSettings) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    let provider: Arc<dyn IdentityProvider> = match settings {
        ProviderSettings::InMemory => {
            tracing::warn!("Using the in-memory identity provider; accounts are not persisted");
            Arc::new(InMemoryIdentityProvider::new())
        }
        ProviderSettings::Firebase { api_key, base_url } => {
            let provider = match base_url {
                Some(base_url) => FirebaseIdentityProvider::with_base_url(api_key, base_url),
                None => FirebaseIdentityProvider::new(api_key),
            }
            .context("failed to build the identity service client")?;
            tracing::info!("Using the Firebase identity provider");
            Arc::new(provider)
        }
    };
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let provider = build_provider(&config.provider)?;
    let state = AppState::new(provider, config.sign_in_debounce);

    let trusted = TrustedProxies::new(config.trusted_proxies.iter().copied());
    let router: Router = create_router(trusted)
        .layer(middleware::from_fn(security::headers::set_security_headers))
        .layer(DefaultBodyLimit::max(security::json::MAX_BODY_SIZE_BYTES))
        .layer(Extension(state));

    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!(addr = %config.addr, "Listening");

    serve(listener, app).await?;

    Ok(())
}
