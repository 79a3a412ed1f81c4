//! HTTP surface: search API, health endpoint and the healthcheck client.

mod service;

use std::net::SocketAddr;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use service::{health, search, AppState, HealthView, SearchParams};

/// Build the search API router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the search API until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Starting search HTTP server");
    }

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
}

/// Resolve the listen address for `bind_address` ("auto", IPv4 or IPv6).
///
/// "auto" tries dual-stack `[::]` and falls back to `0.0.0.0` when IPv6
/// cannot be bound.
pub async fn bind_listener(bind_address: &str, port: u16) -> std::io::Result<TcpListener> {
    if bind_address == "auto" {
        return match TcpListener::bind(("::", port)).await {
            Ok(listener) => {
                info!("Auto-detected dual-stack support, using [::]");
                Ok(listener)
            }
            Err(_) => {
                info!("IPv6 not available, falling back to IPv4 (0.0.0.0)");
                TcpListener::bind(("0.0.0.0", port)).await
            }
        };
    }

    // Add brackets if it's an IPv6 address without them
    let bind_str = if bind_address.contains(':') && !bind_address.starts_with('[') {
        format!("[{}]:{}", bind_address, port)
    } else {
        format!("{}:{}", bind_address, port)
    };
    let addr: SocketAddr = bind_str
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    TcpListener::bind(addr).await
}

/// GET `<base_url>/health` and succeed only if the service reports serving.
pub async fn probe_health(
    base_url: &str,
) -> Result<HealthView, Box<dyn std::error::Error + Send + Sync>> {
    let client: Client<_, Empty<Bytes>> = Client::builder(TokioExecutor::new()).build_http();

    let uri: hyper::Uri = format!("{}/health", base_url.trim_end_matches('/')).parse()?;
    let response = client.get(uri).await?;

    if !response.status().is_success() {
        return Err(format!("health endpoint returned {}", response.status()).into());
    }

    let body = response.into_body().collect().await?.to_bytes();
    let health: HealthView = serde_json::from_slice(&body)?;

    if health.status == "serving" {
        Ok(health)
    } else {
        Err(format!("service not serving: {}", health.status).into())
    }
}
