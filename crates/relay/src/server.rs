//! Relay HTTP server

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    AUTHORIZATION, CONTENT_TYPE,
};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chat_relay_protocol::SESSION_HEADER;
use std::any::Any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::handlers::{health_handler, preflight_handler, relay_handler};
use crate::state::RelayState;

/// Request headers browsers may send to the relay
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

pub const ALLOW_METHODS: &str = "POST, OPTIONS";

/// Stateless relay between the chat widget and the upstream provider
pub struct RelayServer {
    state: Arc<RelayState>,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Result<Self> {
        Ok(Self {
            state: Arc::new(RelayState::new(config)?),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.state.config
    }

    /// Build the Axum router
    ///
    /// - `POST <route>`: relay a chat request
    /// - `OPTIONS <route>`: CORS preflight
    /// - `GET /health`: liveness probe
    pub fn router(&self) -> Router {
        let routes = Router::new()
            .route(
                &self.state.config.route,
                post(relay_handler).options(preflight_handler),
            )
            .route("/health", get(health_handler))
            .with_state(self.state.clone());

        with_relay_layers(routes)
    }

    /// Bind the configured address and serve until the process stops
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.state.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let router = self.router();
        let addr = listener.local_addr()?;

        info!("Chat relay running at http://{}", addr);
        info!("  Relay endpoint: http://{}{}", addr, self.state.config.route);
        info!("  Upstream:       {}", self.state.upstream.url());

        axum::serve(listener, router).await
    }
}

/// Wrap `router` in the relay's CORS, trace and panic layers.
///
/// Every response leaving the stack, including a caught panic, carries the
/// CORS headers.
pub fn with_relay_layers(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    router
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        // CorsLayer only answers preflights with the full set
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    RelayError::Internal(details).into_response()
}
