//! HTTP shell around the Bulwark error pipeline
//!
//! [`Server`] wraps application routes in the cross-cutting middleware
//! chain and terminates every failure in the error pipeline.

mod cookies;
mod cors;
mod failure;
mod panic;
mod parameter_pollution;
mod pipeline;
mod query;
mod rate_limit;
mod routes;
mod sanitize;
mod security_headers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use bulwark_config::Config;
use bulwark_core::ErrorPipeline;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub use cookies::Cookies;
pub use failure::{ApiError, Json};
pub use parameter_pollution::PollutedParameters;
pub use pipeline::HttpResponseSink;
pub use routes::not_found;

use crate::rate_limit::RateLimitState;

/// How often fully replenished rate limit entries are dropped
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    rate_limit: Option<Arc<RateLimitState>>,
}

impl Server {
    /// Build the server with only the root route
    ///
    /// # Errors
    ///
    /// Returns an error if rate-limiter or security-header construction fails
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_routes(config, Router::new())
    }

    /// Build the server around application routes
    ///
    /// `routes` must not define `/` or a fallback of its own. Handlers fail
    /// by returning [`ApiError`].
    ///
    /// # Errors
    ///
    /// Returns an error if rate-limiter or security-header construction fails
    pub fn with_routes(config: Config, routes: Router) -> anyhow::Result<Self> {
        let Config {
            environment,
            server: server_config,
            ..
        } = config;

        let listen_address = server_config
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let mut app = routes::router(&server_config.static_files, routes);

        // Apply middleware layers (innermost first)

        // Cookie parsing
        app = app.layer(axum::middleware::from_fn(cookies::cookie_middleware));

        // Parameter pollution, on already sanitized queries
        if server_config.parameter_pollution.enabled {
            let whitelist: Arc<[String]> = server_config.parameter_pollution.whitelist.clone().into();
            app = app.layer(axum::middleware::from_fn(move |req, next| {
                let whitelist = Arc::clone(&whitelist);
                async move { parameter_pollution::parameter_pollution_middleware(whitelist, req, next).await }
            }));
        }

        // Query-injection sanitization
        if server_config.sanitize.enabled {
            let body_limit = server_config.body_limit;
            app = app.layer(axum::middleware::from_fn(move |req, next| {
                sanitize::sanitize_middleware(body_limit, req, next)
            }));
        }

        // Body limit for extractors
        app = app.layer(DefaultBodyLimit::max(server_config.body_limit));

        // Rate limiting
        let rate_limit = if server_config.rate_limit.enabled {
            let state = Arc::new(RateLimitState {
                limiter: bulwark_ratelimit::create_request_limiter(&server_config.rate_limit)?,
                message: server_config.rate_limit.message.clone(),
            });

            let layer_state = Arc::clone(&state);
            app = app.layer(axum::middleware::from_fn(move |req, next| {
                let state = Arc::clone(&layer_state);
                async move { rate_limit::rate_limit_middleware_arc(state, req, next).await }
            }));

            Some(state)
        } else {
            None
        };

        // Panics become unclassified failures
        app = app.layer(panic::catch_panic_layer());

        // Error pipeline renders every failure produced above
        let error_pipeline = ErrorPipeline::new(environment);
        app = app.layer(axum::middleware::from_fn(move |req, next| {
            pipeline::error_pipeline_middleware(error_pipeline, req, next)
        }));

        // Compression
        if server_config.compression {
            app = app.layer(CompressionLayer::new());
        }

        // Request logging
        if environment.is_development() {
            app = app.layer(TraceLayer::new_for_http());
        }

        // Security headers
        app = security_headers::apply(app, &server_config.security_headers)?;

        // CORS
        if let Some(ref cors_config) = server_config.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        tracing::debug!(%environment, %listen_address, "server assembled");

        Ok(Self {
            router: app,
            listen_address,
            rate_limit,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener. Serve it
    /// with `into_make_service_with_connect_info::<SocketAddr>()` so rate
    /// limiting can see peer addresses.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        if let Some(state) = self.rate_limit {
            tokio::spawn(prune_rate_limits(state, shutdown.clone()));
        }

        axum::serve(
            listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("graceful shutdown initiated");
        })
        .await?;

        Ok(())
    }
}

async fn prune_rate_limits(state: Arc<RateLimitState>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = interval.tick() => state.limiter.prune(),
        }
    }
}
