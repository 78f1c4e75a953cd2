mod cors;
mod health;

use std::net::SocketAddr;

use axum::Router;
use mender_config::Config;
use mender_proxy::{ProxyState, proxy_router};
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// Creates the backend connection pool, which lives as long as the
    /// server.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream settings are unusable or the HTTP
    /// client cannot be built
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config.server.listen_address();
        let state = ProxyState::from_config(config)?;

        tracing::info!(
            upstream = %state.upstream().base_url(),
            timeout = ?state.upstream().timeout(),
            "upstream configured"
        );

        let mut app = Router::new();

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Everything else belongs to the proxy
        app = app.merge(proxy_router(state));

        app = app.layer(TraceLayer::new_for_http());

        if config.server.cors.enabled {
            app = app.layer(cors::cors_layer(&config.server.cors));
        }

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered. The connection pool
    /// is dropped with the router once in-flight requests have finished.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        tracing::info!("server stopped, upstream connections closed");
        Ok(())
    }
}
