//! HTTP Server

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    Router, ServiceExt,
};
use axum_server::Handle;
use clap::Parser;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    normalize_path::{NormalizePath, NormalizePathLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tower_layer::Layer;
use tracing::{error, info, info_span};

use crate::domain::dispatch::DispatchService;

use self::{
    handlers::{not_found, panic_handler, v1},
    rate_limit::{rate_limited, RateLimitConfig},
    state::AppState,
};

pub mod errors;
pub mod handlers;
mod open_api;
pub mod rate_limit;
pub mod state;

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
pub struct HttpServerConfig {
    /// The port to listen on
    #[arg(long, env = "PORT", default_value = "8089")]
    pub port: u16,

    /// Rate limiting
    #[clap(flatten)]
    pub rate_limit: RateLimitConfig,
}

/// The application's HTTP server
#[derive(Debug)]
pub struct HttpServer {
    app: NormalizePath<Router>,
    listener: TcpListener,
}

impl HttpServer {
    /// Returns a new HTTP server bound to the port specified in `config`.
    pub fn new<D: DispatchService>(state: AppState<D>, config: &HttpServerConfig) -> Result<Self> {
        let app = trim_trailing_slash(rate_limited(router(state), &config.rate_limit)?);

        let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
        let listener = TcpListener::bind(address)
            .with_context(|| format!("failed to listen on {}", config.port))?;
        listener
            .set_nonblocking(true)
            .context("failed to configure listener")?;

        Ok(Self { app, listener })
    }

    /// Runs the HTTP server until a shutdown signal is received.
    #[mutants::skip]
    pub async fn run(self) -> Result<()> {
        info!(
            "HTTP Server listening on {}",
            self.listener
                .local_addr()
                .context("failed to get local address")?
        );

        let handle = Handle::new();

        tokio::spawn(shutdown_signal(handle.clone()));

        axum_server::from_tcp(self.listener)
            .handle(handle)
            .serve(ServiceExt::<Request>::into_make_service_with_connect_info::<
                SocketAddr,
            >(self.app))
            .await
            .context("server error")?;

        info!("HTTP server stopped");

        Ok(())
    }
}

/// Create the application's router
pub fn router<D: DispatchService>(state: AppState<D>) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
        let uri = request.uri().to_string();
        info_span!("http_request", method = ?request.method(), uri)
    });

    let cors_layer = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|_: &HeaderValue, _| true))
        .allow_methods([
            Method::HEAD,
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400));

    Router::new()
        .nest("/v1", v1::router::<D>())
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_handler))
        .layer(cors_layer)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(trace_layer)
        .with_state(state)
}

/// Strip trailing slashes before routing, so `/v1/healthz/` reaches `/v1/healthz`.
///
/// Path normalisation has to wrap the router, as a router layer runs after route matching.
pub fn trim_trailing_slash(router: Router) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router)
}

#[mutants::skip]
async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down gracefully");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
