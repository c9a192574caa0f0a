mod cache;
mod extract;
mod handlers;
mod notify;

use std::{
    fs::File,
    io::BufReader,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use stamper_core::config::Config;
use stamper_redmine::{DoneMarker, Redmine, RedmineDoneMarker};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    normalize_path::NormalizePathLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
    cache::{HookCache, RedisCache},
    notify::Notifier,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub redmine: Arc<Redmine>,
    pub marker: Arc<dyn DoneMarker>,
    pub cache: Arc<dyn HookCache>,
    pub notifier: Arc<Notifier>,
}

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config = {
        let file = BufReader::new(File::open("config.yml").expect("Failed to open config file"));
        let config: Config =
            serde_yaml::from_reader(file).expect("Failed to parse config file");
        Arc::new(config)
    };
    let cache =
        RedisCache::connect(&config.redis.url).await.expect("Failed to connect to redis");

    let state = AppState {
        redmine: Arc::new(Redmine::new(config.redmine.clone())),
        marker: Arc::new(RedmineDoneMarker::new()),
        cache: Arc::new(cache),
        notifier: Arc::new(Notifier::new(config.mailgun.clone())),
        config: config.clone(),
    };

    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(120)))
        .layer(NormalizePathLayer::trim_trailing_slash());
    let router = handlers::build_router().with_state(state).layer(middleware);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server.port));
    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await.expect("bind error");
    if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!("Server error: {e}");
    }
    tracing::info!("Shut down gracefully");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for shutdown signal");
    }
}
