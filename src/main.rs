use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::http::HeaderValue;
use axum::Router;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use threadline_api as api;

use api::gateway::{HttpGateway, PaymentGateway};
use api::notifications::{HttpMailer, Mailer, NoopMailer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    let db = Arc::new(db_pool);

    // Events: channel plus the background processor doing best-effort email
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);

    let mailer: Arc<dyn Mailer> = match &cfg.email_api_key {
        Some(key) => Arc::new(HttpMailer::new(
            cfg.email_api_url.clone(),
            key.clone(),
            cfg.email_from.clone(),
        )),
        None => {
            info!("email API key not configured; transactional email disabled");
            Arc::new(NoopMailer)
        }
    };
    tokio::spawn(api::events::process_events(event_rx, mailer));

    // Payment gateway client. Development runs without credentials and
    // fails only when an online payment is actually attempted.
    let (gateway_key, gateway_secret) = match cfg.gateway_credentials() {
        Ok(creds) => creds,
        Err(e) => {
            info!("payment gateway credentials not configured: {}", e);
            (String::new(), String::new())
        }
    };
    let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpGateway::new(
        cfg.payment_gateway_url.clone(),
        gateway_key,
        gateway_secret,
    ));

    let services = api::handlers::AppServices::new(db.clone(), &cfg, gateway, event_sender.clone());
    let verifier = api::auth::TokenVerifier::new(&cfg.jwt_secret);

    let app_state = Arc::new(api::AppState {
        db,
        config: cfg.clone(),
        event_sender,
        services,
    });

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.is_development() || cfg.cors_allow_any_origin {
        info!("using permissive CORS (no explicit origins configured)");
        CorsLayer::permissive()
    } else {
        error!("missing CORS configuration; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        return Err("Missing CORS configuration".into());
    };

    let app = Router::new()
        .merge(api::health_routes())
        .nest("/api/v1", api::api_v1_routes(verifier))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors_layer)
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!(%addr, "starting threadline-api");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
