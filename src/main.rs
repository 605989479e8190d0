use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::signal;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

use pixo_backend::api::{self, AppState};
use pixo_backend::config::AppConfig;
use pixo_backend::database::order_repository::OrderRepository;
use pixo_backend::database::otp_repository::OtpRepository;
use pixo_backend::database::store::{OrderStore, OtpStore};
use pixo_backend::database;
use pixo_backend::gateway::{PaymentGateway, RazorpayClient, RazorpayConfig};
use pixo_backend::health::{HealthChecker, HealthStatus};
use pixo_backend::logging::init_tracing;
use pixo_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use pixo_backend::services::{AdminAuthService, NotificationService, OrderService, OtpEngine};
use pixo_backend::workers::otp_sweep::OtpSweepWorker;

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

async fn shutdown_signal_with_notify(shutdown_tx: watch::Sender<bool>) {
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        "🚀 Starting pixo backend service"
    );

    info!("📊 Initializing database connection pool...");
    let db_pool = database::init_pool_from_config(&config.database)
        .await
        .map_err(|e| {
            error!("Failed to initialize database pool: {}", e);
            e
        })?;
    info!("✅ Database connection pool initialized");

    info!("💳 Initializing payment gateway client...");
    let gateway_config = RazorpayConfig::from_env().map_err(|e| {
        error!("Failed to load gateway configuration: {}", e);
        anyhow::anyhow!(e)
    })?;
    let gateway_configured =
        !gateway_config.key_id.is_empty() && !gateway_config.key_secret.is_empty();
    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        RazorpayClient::new(gateway_config).map_err(|e| anyhow::anyhow!(e))?,
    );
    info!("✅ Payment gateway client initialized");

    let order_store: Arc<dyn OrderStore> = Arc::new(OrderRepository::new(db_pool.clone()));
    let otp_store: Arc<dyn OtpStore> = Arc::new(OtpRepository::new(db_pool.clone()));
    let notifier = NotificationService::new();

    let default_currency =
        std::env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| "INR".to_string());
    let orders = OrderService::new(
        order_store,
        gateway,
        notifier.clone(),
        default_currency,
    );

    let otp_engine = OtpEngine::new(otp_store.clone(), config.admin.otp_ttl_secs);
    let admin = AdminAuthService::new(otp_engine, notifier, config.admin.clone());

    let health_checker = HealthChecker::new(db_pool.clone(), gateway_configured);

    // Expired-challenge sweep; validation checks expiry passively either way.
    let (worker_shutdown_tx, worker_shutdown_rx) = watch::channel(false);
    let sweep_interval = std::env::var("OTP_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(300);
    let sweep_worker = OtpSweepWorker::new(otp_store.clone(), sweep_interval);
    let sweep_handle = tokio::spawn(sweep_worker.run(worker_shutdown_rx));

    info!("🛣️  Setting up application routes...");
    let state = AppState {
        orders,
        admin,
        health: health_checker,
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/health/live", get(liveness))
        .route("/api/orders", post(api::orders::create_order))
        .route("/api/orders/{order_id}", get(api::orders::get_order))
        .route("/api/payments/verify", post(api::payments::verify_payment))
        .route("/webhooks/gateway", post(api::payments::gateway_webhook))
        .route("/api/admin/login", post(api::admin::login))
        .route("/api/admin/verify", post(api::admin::verify))
        .route(
            "/api/admin/orders/{order_id}/refund",
            post(api::admin::refund_order),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    info!("✅ Routes configured");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "🚀 Server listening on http://{}", addr);
    info!("✅ Server is ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_with_notify(worker_shutdown_tx.clone()))
        .await?;

    let _ = worker_shutdown_tx.send(true);
    if let Err(e) = tokio::time::timeout(std::time::Duration::from_secs(5), sweep_handle).await {
        error!(error = %e, "Timed out waiting for OTP sweep worker shutdown");
    }

    info!("👋 Server shutdown complete");

    Ok(())
}

// Handlers

async fn root() -> &'static str {
    "Welcome to the pixo backend API"
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<HealthStatus>, (axum::http::StatusCode, String)> {
    let health_status = state.health.check_health().await;

    // Return 503 if any component is unhealthy
    if matches!(
        health_status.status,
        pixo_backend::health::HealthState::Unhealthy
    ) {
        error!("❌ Health check failed - service unhealthy");
        Err((
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ))
    } else {
        Ok(Json(health_status))
    }
}

/// Readiness probe - checks if the service is ready to accept traffic
async fn readiness(
    state: axum::extract::State<AppState>,
) -> Result<Json<HealthStatus>, (axum::http::StatusCode, String)> {
    health(state).await
}

/// Liveness probe - checks if the service is alive (basic check)
async fn liveness() -> &'static str {
    "OK"
}
