use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post, put},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use gemstore_api_server::auth::{middleware::require_auth, JwtManager};
use gemstore_api_server::config::Settings;
use gemstore_api_server::database::{DbPool, Repository};
use gemstore_api_server::handlers;
use gemstore_api_server::logging::{AuditLogger, AuditLoggerConfig};
use gemstore_api_server::services::{AuthService, ProductService, SkuService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,gemstore_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting gemstore API server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("Configuration loaded");

    // Initialize database pool and schema
    let db_pool = DbPool::new(&settings.database).await?;
    info!("Database connection established");

    let repository = Arc::new(Repository::new(db_pool.clone()));
    repository.ensure_schema().await?;

    // Initialize services
    let jwt_manager = Arc::new(JwtManager::new(
        &settings.auth.jwt_secret,
        settings.auth.token_expiration_seconds,
    ));

    let sku_service = Arc::new(SkuService::new(repository.clone()));

    let product_service = Arc::new(ProductService::new(
        repository.clone(),
        sku_service,
        settings.uploads.clone(),
    ));

    let auth_service = Arc::new(AuthService::new(repository.clone(), jwt_manager.clone()));

    let audit = Arc::new(AuditLogger::new(
        db_pool.get_pool().clone(),
        AuditLoggerConfig::default(),
    ));

    // Build router
    let app = build_router(
        settings.clone(),
        repository,
        jwt_manager,
        product_service,
        auth_service,
        audit,
    );

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(
    settings: Settings,
    repository: Arc<Repository>,
    jwt_manager: Arc<JwtManager>,
    product_service: Arc<ProductService>,
    auth_service: Arc<AuthService>,
    audit: Arc<AuditLogger>,
) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/api/auth/register", post(handlers::auth::register_handler))
        .route("/api/auth/login", post(handlers::auth::login_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route(
            "/api/vendors",
            get(handlers::vendors::list_vendors_handler)
                .post(handlers::vendors::create_vendor_handler),
        )
        .route(
            "/api/vendors/{id}",
            get(handlers::vendors::get_vendor_handler)
                .put(handlers::vendors::update_vendor_handler),
        )
        .route(
            "/api/vendors/{id}/status",
            patch(handlers::vendors::set_vendor_status_handler),
        )
        .route(
            "/api/products",
            get(handlers::products::list_products_handler)
                .post(handlers::products::create_product_handler),
        )
        .route(
            "/api/products/{id}",
            get(handlers::products::get_product_handler)
                .put(handlers::products::update_product_handler)
                .delete(handlers::products::delete_product_handler),
        )
        .route(
            "/api/stones",
            get(handlers::stones::list_stones_handler)
                .post(handlers::stones::create_stone_handler),
        )
        .route(
            "/api/stones/{id}",
            get(handlers::stones::get_stone_handler)
                .put(handlers::stones::update_stone_handler)
                .delete(handlers::stones::delete_stone_handler),
        )
        .route(
            "/api/categories",
            get(handlers::categories::list_categories_handler)
                .post(handlers::categories::create_category_handler),
        )
        .route(
            "/api/categories/{id}",
            get(handlers::categories::get_category_handler)
                .put(handlers::categories::update_category_handler)
                .delete(handlers::categories::delete_category_handler),
        )
        .route(
            "/api/stores",
            get(handlers::stores::list_stores_handler)
                .post(handlers::stores::create_store_handler),
        )
        .route(
            "/api/stores/{id}",
            get(handlers::stores::get_store_handler)
                .put(handlers::stores::update_store_handler)
                .delete(handlers::stores::delete_store_handler),
        )
        .route(
            "/api/ledger",
            get(handlers::ledger::ledger_report_handler)
                .post(handlers::ledger::create_ledger_entry_handler),
        )
        .route(
            "/api/ledger/export",
            get(handlers::ledger::ledger_export_handler),
        )
        .route(
            "/api/ledger/{id}",
            put(handlers::ledger::update_ledger_entry_handler)
                .delete(handlers::ledger::delete_ledger_entry_handler),
        )
        .route(
            "/api/dashboard/summary",
            get(handlers::dashboard::summary_handler),
        )
        .layer(middleware::from_fn(require_auth));

    // Combine routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Uploaded product images
        .nest_service("/uploads", ServeDir::new(&settings.uploads.dir))
        // Shared state
        .layer(Extension(repository))
        .layer(Extension(jwt_manager))
        .layer(Extension(product_service))
        .layer(Extension(auth_service))
        .layer(Extension(audit))
        .layer(Extension(settings))
        // CORS
        .layer(
            CorsLayer::permissive()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        // Body limit (5 image files at 4MB each, plus form fields)
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
}
