use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;

use botteghino::config::Config;
use botteghino::engine::Engine;
use botteghino::handlers::AppState;
use botteghino::routes::create_routes;
use botteghino::store::EventStore;
use botteghino::transport::http::HttpTransport;
use botteghino::transport::ChatTransport;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("Invalid DATABASE_URL")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    tokio::fs::create_dir_all(&config.media_dir)
        .await
        .expect("Failed to create media directory");

    let transport: Arc<dyn ChatTransport> =
        Arc::new(HttpTransport::new(config.gateway_url.clone()));
    let engine = Arc::new(Engine::new(EventStore::new(pool), transport, &config));
    let app: Router = create_routes(AppState { engine });

    let addr = SocketAddr::from_str(&config.bind_addr).expect("Invalid BIND_ADDR");
    tracing::info!("🚀 Bot engine running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
