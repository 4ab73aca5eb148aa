use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticketing_server::auth::bootstrap_staff;
use ticketing_server::config::{Config, StorageBackend};
use ticketing_server::payment::SimulatedPayments;
use ticketing_server::routes::create_routes;
use ticketing_server::state::AppState;
use ticketing_server::store::{MemoryStore, PgStore, TicketStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ticketing_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let store: Arc<dyn TicketStore> = match config.storage {
        StorageBackend::Postgres => Arc::new(
            PgStore::connect(&config.database_url, config.max_connections)
                .await
                .expect("Failed to initialize database"),
        ),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    if let Some(admin) = &config.admin {
        bootstrap_staff(store.as_ref(), &admin.username, &admin.token)
            .await
            .expect("Failed to bootstrap staff account");
    }

    tracing::info!(outcome = ?config.payment_outcome, "Payments are simulated");
    let payments = Arc::new(SimulatedPayments::new(config.payment_outcome));

    let app = create_routes(AppState::new(store, payments), &config);

    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
