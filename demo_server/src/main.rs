//! Demo server: loads endpoint definitions from `ENDPOINTS_DIR`, registers them, mounts the health routes and serves.
//!
//! Run from repo root: `cargo run -p demo-server`

use axum::Router;
use sqlroute::{
    common_routes_with_ready, load_definitions, AppState, JwtVerifier, PgDataAccess, Registrar, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sqlroute=info,demo_server=info")),
        )
        .init();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;
    let verifier = JwtVerifier::new(settings.auth.secret_key.clone());
    let listen_addr = settings.listen_addr.clone();
    let endpoints_dir = settings.endpoints_dir.clone();
    let state = AppState::new(Arc::new(PgDataAccess::new(pool)), Arc::new(verifier), settings);

    let definitions = match load_definitions(&endpoints_dir).await {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(error = %e, "could not load endpoint definitions");
            std::process::exit(1);
        }
    };
    let mut registrar = Registrar::new(state.clone());
    if let Err(e) = registrar.register_all(&definitions) {
        tracing::error!(error = %e, "endpoint registration failed");
        std::process::exit(1);
    }

    let app = Router::new()
        .merge(common_routes_with_ready(state))
        .merge(registrar.into_router());

    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
