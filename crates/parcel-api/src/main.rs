//! # Parcel Server
//!
//! REST backend for parcel delivery: parcels, riders, payments and tracking.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export MONGODB_URI=mongodb+srv://...
//! export STRIPE_SECRET_KEY=sk_test_...
//! export FIREBASE_PROJECT_ID=my-project
//!
//! # Run the server
//! parcel-server
//! ```

use parcel_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    // Print banner
    print_banner();

    // Initialize application state
    let state = AppState::new().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Document store: {}", state.store.backend_name());
    info!(
        "Payment gateway: {} ({})",
        state.payments.provider_name(),
        state.payments.currency()
    );
    info!(
        "Auth: {} with {:?} policy, {} gated endpoints",
        state.verifier.provider_name(),
        state.policy.base_preset(),
        state.policy.gated_count()
    );

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Parcel server starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Parcels: GET http://{}/parcels?email=...", addr);
        info!("Payments: POST http://{}/create-payment-intent", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  📦 Parcel Delivery Server
  ━━━━━━━━━━━━━━━━━━━━━━━━━
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
