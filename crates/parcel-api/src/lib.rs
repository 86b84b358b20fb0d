//! # parcel-api
//!
//! HTTP API layer for the parcel delivery backend.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for users, parcels, riders, payments and tracking
//! - Bearer-token interceptors driven by the configured auth policy
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Liveness banner |
//! | GET | `/health` | Health check |
//! | POST | `/users` | Register or refresh a user |
//! | GET | `/parcels?email=` | List parcels, newest first |
//! | GET | `/parcels/{id}` | Get parcel |
//! | POST | `/parcels` | Create parcel |
//! | DELETE | `/parcels/{id}` | Delete parcel |
//! | GET | `/riders?status=` | List riders |
//! | POST | `/riders` | Submit rider application |
//! | PATCH | `/riders/status/{id}` | Change rider status |
//! | POST | `/create-payment-intent` | Create payment intent |
//! | POST | `/payments` | Record payment, mark parcel paid |
//! | GET | `/payments?email=` | List payments, newest first |
//! | GET | `/tracking?trackingId=` | Tracking history, newest first |
//! | POST | `/tracking` | Add tracking event |

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
