//! # parcel-core
//!
//! Core types and traits for the parcel delivery backend.
//!
//! This crate provides:
//! - `DocumentStore` trait for storage backends, plus `MemoryStore`
//! - `PaymentGateway` trait for payment providers
//! - `TokenVerifier` trait for identity providers
//! - `AuthPolicy` for per-endpoint authorization gates
//! - Parcel, user, rider, transaction and tracking models
//! - `DeliveryError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use parcel_core::{parcel, Collection, DocumentStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//!
//! // Validate a request body and store it
//! let parcel = new_parcel.into_parcel(chrono::Utc::now())?;
//! let outcome = store.insert_one(Collection::Parcels, to_document(&parcel)?).await?;
//!
//! // List a customer's parcels, newest first
//! let parcels = store
//!     .find(Collection::Parcels, &parcel::owner_query(Some("a@example.com")))
//!     .await?;
//! ```

pub mod error;
pub mod gateway;
pub mod identity;
pub mod memory;
pub mod parcel;
pub mod payment;
pub mod policy;
pub mod required;
pub mod rider;
pub mod store;
pub mod timestamp;
pub mod tracking;
pub mod user;

// Re-exports for convenience
pub use error::{DeliveryError, DeliveryResult, GENERIC_SERVER_ERROR};
pub use gateway::{validate_amount, BoxedPaymentGateway, PaymentGateway, PaymentIntent};
pub use identity::{bearer_token, BoxedTokenVerifier, Identity, StaticTokenVerifier, TokenVerifier};
pub use memory::MemoryStore;
pub use parcel::{NewParcel, Parcel, PaymentStatus};
pub use payment::{PaymentRecord, Transaction};
pub use policy::{AuthPolicy, Endpoint, Gate, PolicyPreset};
pub use required::RequiredFields;
pub use rider::{NewRider, Rider, RiderStatus, RiderStatusChange};
pub use store::{
    document_id, to_document, BoxedDocumentStore, Collection, DeleteOutcome,
    Document, DocumentId, DocumentStore, InsertOutcome, Query, SortBy, SortDirection,
    UpdateOutcome, ID_FIELD,
};
pub use tracking::{TrackingEvent, TrackingUpdate};
pub use user::{User, UserLogin};
