//! # parcel-mongo
//!
//! MongoDB storage backend for the parcel delivery backend.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parcel_mongo::MongoStore;
//! use parcel_core::{parcel, Collection, DocumentStore};
//!
//! // Connect using MONGODB_URI (or DB_USER / DB_PASSWORD / DB_HOST)
//! let store = MongoStore::from_env().await?;
//!
//! let parcels = store
//!     .find(Collection::Parcels, &parcel::owner_query(Some("a@example.com")))
//!     .await?;
//! ```

pub mod config;
pub mod convert;
pub mod store;

// Re-exports
pub use config::MongoConfig;
pub use store::MongoStore;
