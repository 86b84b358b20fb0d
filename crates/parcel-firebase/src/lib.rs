//! # parcel-firebase
//!
//! Firebase Authentication ID token verification for the parcel delivery
//! backend.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parcel_firebase::FirebaseTokenVerifier;
//! use parcel_core::TokenVerifier;
//!
//! // FIREBASE_PROJECT_ID selects the expected audience and issuer
//! let verifier = FirebaseTokenVerifier::from_env()?;
//!
//! let identity = verifier.verify(id_token).await?;
//! println!("uid={} email={:?}", identity.uid, identity.email);
//! ```

pub mod config;
pub mod verifier;

// Re-exports
pub use config::FirebaseConfig;
pub use verifier::FirebaseTokenVerifier;
