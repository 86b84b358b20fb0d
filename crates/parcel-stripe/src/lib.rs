//! # parcel-stripe
//!
//! Stripe payment gateway for the parcel delivery backend.
//!
//! **StripePaymentIntents** creates card PaymentIntents through the
//! PaymentIntents API and returns the client secret the browser needs to
//! confirm the payment with Stripe.js.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parcel_stripe::StripePaymentIntents;
//! use parcel_core::PaymentGateway;
//!
//! // Create gateway from environment (STRIPE_SECRET_KEY, STRIPE_CURRENCY)
//! let gateway = StripePaymentIntents::from_env()?;
//!
//! // Amount is in minor units: 1500 = $15.00
//! let intent = gateway.create_payment_intent(1500).await?;
//!
//! // Hand intent.client_secret to the client
//! ```

pub mod config;
pub mod intents;

// Re-exports
pub use config::StripeConfig;
pub use intents::StripePaymentIntents;
