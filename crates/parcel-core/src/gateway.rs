//! # Payment Gateway Trait
//!
//! Strategy trait for payment providers. The server only creates payment
//! intents; the client completes the payment with the returned secret.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   PaymentGateway (trait)                    │
//! │  ├── create_payment_intent()                                │
//! │  ├── currency()                                             │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴────────┐
//!                    │ StripePayment  │
//!                    │    Intents     │
//!                    └────────────────┘
//! ```

use crate::error::{DeliveryError, DeliveryResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A gateway-side payment in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider's intent id (e.g. `pi_...`)
    pub id: String,
    /// Secret the client uses to confirm the payment
    pub client_secret: String,
    /// Amount in minor currency units
    pub amount: i64,
    /// Lowercase ISO currency code
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a card payment intent for `amount` minor units of the
    /// gateway's currency.
    async fn create_payment_intent(&self, amount: i64) -> DeliveryResult<PaymentIntent>;

    /// Currency every intent is created in
    fn currency(&self) -> &str;

    /// Get the provider name (for logging and routing).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Reject amounts the gateway would refuse anyway
pub fn validate_amount(amount: i64) -> DeliveryResult<()> {
    if amount <= 0 {
        return Err(DeliveryError::Validation(
            "amount must be a positive integer in minor currency units".to_string(),
        ));
    }
    Ok(())
}
