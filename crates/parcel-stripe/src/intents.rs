//! # Stripe Payment Intents
//!
//! `PaymentGateway` over Stripe's PaymentIntents API. The server creates a
//! card intent and hands the client secret back; confirmation happens in
//! the browser with Stripe.js.

use crate::config::StripeConfig;
use async_trait::async_trait;
use parcel_core::{
    validate_amount, DeliveryError, DeliveryResult, PaymentGateway, PaymentIntent,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe PaymentIntents gateway
pub struct StripePaymentIntents {
    config: StripeConfig,
    client: Client,
}

impl StripePaymentIntents {
    /// Create a new gateway
    pub fn new(config: StripeConfig) -> DeliveryResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                DeliveryError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(
            "Stripe gateway ready ({} mode, {})",
            if config.is_test_mode() { "test" } else { "live" },
            config.currency
        );

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> DeliveryResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    /// Form body for a card-only intent
    fn intent_form(&self, amount: i64) -> Vec<(&'static str, String)> {
        vec![
            ("amount", amount.to_string()),
            ("currency", self.config.currency.clone()),
            ("payment_method_types[]", "card".to_string()),
        ]
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentIntents {
    #[instrument(skip(self), fields(currency = %self.config.currency))]
    async fn create_payment_intent(&self, amount: i64) -> DeliveryResult<PaymentIntent> {
        validate_amount(amount)?;

        let url = format!("{}/v1/payment_intents", self.config.api_base_url);
        let idempotency_key = uuid::Uuid::new_v4().to_string();

        debug!("Creating Stripe payment intent: amount={}", amount);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &idempotency_key)
            .form(&self.intent_form(amount))
            .send()
            .await
            .map_err(|e| gateway_error(format!("Stripe request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| gateway_error(format!("Stripe response unreadable: {}", e)))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            // Parse Stripe error
            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(gateway_error(error_response.error.message));
            }

            return Err(gateway_error(format!("HTTP {}: {}", status, body)));
        }

        let intent: StripePaymentIntentResponse = serde_json::from_str(&body).map_err(|e| {
            DeliveryError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            gateway_error(format!("Payment intent {} has no client secret", intent.id))
        })?;

        info!("Created Stripe payment intent: id={}", intent.id);

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
            amount: intent.amount.unwrap_or(amount),
            currency: intent
                .currency
                .unwrap_or_else(|| self.config.currency.clone()),
            status: intent.status,
        })
    }

    fn currency(&self) -> &str {
        &self.config.currency
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

fn gateway_error(message: impl Into<String>) -> DeliveryError {
    DeliveryError::Gateway {
        provider: PROVIDER.to_string(),
        message: message.into(),
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STRIPE_API_VERSION;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer) -> StripePaymentIntents {
        let config = StripeConfig::new("sk_test_abc123").with_api_base_url(server.uri());
        StripePaymentIntents::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_creates_card_intent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Authorization", "Bearer sk_test_abc123"))
            .and(header("Stripe-Version", STRIPE_API_VERSION))
            .and(header_exists("Idempotency-Key"))
            .and(body_string_contains("amount=1500"))
            .and(body_string_contains("currency=usd"))
            .and(body_string_contains("payment_method_types%5B%5D=card"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_123",
                "object": "payment_intent",
                "amount": 1500,
                "currency": "usd",
                "client_secret": "pi_123_secret_456",
                "status": "requires_payment_method"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let intent = gateway_for(&server).create_payment_intent(1500).await.unwrap();

        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret, "pi_123_secret_456");
        assert_eq!(intent.amount, 1500);
        assert_eq!(intent.currency, "usd");
        assert_eq!(intent.status.as_deref(), Some("requires_payment_method"));
    }

    #[tokio::test]
    async fn test_stripe_error_message_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "type": "invalid_request_error",
                    "code": "amount_too_small",
                    "message": "Amount must be at least $0.50 usd",
                    "param": "amount"
                }
            })))
            .mount(&server)
            .await;

        let err = gateway_for(&server).create_payment_intent(10).await.unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Amount must be at least $0.50 usd");
    }

    #[tokio::test]
    async fn test_unparseable_error_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = gateway_for(&server).create_payment_intent(500).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Gateway { .. }));
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_non_positive_amount_never_reaches_stripe() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = gateway_for(&server).create_payment_intent(0).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_configured_currency() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(body_string_contains("currency=bdt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_9",
                "client_secret": "pi_9_secret"
            })))
            .mount(&server)
            .await;

        let config = StripeConfig::new("sk_test_abc123")
            .with_api_base_url(server.uri())
            .with_currency("bdt");
        let gateway = StripePaymentIntents::new(config).unwrap();

        assert_eq!(gateway.currency(), "bdt");
        let intent = gateway.create_payment_intent(2000).await.unwrap();
        assert_eq!(intent.amount, 2000);
        assert_eq!(intent.currency, "bdt");
    }
}
