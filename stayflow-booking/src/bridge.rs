use std::sync::{Arc, Mutex};
use stayflow_core::payment::{
    BillingDetails, ConfirmOutcome, PaymentIntent, PaymentProcessor, PaymentStatus,
};
use stayflow_gateway::endpoints::{CreateIntentRequest, IntentMetadata};
use stayflow_gateway::{ApiError, ApiGateway};

/// A created intent, ready to be confirmed with the processor.
#[derive(Debug, Clone)]
pub struct CreatedIntent {
    pub client_secret: String,
}

/// Query parameters the processor appends when it redirects the user back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectReturn {
    pub payment_intent: String,
    pub redirect_status: String,
}

impl RedirectReturn {
    /// Parse a raw query string (`payment_intent=pi_1&redirect_status=succeeded`).
    pub fn from_query(query: &str) -> Option<Self> {
        let mut payment_intent = None;
        let mut redirect_status = None;
        for pair in query.trim_start_matches('?').split('&') {
            // Pairs without '=' (bare flags, trailing '&') are ignored.
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "payment_intent" => payment_intent = Some(value.to_string()),
                "redirect_status" => redirect_status = Some(value.to_string()),
                _ => {}
            }
        }
        Some(Self {
            payment_intent: payment_intent?,
            redirect_status: redirect_status?,
        })
    }
}

/// Bridges the booking flow to the external payment processor.
///
/// Intent creation goes through the booking backend; confirmation goes to the
/// processor itself. The bridge never decides payment success on its own: the
/// backend status check in [`PaymentBridge::verify_payment`] is authoritative.
pub struct PaymentBridge {
    gateway: Arc<ApiGateway>,
    processor: Arc<dyn PaymentProcessor>,
    return_url: String,
}

impl PaymentBridge {
    pub fn new(
        gateway: Arc<ApiGateway>,
        processor: Arc<dyn PaymentProcessor>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            processor,
            return_url: return_url.into(),
        }
    }

    /// Convert a display amount to the processor's minor-unit representation.
    /// Zero or negative amounts are rejected before any network call.
    pub fn minor_units(amount: f64) -> Result<i64, PaymentError> {
        if amount <= 0.0 {
            return Err(PaymentError::InvalidAmount(amount));
        }
        Ok((amount * 100.0).round() as i64)
    }

    pub async fn create_intent(
        &self,
        amount: f64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent, PaymentError> {
        let amount_minor = Self::minor_units(amount)?;
        let resp = self
            .gateway
            .create_payment_intent(&CreateIntentRequest {
                amount: amount_minor,
                currency: currency.to_string(),
                metadata,
            })
            .await?;

        match (resp.success, resp.client_secret) {
            (true, Some(client_secret)) => Ok(CreatedIntent { client_secret }),
            _ => Err(PaymentError::IntentCreation(
                "backend did not return a client secret".to_string(),
            )),
        }
    }

    pub async fn confirm(
        &self,
        intent: &CreatedIntent,
        billing: &BillingDetails,
    ) -> Result<ConfirmOutcome, PaymentError> {
        self.processor
            .confirm_payment(&intent.client_secret, billing, &self.return_url)
            .await
            .map_err(|e| PaymentError::Processor(e.to_string()))
    }

    /// Re-validate payment status against the backend, independently of
    /// whatever the client or redirect reported.
    pub async fn verify_payment(&self, intent_id: &str) -> Result<bool, PaymentError> {
        let status = self.gateway.payment_status(intent_id).await?;
        Ok(status.is_confirmed())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("payment intent creation failed: {0}")]
    IntentCreation(String),

    #[error("processor error: {0}")]
    Processor(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Scriptable processor for tests: always yields the configured outcome.
pub struct MockProcessor {
    outcome: Mutex<ConfirmOutcome>,
}

impl MockProcessor {
    pub fn with_outcome(outcome: ConfirmOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
        }
    }

    /// Succeeds with an intent id derived from the client secret, the way the
    /// real processor echoes `pi_x` back from `pi_x_secret_y`.
    pub fn succeeding() -> Self {
        Self::with_outcome(ConfirmOutcome::Succeeded(PaymentIntent {
            id: String::new(), // filled from the client secret at confirm time
            status: PaymentStatus::Succeeded,
            amount: 0,
            currency: "usd".to_string(),
        }))
    }

    pub fn requiring_action(redirect_url: Option<String>) -> Self {
        Self::with_outcome(ConfirmOutcome::RequiresAction { redirect_url })
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_outcome(ConfirmOutcome::Failed {
            message: message.into(),
        })
    }

    pub fn set_outcome(&self, outcome: ConfirmOutcome) {
        *self.outcome.lock().expect("mock outcome lock") = outcome;
    }
}

fn intent_id_from_secret(client_secret: &str) -> String {
    client_secret
        .split("_secret")
        .next()
        .unwrap_or(client_secret)
        .to_string()
}

#[async_trait::async_trait]
impl PaymentProcessor for MockProcessor {
    async fn confirm_payment(
        &self,
        client_secret: &str,
        _billing: &BillingDetails,
        _return_url: &str,
    ) -> Result<ConfirmOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let outcome = self.outcome.lock().expect("mock outcome lock").clone();
        Ok(match outcome {
            ConfirmOutcome::Succeeded(mut intent) => {
                if intent.id.is_empty() {
                    intent.id = intent_id_from_secret(client_secret);
                }
                ConfirmOutcome::Succeeded(intent)
            }
            ConfirmOutcome::Processing(mut intent) => {
                if intent.id.is_empty() {
                    intent.id = intent_id_from_secret(client_secret);
                }
                ConfirmOutcome::Processing(intent)
            }
            other => other,
        })
    }
}
