use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresAction,
    Processing,
    Succeeded,
    Failed,
}

/// Processor-issued payment record. Not owned by this system; only observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String, // provider's id (e.g., pi_123)
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: String,
}

/// Billing details forwarded to the processor at confirmation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingDetails {
    pub name: String,
    pub email: String,
}

/// Outcome of a confirmation attempt.
///
/// Three outcomes must be handled distinctly: immediate success (or async
/// processing), a hard failure, and "requires action" where the processor
/// needs to leave the page and resume via redirect.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    Succeeded(PaymentIntent),
    Processing(PaymentIntent),
    RequiresAction { redirect_url: Option<String> },
    Failed { message: String },
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Confirm a payment intent with the external processor.
    ///
    /// `return_url` is where the processor sends the user back if it has to
    /// redirect; no in-memory state survives that navigation.
    async fn confirm_payment(
        &self,
        client_secret: &str,
        billing: &BillingDetails,
        return_url: &str,
    ) -> Result<ConfirmOutcome, Box<dyn std::error::Error + Send + Sync>>;
}
