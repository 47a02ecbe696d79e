use crate::client::ApiGateway;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stayflow_core::models::PendingBookingPayload;

// ============================================================================
// Response/request shapes for the booking backend
// ============================================================================

/// Payment type exactly as the backend sends it. Unknown kinds (`hotel` etc.)
/// are kept as strings here and filtered when building typed options.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePaymentType {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentTypesBlock {
    #[serde(default)]
    pub payment_types: Vec<WirePaymentType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrebookRate {
    pub book_hash: String,
    #[serde(default)]
    pub payment_options: PaymentTypesBlock,
    #[serde(default)]
    pub daily_prices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrebookHotel {
    #[serde(default)]
    pub rates: Vec<PrebookRate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrebookResponse {
    #[serde(default)]
    pub hotels: Vec<PrebookHotel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFormData {
    pub order_id: Option<String>,
    pub partner_order_id: Option<String>,
    pub item_id: Option<String>,
    #[serde(default)]
    pub payment_types: Vec<WirePaymentType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingFormResponse {
    pub data: Option<BookingFormData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntentMetadata {
    #[serde(rename = "hotelId")]
    pub hotel_id: String,
    #[serde(rename = "bookingDate")]
    pub booking_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateIntentRequest {
    /// Minor units (cents), already converted and validated by the caller.
    pub amount: i64,
    pub currency: String,
    pub metadata: IntentMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "clientSecret")]
    pub client_secret: Option<String>,
}

/// The backend reports payment status under either of two field names
/// depending on the processor route; treat them interchangeably.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(rename = "isSuccessful", default)]
    pub is_successful: Option<bool>,
}

impl PaymentStatusResponse {
    pub fn is_confirmed(&self) -> bool {
        self.success.unwrap_or(false) || self.is_successful.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct PrebookRequest<'a> {
    hash: &'a str,
}

#[derive(Debug, Serialize)]
struct BookingFormRequest<'a> {
    book_hash: &'a str,
    language: &'a str,
}

// ============================================================================
// Typed endpoint surface
// ============================================================================

impl ApiGateway {
    /// Lock a rate: convert a searched room offer into a re-priced quote.
    pub async fn prebook(&self, hash: &str) -> Result<PrebookResponse, ApiError> {
        self.post_json("/api/hotel/prebook", &PrebookRequest { hash })
            .await
    }

    /// Fetch the guest-form contract tied to a locked book hash.
    pub async fn booking_form(
        &self,
        book_hash: &str,
        language: &str,
    ) -> Result<BookingFormData, ApiError> {
        let resp: BookingFormResponse = self
            .post_json(
                "/api/hotel/booking/form",
                &BookingFormRequest { book_hash, language },
            )
            .await?;
        Ok(resp.data.unwrap_or_default())
    }

    pub async fn create_payment_intent(
        &self,
        req: &CreateIntentRequest,
    ) -> Result<CreateIntentResponse, ApiError> {
        self.post_json("/api/payment/payment-intent", req).await
    }

    /// Independent payment-status check. The redirect/confirmation result can
    /// be spoofed or stale; only this answer is trusted.
    pub async fn payment_status(&self, intent_id: &str) -> Result<PaymentStatusResponse, ApiError> {
        self.get_json(&format!("/api/payment/payment-status/{intent_id}"))
            .await
    }

    /// Finalize: convert a paid, locked quote into a confirmed reservation.
    pub async fn finish_booking(&self, payload: &PendingBookingPayload) -> Result<Value, ApiError> {
        self.post_json("/api/hotel/booking/finish", payload).await
    }
}
