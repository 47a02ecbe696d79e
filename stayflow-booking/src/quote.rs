use std::sync::Arc;
use stayflow_core::models::{
    select_payment_option, BookingQuote, FormContract, PaymentKind, PaymentOption, RoomOccupancy,
    RoomOffer,
};
use stayflow_gateway::endpoints::WirePaymentType;
use stayflow_gateway::{ApiError, ApiGateway};
use uuid::Uuid;

/// Converts a selected room offer into a time-bounded, re-confirmed quote and
/// retrieves the guest-form contract tied to it.
pub struct RateLockManager {
    gateway: Arc<ApiGateway>,
    language: String,
}

impl RateLockManager {
    pub fn new(gateway: Arc<ApiGateway>, language: impl Into<String>) -> Self {
        Self {
            gateway,
            language: language.into(),
        }
    }

    /// Lock a rate hash surfaced by a prior search.
    ///
    /// Failure here is recoverable: no partial state is retained, the caller
    /// simply re-invokes with the same hash. Re-locking always yields a fresh
    /// quote; quotes are superseded, never mutated.
    pub async fn lock_rate(
        &self,
        book_hash: &str,
        search_rooms: &[RoomOccupancy],
    ) -> Result<BookingQuote, RateLockError> {
        let resp = self.gateway.prebook(book_hash).await?;
        let rate = resp
            .hotels
            .first()
            .and_then(|h| h.rates.first())
            .ok_or(RateLockError::NoRatesReturned)?;

        let payment_options = parse_payment_types(&rate.payment_options.payment_types);
        if select_payment_option(&payment_options, PaymentKind::Now).is_none() {
            return Err(RateLockError::MissingPayNowOption);
        }

        let room_offers = search_rooms
            .iter()
            .map(|occupancy| RoomOffer {
                occupancy: occupancy.clone(),
                nightly_prices: rate.daily_prices.clone(),
            })
            .collect();

        Ok(BookingQuote {
            quote_id: Uuid::new_v4(),
            book_hash: rate.book_hash.clone(),
            room_offers,
            payment_options,
            expires_at: None,
        })
    }

    /// Fetch the backend-declared guest-form shape for a locked quote.
    ///
    /// Non-fatal to quote validity: on any error the flow proceeds with the
    /// default single-guest contract (which carries no order identifiers).
    pub async fn fetch_guest_form_contract(&self, quote: &BookingQuote) -> FormContract {
        match self
            .gateway
            .booking_form(&quote.book_hash, &self.language)
            .await
        {
            Ok(data) => FormContract {
                order_id: data.order_id,
                partner_order_id: data.partner_order_id,
                item_id: data.item_id,
                payment_types: parse_payment_types(&data.payment_types),
            },
            Err(err) => {
                tracing::warn!(%err, "guest form contract unavailable, using default form");
                FormContract::fallback()
            }
        }
    }
}

/// Map wire payment types to the typed options the flow understands,
/// dropping kinds it does not (e.g. pay-at-hotel).
fn parse_payment_types(wire: &[WirePaymentType]) -> Vec<PaymentOption> {
    wire.iter()
        .filter_map(|pt| {
            let kind = match pt.kind.as_str() {
                "now" => PaymentKind::Now,
                "deposit" => PaymentKind::Deposit,
                _ => return None,
            };
            Some(PaymentOption {
                kind,
                amount: pt.amount.clone(),
                currency_code: pt.currency_code.clone(),
            })
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum RateLockError {
    #[error("pre-booking returned no rates for this offer")]
    NoRatesReturned,

    #[error("locked rate has no pay-now USD option")]
    MissingPayNowOption,

    #[error(transparent)]
    Api(#[from] ApiError),
}
