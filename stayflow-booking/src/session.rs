use crate::bridge::{PaymentBridge, PaymentError, RedirectReturn};
use crate::payload::build_finalize_payload;
use serde_json::Value;
use std::sync::Arc;
use stayflow_core::models::{
    select_payment_option, BookingQuote, FormContract, GuestDetails, NameField, PaymentKind,
    RoomOccupancy,
};
use stayflow_core::payment::{BillingDetails, ConfirmOutcome};
use stayflow_core::store::PendingStore;
use stayflow_core::CoreError;
use stayflow_gateway::endpoints::IntentMetadata;
use stayflow_gateway::{ApiError, ApiGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    CollectingGuestData,
    ReadyForPayment,
    AwaitingPaymentConfirmation,
    Finalizing,
    Completed,
    Failed,
}

/// Everything the session needs from the surrounding application, passed in
/// explicitly at construction. No ambient globals.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_email: String,
    pub hotel_id: String,
    pub search_rooms: Vec<RoomOccupancy>,
    pub language: String,
}

/// Signal handed back to the caller when a flow step completes.
#[derive(Debug, Clone)]
pub enum FlowSignal {
    Completed { reservation: Value },
    /// The processor needs to leave the page; the flow resumes via
    /// [`BookingSession::resume_after_redirect`] in a fresh process.
    RedirectPending,
    /// Processor-reported failure, terminal for this attempt. The user may
    /// restart from `ReadyForPayment` with the same pending payload.
    PaymentError { message: String },
}

/// The multi-step booking flow controller.
///
/// Collects guest data, transitions to payment, and finalizes the
/// reservation once payment is confirmed. The central correctness rule: the
/// pending payload is cleared only on successful finalize and retained on
/// every failure after payment capture, so a retry resubmits exactly the
/// payload payment was authorized against.
pub struct BookingSession {
    state: SessionState,
    context: SessionContext,
    quote: Option<BookingQuote>,
    contract: FormContract,
    guests: GuestDetails,
    gateway: Arc<ApiGateway>,
    store: Arc<dyn PendingStore>,
    last_intent_id: Option<String>,
    processor_result_seen: bool,
    payment_captured: bool,
    reservation: Option<Value>,
    failure: Option<String>,
}

impl BookingSession {
    pub fn new(
        context: SessionContext,
        quote: BookingQuote,
        contract: FormContract,
        gateway: Arc<ApiGateway>,
        store: Arc<dyn PendingStore>,
    ) -> Self {
        let guests = GuestDetails::for_rooms(context.search_rooms.len());
        Self {
            state: SessionState::CollectingGuestData,
            context,
            quote: Some(quote),
            contract,
            guests,
            gateway,
            store,
            last_intent_id: None,
            processor_result_seen: false,
            payment_captured: false,
            reservation: None,
            failure: None,
        }
    }

    /// Rebuild a session after a processor redirect wiped the process.
    ///
    /// Only the pending-transaction store survives that boundary; the session
    /// comes back in `AwaitingPaymentConfirmation` and finalizes from the
    /// stored payload, never from rebuilt form state.
    pub fn resume(
        context: SessionContext,
        gateway: Arc<ApiGateway>,
        store: Arc<dyn PendingStore>,
    ) -> Self {
        let guests = GuestDetails::for_rooms(context.search_rooms.len());
        Self {
            state: SessionState::AwaitingPaymentConfirmation,
            context,
            quote: None,
            contract: FormContract::fallback(),
            guests,
            gateway,
            store,
            last_intent_id: None,
            processor_result_seen: true,
            payment_captured: false,
            reservation: None,
            failure: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn guests(&self) -> &GuestDetails {
        &self.guests
    }

    pub fn reservation(&self) -> Option<&Value> {
        self.reservation.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    // ------------------------------------------------------------------
    // Guest data collection
    // ------------------------------------------------------------------

    pub fn set_primary_guest(
        &mut self,
        room: usize,
        field: NameField,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.editable()?;
        self.guests.set_primary(room, field, value)?;
        Ok(())
    }

    pub fn set_additional_guest(
        &mut self,
        room: usize,
        guest: usize,
        field: NameField,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.editable()?;
        self.guests.set_additional_guest(room, guest, field, value)?;
        Ok(())
    }

    pub fn set_child_guest(
        &mut self,
        room: usize,
        child: usize,
        field: NameField,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.editable()?;
        self.guests.set_child_guest(room, child, field, value)?;
        Ok(())
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) -> Result<(), SessionError> {
        self.editable()?;
        self.guests.set_phone(phone);
        Ok(())
    }

    pub fn set_special_requests(&mut self, requests: impl Into<String>) -> Result<(), SessionError> {
        self.editable()?;
        self.guests.set_special_requests(requests);
        Ok(())
    }

    fn editable(&self) -> Result<(), SessionError> {
        if self.state == SessionState::CollectingGuestData {
            Ok(())
        } else {
            Err(SessionError::GuestDataLocked(self.state))
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// `CollectingGuestData -> ReadyForPayment`. The lead guest of room 0
    /// must be fully named; phone is checked later, at payment initiation.
    pub fn proceed_to_payment(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::CollectingGuestData {
            return Err(self.invalid(SessionState::ReadyForPayment));
        }
        if !self.guests.has_primary_name(0) {
            return Err(SessionError::MissingPrimaryGuestName);
        }
        self.state = SessionState::ReadyForPayment;
        Ok(())
    }

    /// Navigate backwards. Allowed until a processor result is received;
    /// once finalization begins there is no way back.
    pub fn back(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::ReadyForPayment => {
                self.state = SessionState::CollectingGuestData;
                Ok(())
            }
            SessionState::AwaitingPaymentConfirmation if !self.processor_result_seen => {
                self.state = SessionState::ReadyForPayment;
                Ok(())
            }
            _ => Err(self.invalid(SessionState::ReadyForPayment)),
        }
    }

    /// The "pay now" figure shown to the user: the full/now USD option. The
    /// deposit option (if any) is what the finalize payload carries; the two
    /// legitimately differ and are never conflated.
    pub fn pay_now_amount(&self) -> Result<f64, SessionError> {
        let options = if !self.contract.payment_types.is_empty() {
            &self.contract.payment_types
        } else {
            match &self.quote {
                Some(q) => &q.payment_options,
                None => return Err(SessionError::QuoteNotLocked),
            }
        };
        let option = select_payment_option(options, PaymentKind::Now)
            .ok_or(SessionError::MissingPayNowOption)?;
        option
            .amount_value()
            .ok_or_else(|| SessionError::BadAmount(option.amount.clone()))
    }

    /// `ReadyForPayment -> AwaitingPaymentConfirmation -> ...`
    ///
    /// Builds the finalize payload and persists it *before* the confirmation
    /// call goes out: a redirect can interrupt confirmation at any point with
    /// no further code running until the return navigation.
    pub async fn request_payment(
        &mut self,
        bridge: &PaymentBridge,
    ) -> Result<FlowSignal, SessionError> {
        if self.state != SessionState::ReadyForPayment {
            return Err(self.invalid(SessionState::AwaitingPaymentConfirmation));
        }
        // Both guards must hold at the moment the payload is built.
        if !self.guests.has_primary_name(0) {
            return Err(SessionError::MissingPrimaryGuestName);
        }
        if self.guests.phone.trim().is_empty() {
            return Err(SessionError::MissingPhone);
        }
        let quote = self.quote.as_ref().ok_or(SessionError::QuoteNotLocked)?;
        let amount = self.pay_now_amount()?;

        let built = build_finalize_payload(
            quote,
            &self.contract,
            &self.guests,
            &self.context.user_email,
            &self.context.language,
        );
        if built.deposit_missing {
            tracing::warn!(
                quote_id = %quote.quote_id,
                "quote has no deposit option; finalize payload will omit payment_type"
            );
        }

        let intent = bridge
            .create_intent(
                amount,
                "usd",
                IntentMetadata {
                    hotel_id: self.context.hotel_id.clone(),
                    booking_date: chrono::Utc::now().to_rfc3339(),
                },
            )
            .await?;

        // Write-before-send: the store is the only state that survives a
        // redirect inside the confirmation call.
        self.store
            .put(&built.payload)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;
        self.state = SessionState::AwaitingPaymentConfirmation;

        let billing = BillingDetails {
            name: self
                .guests
                .primary_full_name(0)
                .unwrap_or_else(|| "Guest".to_string()),
            email: self.context.user_email.clone(),
        };

        let outcome = match bridge.confirm(&intent, &billing).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.fail(err.to_string());
                return Err(err.into());
            }
        };

        match outcome {
            ConfirmOutcome::Succeeded(intent) | ConfirmOutcome::Processing(intent) => {
                self.processor_result_seen = true;
                self.finalize(bridge, &intent.id).await
            }
            ConfirmOutcome::RequiresAction { .. } => {
                self.processor_result_seen = true;
                tracing::info!("processor requires redirect; flow resumes after return");
                Ok(FlowSignal::RedirectPending)
            }
            ConfirmOutcome::Failed { message } => {
                self.processor_result_seen = true;
                self.fail(message.clone());
                Ok(FlowSignal::PaymentError { message })
            }
        }
    }

    /// `AwaitingPaymentConfirmation -> Finalizing -> Completed | Failed`.
    ///
    /// Entry re-validates payment status against the backend independently of
    /// the client-reported result, then submits the *stored* payload.
    pub async fn finalize(
        &mut self,
        bridge: &PaymentBridge,
        intent_id: &str,
    ) -> Result<FlowSignal, SessionError> {
        if self.state != SessionState::AwaitingPaymentConfirmation {
            return Err(self.invalid(SessionState::Finalizing));
        }
        self.last_intent_id = Some(intent_id.to_string());
        self.state = SessionState::Finalizing;
        self.run_finalize(bridge, intent_id).await
    }

    /// Re-enter finalization after a post-payment failure. Re-pay is never
    /// required: the retained payload is resubmitted as-is.
    pub async fn retry_finalize(
        &mut self,
        bridge: &PaymentBridge,
    ) -> Result<FlowSignal, SessionError> {
        if self.state != SessionState::Failed || !self.payment_captured {
            return Err(self.invalid(SessionState::Finalizing));
        }
        let intent_id = self
            .last_intent_id
            .clone()
            .ok_or(SessionError::MissingPaymentIntent)?;
        self.state = SessionState::Finalizing;
        self.failure = None;
        self.run_finalize(bridge, &intent_id).await
    }

    /// After a processor-reported payment failure the user may try again
    /// from `ReadyForPayment`; the pending payload is untouched.
    pub fn restart_payment(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Failed || self.payment_captured {
            return Err(self.invalid(SessionState::ReadyForPayment));
        }
        self.state = SessionState::ReadyForPayment;
        self.failure = None;
        Ok(())
    }

    /// Resume after the processor redirected back. The `redirect_status`
    /// query parameter is recorded but never trusted; the backend status
    /// check in finalize decides.
    pub async fn resume_after_redirect(
        &mut self,
        bridge: &PaymentBridge,
        query: &str,
    ) -> Result<FlowSignal, SessionError> {
        if self.state != SessionState::AwaitingPaymentConfirmation {
            return Err(self.invalid(SessionState::Finalizing));
        }
        let ret =
            RedirectReturn::from_query(query).ok_or(SessionError::MalformedRedirectReturn)?;
        self.processor_result_seen = true;
        tracing::info!(
            intent_id = %ret.payment_intent,
            redirect_status = %ret.redirect_status,
            "returned from processor redirect"
        );
        self.finalize(bridge, &ret.payment_intent).await
    }

    async fn run_finalize(
        &mut self,
        bridge: &PaymentBridge,
        intent_id: &str,
    ) -> Result<FlowSignal, SessionError> {
        let confirmed = match bridge.verify_payment(intent_id).await {
            Ok(confirmed) => confirmed,
            Err(err) => {
                self.fail(err.to_string());
                return Err(err.into());
            }
        };
        if !confirmed {
            tracing::warn!(intent_id, "backend did not confirm payment; refusing to finalize");
            self.fail("payment not confirmed by backend");
            return Err(SessionError::PaymentNotConfirmed);
        }
        self.payment_captured = true;

        let payload = match self.store.get().await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.fail("booking data not found");
                return Err(SessionError::PendingPayloadMissing);
            }
            Err(err) => {
                self.fail(err.to_string());
                return Err(SessionError::Store(err.to_string()));
            }
        };

        match self.gateway.finish_booking(&payload).await {
            Ok(reservation) => {
                if let Err(err) = self.store.clear().await {
                    tracing::warn!(%err, "failed to clear pending payload after finalize");
                }
                self.state = SessionState::Completed;
                self.reservation = Some(reservation.clone());
                tracing::info!("booking finalized");
                Ok(FlowSignal::Completed { reservation })
            }
            Err(err) => {
                // Payment is captured but the reservation is not confirmed:
                // retain the payload so a retry resubmits it unchanged.
                tracing::error!(%err, "finalize failed after captured payment; payload retained");
                self.fail(err.to_string());
                Err(SessionError::PaymentCapturedUnconfirmed(err))
            }
        }
    }

    fn fail(&mut self, reason: impl Into<String>) {
        self.state = SessionState::Failed;
        self.failure = Some(reason.into());
    }

    fn invalid(&self, to: SessionState) -> SessionError {
        SessionError::InvalidTransition {
            from: self.state,
            to,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    #[error("guest details can no longer be edited in state {0:?}")]
    GuestDataLocked(SessionState),

    #[error(transparent)]
    Guest(#[from] CoreError),

    #[error("lead guest first and last name are required")]
    MissingPrimaryGuestName,

    #[error("phone number is required")]
    MissingPhone,

    #[error("no pay-now USD option available to price this booking")]
    MissingPayNowOption,

    #[error("pay-now amount {0:?} is not a valid decimal")]
    BadAmount(String),

    #[error("no rate is locked for this session")]
    QuoteNotLocked,

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("pending store error: {0}")]
    Store(String),

    #[error("payment was not confirmed by the backend")]
    PaymentNotConfirmed,

    #[error("booking data not found; the pending payload is missing")]
    PendingPayloadMissing,

    #[error("no payment intent recorded for this session")]
    MissingPaymentIntent,

    #[error("redirect return is missing payment_intent or redirect_status")]
    MalformedRedirectReturn,

    #[error("payment captured but booking not confirmed: {0}")]
    PaymentCapturedUnconfirmed(#[source] ApiError),
}
