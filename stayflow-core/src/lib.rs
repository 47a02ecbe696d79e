pub mod models;
pub mod payment;
pub mod store;

pub use models::{
    BookingQuote, FormContract, GuestDetails, GuestName, NameField, PaymentKind, PaymentOption,
    PendingBookingPayload, RoomGuests, RoomOccupancy, RoomOffer,
};
pub use payment::{BillingDetails, ConfirmOutcome, PaymentIntent, PaymentProcessor, PaymentStatus};
pub use store::PendingStore;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("room index {0} out of range")]
    RoomIndexOutOfRange(usize),
}

pub type CoreResult<T> = Result<T, CoreError>;
