pub mod client;
pub mod endpoints;
pub mod error;

pub use client::ApiGateway;
pub use endpoints::{
    BookingFormData, CreateIntentRequest, CreateIntentResponse, IntentMetadata, PrebookRate,
    PrebookResponse, PaymentStatusResponse, UserProfile,
};
pub use error::ApiError;
