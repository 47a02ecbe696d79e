pub mod bridge;
pub mod payload;
pub mod quote;
pub mod session;

pub use bridge::{CreatedIntent, MockProcessor, PaymentBridge, PaymentError, RedirectReturn};
pub use payload::{build_finalize_payload, BuiltPayload};
pub use quote::{RateLockManager, RateLockError};
pub use session::{BookingSession, FlowSignal, SessionContext, SessionError, SessionState};
