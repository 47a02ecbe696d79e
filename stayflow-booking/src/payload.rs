use stayflow_core::models::{
    select_payment_option, BookingQuote, ContactInfo, FormContract, GuestDetails, PartnerInfo,
    PaymentKind, PayloadGuest, PayloadRoom, PendingBookingPayload, RoomGuests,
};

/// The finalize payload plus anything the caller must surface about how it
/// was built.
#[derive(Debug, Clone)]
pub struct BuiltPayload {
    pub payload: PendingBookingPayload,
    /// Set when the quote carries no deposit option. The payload then goes
    /// out without a `payment_type`; callers log this instead of sending it
    /// silently.
    pub deposit_missing: bool,
}

/// Build the finalize request body deterministically from the current guest
/// details and locked quote.
///
/// Guest ordering per room is a contract with the backend and must not
/// change: lead guest first, then additional adult guests, then children.
/// Rooms follow quote/room order. Fully blank extra entries are skipped; the
/// lead guest is always included as entered.
pub fn build_finalize_payload(
    quote: &BookingQuote,
    contract: &FormContract,
    guests: &GuestDetails,
    email: &str,
    language: &str,
) -> BuiltPayload {
    // The form contract re-states payment types; prefer it, fall back to the
    // quote's own options when the contract came from the default fallback.
    let deposit_options = if contract.payment_types.is_empty() {
        &quote.payment_options
    } else {
        &contract.payment_types
    };
    let deposit = select_payment_option(deposit_options, PaymentKind::Deposit).cloned();
    let deposit_missing = deposit.is_none();

    let rooms = guests.rooms.iter().map(room_guest_list).collect();

    let comment = if guests.special_requests.trim().is_empty() {
        None
    } else {
        Some(guests.special_requests.clone())
    };

    BuiltPayload {
        payload: PendingBookingPayload {
            order_id: contract.order_id.clone(),
            partner: PartnerInfo {
                partner_order_id: contract.partner_order_id.clone(),
            },
            item_id: contract.item_id.clone(),
            language: language.to_string(),
            user: ContactInfo {
                email: email.to_string(),
                phone: guests.phone.clone(),
                comment,
            },
            payment_type: deposit,
            rooms,
        },
        deposit_missing,
    }
}

fn room_guest_list(room: &RoomGuests) -> PayloadRoom {
    let mut guests = vec![PayloadGuest::from(&room.primary)];
    guests.extend(
        room.additional_guests
            .iter()
            .filter(|g| !g.is_blank())
            .map(PayloadGuest::from),
    );
    guests.extend(
        room.child_guests
            .iter()
            .filter(|g| !g.is_blank())
            .map(PayloadGuest::from),
    );
    PayloadRoom { guests }
}
