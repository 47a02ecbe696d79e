use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a payment option is charged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// Charged in full at booking time.
    Now,
    /// A smaller amount charged up front; the remainder is settled by the property.
    Deposit,
}

/// A single payment option attached to a locked rate.
///
/// The amount is kept as the backend's decimal string. Display code parses it
/// with [`PaymentOption::amount_value`]; the finalize payload carries the raw
/// string untouched so the backend receives exactly what it quoted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentOption {
    #[serde(rename = "type")]
    pub kind: PaymentKind,
    pub amount: String,
    pub currency_code: String,
}

impl PaymentOption {
    pub fn amount_value(&self) -> Option<f64> {
        self.amount.trim().parse::<f64>().ok()
    }
}

/// Pick the USD option of the given kind, if the rate carries one.
pub fn select_payment_option(options: &[PaymentOption], kind: PaymentKind) -> Option<&PaymentOption> {
    options
        .iter()
        .find(|o| o.kind == kind && o.currency_code == "USD")
}

/// Occupancy requested for one room in the original search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomOccupancy {
    pub adults: u32,
    pub children: u32,
}

/// One room offer inside a locked quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomOffer {
    pub occupancy: RoomOccupancy,
    pub nightly_prices: Vec<String>,
}

/// A time-scoped, re-priced confirmation of a room offer.
///
/// Produced by locking a rate hash. Read-only afterward: re-locking yields a
/// fresh quote, existing quotes are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingQuote {
    pub quote_id: Uuid,
    /// Re-confirmed book hash returned by the pre-booking endpoint.
    pub book_hash: String,
    pub room_offers: Vec<RoomOffer>,
    pub payment_options: Vec<PaymentOption>,
    /// Quotes are not guaranteed valid indefinitely; the backend does not
    /// expose a TTL, so expiry is enforced server-side at finalize time.
    pub expires_at: Option<DateTime<Utc>>,
}

impl BookingQuote {
    pub fn pay_now_option(&self) -> Option<&PaymentOption> {
        select_payment_option(&self.payment_options, PaymentKind::Now)
    }

    pub fn deposit_option(&self) -> Option<&PaymentOption> {
        select_payment_option(&self.payment_options, PaymentKind::Deposit)
    }
}

/// Backend-declared shape for guest submission tied to a quote.
///
/// When the booking-form endpoint is unavailable the flow falls back to
/// [`FormContract::fallback`]: a single-guest form with no order identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormContract {
    pub order_id: Option<String>,
    pub partner_order_id: Option<String>,
    pub item_id: Option<String>,
    pub payment_types: Vec<PaymentOption>,
}

impl FormContract {
    pub fn fallback() -> Self {
        Self::default()
    }

    pub fn has_order_ids(&self) -> bool {
        self.order_id.is_some() && self.item_id.is_some()
    }
}

/// A first/last name pair as entered in the guest form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuestName {
    pub first_name: String,
    pub last_name: String,
}

impl GuestName {
    pub fn is_blank(&self) -> bool {
        self.first_name.trim().is_empty() && self.last_name.trim().is_empty()
    }
}

/// Guest entries for one room: the lead guest plus optional extra adults and
/// children.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomGuests {
    pub primary: GuestName,
    pub additional_guests: Vec<GuestName>,
    pub child_guests: Vec<GuestName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameField {
    First,
    Last,
}

/// All guest-entered data for the flow. Owned exclusively by the booking
/// session; mutated only through the index-scoped setters below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestDetails {
    pub rooms: Vec<RoomGuests>,
    pub phone: String,
    pub special_requests: String,
}

impl GuestDetails {
    pub fn for_rooms(count: usize) -> Self {
        let count = count.max(1);
        Self {
            rooms: (0..count).map(|_| RoomGuests::default()).collect(),
            phone: String::new(),
            special_requests: String::new(),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn set_primary(
        &mut self,
        room: usize,
        field: NameField,
        value: impl Into<String>,
    ) -> Result<(), CoreError> {
        let entry = self.room_mut(room)?;
        apply_field(&mut entry.primary, field, value.into());
        Ok(())
    }

    pub fn set_additional_guest(
        &mut self,
        room: usize,
        guest: usize,
        field: NameField,
        value: impl Into<String>,
    ) -> Result<(), CoreError> {
        let entry = self.room_mut(room)?;
        if entry.additional_guests.len() <= guest {
            entry.additional_guests.resize_with(guest + 1, GuestName::default);
        }
        apply_field(&mut entry.additional_guests[guest], field, value.into());
        Ok(())
    }

    pub fn set_child_guest(
        &mut self,
        room: usize,
        child: usize,
        field: NameField,
        value: impl Into<String>,
    ) -> Result<(), CoreError> {
        let entry = self.room_mut(room)?;
        if entry.child_guests.len() <= child {
            entry.child_guests.resize_with(child + 1, GuestName::default);
        }
        apply_field(&mut entry.child_guests[child], field, value.into());
        Ok(())
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.phone = phone.into();
    }

    pub fn set_special_requests(&mut self, requests: impl Into<String>) {
        self.special_requests = requests.into();
    }

    /// True when the room's lead guest has both a first and a last name.
    pub fn has_primary_name(&self, room: usize) -> bool {
        self.rooms
            .get(room)
            .map(|r| {
                !r.primary.first_name.trim().is_empty() && !r.primary.last_name.trim().is_empty()
            })
            .unwrap_or(false)
    }

    pub fn primary_full_name(&self, room: usize) -> Option<String> {
        let r = self.rooms.get(room)?;
        if r.primary.is_blank() {
            return None;
        }
        Some(format!("{} {}", r.primary.first_name, r.primary.last_name))
    }

    fn room_mut(&mut self, room: usize) -> Result<&mut RoomGuests, CoreError> {
        self.rooms
            .get_mut(room)
            .ok_or(CoreError::RoomIndexOutOfRange(room))
    }
}

fn apply_field(name: &mut GuestName, field: NameField, value: String) {
    match field {
        NameField::First => name.first_name = value,
        NameField::Last => name.last_name = value,
    }
}

/// Guest entry as the finalize endpoint expects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayloadGuest {
    pub first_name: String,
    pub last_name: String,
}

impl From<&GuestName> for PayloadGuest {
    fn from(name: &GuestName) -> Self {
        Self {
            first_name: name.first_name.clone(),
            last_name: name.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadRoom {
    pub guests: Vec<PayloadGuest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// The exact request body required to finalize a reservation once payment is
/// confirmed. Persisted to the pending-transaction store before payment
/// confirmation is requested, so it survives a processor redirect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingBookingPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub partner: PartnerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub language: String,
    pub user: ContactInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentOption>,
    pub rooms: Vec<PayloadRoom>,
}
