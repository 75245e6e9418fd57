use crate::models::Booking;
use crate::schema::TIME_SLOTS;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub time: String,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: Option<String>,
}

/// Parses the `date` query parameter (`YYYY-MM-DD`).
pub fn parse_query_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
}

/// Lists every configured slot for `day`, marking the ones already booked.
///
/// A booking blocks a slot when its date truncated to the calendar day equals
/// `day` and its time slot matches.
pub fn available_slots(day: NaiveDate, bookings: &[Booking]) -> Vec<SlotAvailability> {
    TIME_SLOTS
        .iter()
        .map(|slot| SlotAvailability {
            time: slot.to_string(),
            available: !bookings
                .iter()
                .any(|b| b.date.date_naive() == day && b.time_slot == *slot),
        })
        .collect()
}
