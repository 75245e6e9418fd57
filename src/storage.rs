//! In-memory storage for submitted forms.
//!
//! One table per entity, each behind its own lock, with ids assigned from a
//! per-table counter starting at 1. The store is constructed once at startup
//! and shared through the application state.

use crate::errors::AppError;
use crate::models::*;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Returned when a booking targets a slot that is already taken.
pub const SLOT_TAKEN_MESSAGE: &str = "This time slot is no longer available";

struct Table<T> {
    next_id: u64,
    rows: BTreeMap<u64, T>,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }

    fn insert_with(&mut self, build: impl FnOnce(u64) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn get(&self, id: u64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.values().filter(|r| predicate(r)).cloned().collect()
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub struct Storage {
    assessments: RwLock<Table<Assessment>>,
    intakes: RwLock<Table<Intake>>,
    contacts: RwLock<Table<Contact>>,
    bookings: RwLock<Table<Booking>>,
    newsletters: RwLock<Table<Newsletter>>,
    users: RwLock<Table<User>>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    pub fn new() -> Self {
        Self {
            assessments: RwLock::new(Table::new()),
            intakes: RwLock::new(Table::new()),
            contacts: RwLock::new(Table::new()),
            bookings: RwLock::new(Table::new()),
            newsletters: RwLock::new(Table::new()),
            users: RwLock::new(Table::new()),
        }
    }

    // ---- assessments ----

    pub fn create_assessment(&self, new: NewAssessment) -> Assessment {
        let record = self
            .assessments
            .write()
            .insert_with(|id| new.into_record(id, Utc::now()));
        tracing::debug!("Stored assessment id={}", record.id);
        record
    }

    pub fn get_assessment(&self, id: u64) -> Option<Assessment> {
        self.assessments.read().get(id)
    }

    /// Applies `update` to a copy of the record and commits it only if the
    /// closure succeeds. Returns `Ok(None)` for an unknown id.
    pub fn update_assessment<F>(&self, id: u64, update: F) -> Result<Option<Assessment>, AppError>
    where
        F: FnOnce(&mut Assessment) -> Result<(), AppError>,
    {
        let mut table = self.assessments.write();
        let Some(current) = table.rows.get(&id) else {
            return Ok(None);
        };
        let mut updated = current.clone();
        update(&mut updated)?;
        table.rows.insert(id, updated.clone());
        tracing::debug!("Updated assessment id={} progress={}", id, updated.progress);
        Ok(Some(updated))
    }

    pub fn get_assessments_by_email(&self, email: &str) -> Vec<Assessment> {
        self.assessments.read().filter(|a| {
            a.email
                .as_deref()
                .map_or(false, |stored| same_email(stored, email))
        })
    }

    // ---- intakes ----

    pub fn create_intake(&self, new: NewIntake) -> Intake {
        self.intakes
            .write()
            .insert_with(|id| new.into_record(id, Utc::now()))
    }

    pub fn get_intake(&self, id: u64) -> Option<Intake> {
        self.intakes.read().get(id)
    }

    pub fn get_intakes_by_email(&self, email: &str) -> Vec<Intake> {
        self.intakes.read().filter(|i| same_email(&i.email, email))
    }

    // ---- contacts ----

    pub fn create_contact(&self, new: NewContact) -> Contact {
        self.contacts
            .write()
            .insert_with(|id| new.into_record(id, Utc::now()))
    }

    pub fn get_contact(&self, id: u64) -> Option<Contact> {
        self.contacts.read().get(id)
    }

    pub fn get_contacts(&self) -> Vec<Contact> {
        self.contacts.read().filter(|_| true)
    }

    // ---- bookings ----

    /// Creates a booking unless its slot is already taken on that day.
    ///
    /// The availability check and the insert happen under one write lock, so
    /// concurrent requests for the same slot cannot both succeed.
    pub fn create_booking(&self, new: NewBooking) -> Result<Booking, AppError> {
        let mut table = self.bookings.write();
        let day = new.date.date_naive();
        let taken = table
            .rows
            .values()
            .any(|b| b.date.date_naive() == day && b.time_slot == new.time_slot);
        if taken {
            tracing::warn!("Rejected double booking for {} {}", day, new.time_slot);
            return Err(AppError::BadRequest(SLOT_TAKEN_MESSAGE.to_string()));
        }
        Ok(table.insert_with(|id| new.into_record(id, Utc::now())))
    }

    pub fn get_booking(&self, id: u64) -> Option<Booking> {
        self.bookings.read().get(id)
    }

    /// Bookings whose date falls on `day` (UTC).
    pub fn get_bookings_by_date(&self, day: NaiveDate) -> Vec<Booking> {
        self.bookings.read().filter(|b| b.date.date_naive() == day)
    }

    // ---- newsletters ----

    /// Subscribes `email`, returning `(record, created)`. An email already on
    /// file returns the original record unchanged with `created == false`.
    pub fn create_newsletter(&self, new: NewNewsletter) -> (Newsletter, bool) {
        let mut table = self.newsletters.write();
        if let Some(existing) = table.rows.values().find(|n| same_email(&n.email, &new.email)) {
            return (existing.clone(), false);
        }
        let record = table.insert_with(|id| Newsletter {
            id,
            email: new.email.trim().to_string(),
            created_at: Utc::now(),
        });
        (record, true)
    }

    pub fn get_newsletter_by_email(&self, email: &str) -> Option<Newsletter> {
        self.newsletters
            .read()
            .rows
            .values()
            .find(|n| same_email(&n.email, email))
            .cloned()
    }

    // ---- users ----

    pub fn create_user(&self, new: NewUser) -> User {
        self.users.write().insert_with(|id| User {
            id,
            username: new.username,
            password: new.password,
        })
    }

    pub fn get_user(&self, id: u64) -> Option<User> {
        self.users.read().get(id)
    }

    pub fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.users
            .read()
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking(date: &str, slot: &str) -> NewBooking {
        NewBooking {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "650-253-0000".to_string(),
            company: "Acme".to_string(),
            date: parse_flexible_date(date).unwrap(),
            time_slot: slot.to_string(),
            status: None,
        }
    }

    #[test]
    fn test_ids_increment_per_table() {
        let store = Storage::new();
        let a1 = store.create_assessment(NewAssessment::default());
        let a2 = store.create_assessment(NewAssessment::default());
        let c1 = store.create_contact(NewContact {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            company: None,
            message: None,
            interest: None,
        });
        assert_eq!((a1.id, a2.id, c1.id), (1, 2, 1));
        assert_eq!(store.get_assessment(2), Some(a2));
        assert!(store.get_assessment(3).is_none());
        assert_eq!(store.get_contact(1), Some(c1));
    }

    #[test]
    fn test_update_assessment_commits_only_on_success() {
        let store = Storage::new();
        let created = store.create_assessment(NewAssessment::default());

        let result = store.update_assessment(created.id, |record| {
            record.company = Some("Changed".to_string());
            Err(AppError::BadRequest("nope".to_string()))
        });
        assert!(result.is_err());
        assert!(store.get_assessment(created.id).unwrap().company.is_none());

        let updated = store
            .update_assessment(created.id, |record| {
                record.company = Some("Acme".to_string());
                Ok(())
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.company.as_deref(), Some("Acme"));

        assert!(store.update_assessment(999, |_| Ok(())).unwrap().is_none());
    }

    #[test]
    fn test_assessments_by_email_ignores_case() {
        let store = Storage::new();
        store.create_assessment(NewAssessment {
            email: Some("Ada@Example.com".to_string()),
            ..NewAssessment::default()
        });
        store.create_assessment(NewAssessment::default());
        assert_eq!(store.get_assessments_by_email("ada@example.com").len(), 1);
    }

    #[test]
    fn test_newsletter_dedup_returns_original() {
        let store = Storage::new();
        let (first, created) = store.create_newsletter(NewNewsletter {
            email: "ada@example.com".to_string(),
        });
        assert!(created);
        let (second, created) = store.create_newsletter(NewNewsletter {
            email: " ADA@example.com ".to_string(),
        });
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(store.get_newsletter_by_email("ada@example.com"), Some(first));
    }

    #[test]
    fn test_double_booking_rejected() {
        let store = Storage::new();
        store.create_booking(booking("2025-03-14", "09:00")).unwrap();
        let err = store
            .create_booking(booking("2025-03-14T09:00:00Z", "09:00"))
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == SLOT_TAKEN_MESSAGE));

        // Same slot on another day is fine
        store.create_booking(booking("2025-03-15", "09:00")).unwrap();
        let day = Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap().date_naive();
        assert_eq!(store.get_bookings_by_date(day).len(), 1);
    }

    #[test]
    fn test_users_by_username() {
        let store = Storage::new();
        let user = store.create_user(NewUser {
            username: "admin".to_string(),
            password: "hash".to_string(),
        });
        assert_eq!(store.get_user(user.id), Some(user.clone()));
        assert_eq!(store.get_user_by_username("admin"), Some(user));
        assert!(store.get_user_by_username("nobody").is_none());
    }
}
