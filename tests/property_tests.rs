/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_leads_api::booking::available_slots;
use rust_leads_api::models::{parse_flexible_date, Assessment, AssessmentPatch, NewAssessment};
use rust_leads_api::schema::{ASSESSMENT, INTAKE, TIME_SLOTS};
use rust_leads_api::storage::Storage;
use rust_leads_api::validation::{is_valid_email, validate_phone};
use serde_json::{json, Map, Value};

// Property: Email validation should never panic
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn simple_addresses_are_valid(
        local in "[a-z]{1,10}",
        domain in "[a-z]{1,10}",
        tld in "[a-z]{2,4}"
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        prop_assert!(is_valid_email(&email));
    }

    #[test]
    fn addresses_without_at_are_invalid(text in "[a-z0-9.]{0,30}") {
        prop_assert!(!is_valid_email(&text));
    }
}

// Property: Phone validation should never panic
proptest! {
    #[test]
    fn phone_validation_never_panics(phone in "\\PC*") {
        let _ = validate_phone(&phone);
    }

    #[test]
    fn valid_us_phones_normalize_to_e164(area in 201u16..=989u16, number in 2_000_000u32..=9_999_999u32) {
        let phone = format!("{}{}", area, number);
        let (valid, normalized) = validate_phone(&phone);
        if valid {
            prop_assert!(normalized.starts_with("+1"));
            prop_assert!(normalized[1..].chars().all(|c| c.is_ascii_digit()));
            prop_assert_eq!(normalized.len(), 12);
        }
    }
}

// Property: Schema validation reports at most one error per field and never panics
proptest! {
    #[test]
    fn step_validation_one_error_per_field(
        step in 0usize..=7,
        company in proptest::option::of("\\PC{0,20}"),
        email in proptest::option::of("\\PC{0,20}"),
        consent in any::<bool>()
    ) {
        let mut fields = Map::new();
        if let Some(company) = company {
            fields.insert("company".to_string(), json!(company));
        }
        if let Some(email) = email {
            fields.insert("email".to_string(), json!(email));
        }
        fields.insert("consent".to_string(), json!(consent));

        for schema in [&ASSESSMENT, &INTAKE] {
            let errors = schema.validate_step(step, &fields);
            let mut seen: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            let total = seen.len();
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), total);
        }
    }
}

// Property: A day's slot list always covers every configured slot, and only
// bookings on that calendar day block them
proptest! {
    #[test]
    fn slots_blocked_only_by_same_day_bookings(
        day_offset in 0i64..60,
        booked in proptest::collection::vec((0i64..60, 0usize..7, 0u32..24), 0..20)
    ) {
        let base = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        let day = base + chrono::Duration::days(day_offset);
        let store = Storage::new();

        for (offset, slot, hour) in booked {
            let date = base + chrono::Duration::days(offset);
            let new = serde_json::from_value(json!({
                "name": "Ada",
                "email": "ada@example.com",
                "phone": "650-253-0000",
                "company": "Acme",
                "date": format!("{}T{:02}:30:00Z", date, hour),
                "timeSlot": TIME_SLOTS[slot]
            })).unwrap();
            // Double bookings are rejected; either outcome is fine here
            let _ = store.create_booking(new);
        }

        let bookings = store.get_bookings_by_date(day);
        let slots = available_slots(day, &bookings);
        prop_assert_eq!(slots.len(), TIME_SLOTS.len());
        for slot in &slots {
            let taken = bookings.iter().any(|b| b.time_slot == slot.time);
            prop_assert_eq!(slot.available, !taken);
        }
    }

    #[test]
    fn flexible_dates_roundtrip_to_same_day(y in 2000i32..2100, m in 1u32..=12, d in 1u32..=28) {
        let day = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let parsed = parse_flexible_date(&day.to_string()).unwrap();
        prop_assert_eq!(parsed.date_naive(), day);
    }
}

// Property: PATCH progress is monotonic
proptest! {
    #[test]
    fn progress_never_decreases(updates in proptest::collection::vec(0u8..=5, 1..10)) {
        let mut record: Assessment = NewAssessment::default().into_record(1, chrono::Utc::now());
        let mut highest = 0u8;
        for progress in updates {
            let patch: AssessmentPatch =
                serde_json::from_value(json!({ "progress": progress })).unwrap();
            patch.apply(&mut record);
            highest = highest.max(progress);
            prop_assert_eq!(record.progress, highest);
        }
        prop_assert!(!record.completed);
    }

    #[test]
    fn progress_never_passes_last_step(progress in any::<u8>()) {
        let mut record: Assessment = NewAssessment::default().into_record(1, chrono::Utc::now());
        let patch: AssessmentPatch =
            serde_json::from_value(json!({ "progress": progress })).unwrap();
        patch.apply(&mut record);
        prop_assert!(usize::from(record.progress) <= ASSESSMENT.step_count());
    }

    #[test]
    fn patch_rejects_any_unknown_field(field in "[a-z]{3,12}") {
        prop_assume!(![
            "name", "email", "phone", "company", "industry", "timeline", "budget",
            "consent", "progress", "completed", "challenges"
        ].contains(&field.as_str()));
        let mut body = Map::new();
        body.insert(field, json!("x"));
        prop_assert!(serde_json::from_value::<AssessmentPatch>(Value::Object(body)).is_err());
    }
}
