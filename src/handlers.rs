use crate::booking::{available_slots, parse_query_date, SlotAvailability, SlotQuery};
use crate::config::Config;
use crate::email::{booking_confirmation, EmailClient};
use crate::errors::AppError;
use crate::models::*;
use crate::recaptcha::RecaptchaVerifier;
use crate::schema::{ASSESSMENT, BOOKING, CONTACT, NEWSLETTER};
use crate::storage::Storage;
use crate::submission::{send_confirmation, Delivery, DeliveryReport, SubmissionResponse};
use crate::task_client::TaskClient;
use crate::validation::{
    as_object, is_valid_email, parse_with_schema, validate_phone, FieldErrors,
};
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Submitted forms, one table per entity.
    pub store: Arc<Storage>,
    /// Bot-token verification client.
    pub verifier: RecaptchaVerifier,
    /// Client for the task-tracking system (None when not configured).
    pub task_client: Option<TaskClient>,
    /// Client for confirmation emails (None when not configured).
    pub email_client: Option<EmailClient>,
}

impl AppState {
    /// Builds the state and the external clients enabled by `config`.
    pub fn new(config: Config, store: Arc<Storage>) -> Result<Self, AppError> {
        let verifier = RecaptchaVerifier::new(&config)?;

        let task_client = match (&config.clickup_api_token, &config.clickup_list_id) {
            (Some(token), Some(list_id)) => {
                match TaskClient::new(
                    config.clickup_base_url.clone(),
                    token.clone(),
                    list_id.clone(),
                ) {
                    Ok(client) => {
                        tracing::info!("✓ ClickUp client initialized: {}", config.clickup_base_url);
                        Some(client)
                    }
                    Err(e) => {
                        tracing::error!("Failed to initialize ClickUp client: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let email_client = match (&config.sendgrid_api_key, &config.email_from) {
            (Some(key), Some(from)) => {
                match EmailClient::new(config.email_api_base_url.clone(), key.clone(), from.clone())
                {
                    Ok(client) => {
                        tracing::info!("✓ Email client initialized: {}", config.email_api_base_url);
                        Some(client)
                    }
                    Err(e) => {
                        tracing::error!("Failed to initialize email client: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(Self {
            config,
            store,
            verifier,
            task_client,
            email_client,
        })
    }
}

/// JSON body extractor whose rejections answer with `{ "message": ... }` and 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor with `AppError` rejections.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor with `AppError` rejections.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Health check endpoint.
///
/// Returns the service status, version, and current server time.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-leads-api",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// GET /api/config/recaptcha
///
/// Exposes the public site key so the front end can load the reCAPTCHA script.
pub async fn recaptcha_config(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "siteKey": state.config.recaptcha_site_key,
        "enabled": state.verifier.enabled(),
    }))
}

/// Progress counts completed steps, so it cannot pass the last one.
fn check_progress(progress: u64, errors: &mut FieldErrors) {
    let steps = ASSESSMENT.step_count();
    if progress > steps as u64 {
        errors.push(
            "progress",
            &format!("Progress must be between 0 and {}", steps),
        );
    }
}

/// POST /api/assessment
///
/// Creates an assessment from the first wizard step. Only the step-1 fields
/// are required; later steps arrive through PATCH.
///
/// # Returns
///
/// * `Result<(StatusCode, Json<Assessment>), AppError>` - 201 with the stored record.
pub async fn create_assessment(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Assessment>), AppError> {
    tracing::info!("POST /api/assessment");

    let fields = as_object(&body)?;
    let mut errors = ASSESSMENT.validate_step(1, fields);
    if let Some(email) = fields.get("email").and_then(Value::as_str) {
        if !email.trim().is_empty() && !is_valid_email(email) {
            errors.push("email", "Please enter a valid email address");
        }
    }
    if let Some(progress) = fields.get("progress").and_then(Value::as_u64) {
        check_progress(progress, &mut errors);
    }
    errors.into_result()?;

    let mut new: NewAssessment = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Validation error: {}", e)))?;
    new.progress = new.progress.max(1);
    // Completion only happens through a fully validated submission
    new.completed = false;

    let assessment = state.store.create_assessment(new);
    tracing::info!("✓ Assessment {} created (step 1)", assessment.id);

    Ok((StatusCode::CREATED, Json(assessment)))
}

/// GET /api/assessment/:id
pub async fn get_assessment(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<Assessment>, AppError> {
    tracing::info!("GET /api/assessment/{}", id);

    state
        .store
        .get_assessment(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Assessment {} not found", id)))
}

/// PATCH /api/assessment/:id
///
/// Applies a whitelisted partial update. Marking the assessment completed
/// requires the merged record to pass full validation.
///
/// # Returns
///
/// * `Result<Json<Assessment>, AppError>` - The updated record, 404 for an unknown id.
pub async fn update_assessment(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(patch): ApiJson<AssessmentPatch>,
) -> Result<Json<Assessment>, AppError> {
    tracing::info!("PATCH /api/assessment/{}", id);

    let mut errors = FieldErrors::new();
    if let Some(email) = patch.email.as_deref() {
        if !is_valid_email(email) {
            errors.push("email", "Please enter a valid email address");
        }
    }
    if let Some(phone) = patch.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        if !validate_phone(phone).0 {
            errors.push("phone", "Please enter a valid phone number");
        }
    }
    if let Some(progress) = patch.progress {
        check_progress(u64::from(progress), &mut errors);
    }
    errors.into_result()?;

    let updated = state
        .store
        .update_assessment(id, |record| {
            let completing = patch.completed == Some(true) && !record.completed;
            patch.apply(record);
            if completing {
                let value = serde_json::to_value(&*record).map_err(|e| {
                    AppError::InternalError(format!("Failed to serialize assessment: {}", e))
                })?;
                ASSESSMENT.validate_all(as_object(&value)?).into_result()?;
                record.progress = ASSESSMENT.step_count() as u8;
            }
            Ok(())
        })?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {} not found", id)))?;

    tracing::info!(
        "✓ Assessment {} updated (progress {}, completed {})",
        id,
        updated.progress,
        updated.completed
    );
    Ok(Json(updated))
}

/// POST /api/contact
///
/// Stores a simple contact request. No bot check, no notifications.
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Contact>), AppError> {
    tracing::info!("POST /api/contact");

    let new: NewContact = parse_with_schema(&CONTACT, body)?;
    let contact = state.store.create_contact(new);
    tracing::info!("✓ Contact {} stored", contact.id);

    Ok((StatusCode::CREATED, Json(contact)))
}

/// POST /api/newsletter
///
/// Subscribes an email. An address already on file returns the original
/// record with 200 instead of creating a duplicate.
pub async fn subscribe_newsletter(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Newsletter>), AppError> {
    tracing::info!("POST /api/newsletter");

    let new: NewNewsletter = parse_with_schema(&NEWSLETTER, body)?;
    let (record, created) = state.store.create_newsletter(new);

    if created {
        tracing::info!("✓ Newsletter subscription {} created", record.id);
        Ok((StatusCode::CREATED, Json(record)))
    } else {
        tracing::info!("Newsletter subscription {} already exists", record.id);
        Ok((StatusCode::OK, Json(record)))
    }
}

/// POST /api/booking
///
/// Books a consultation slot and sends a best-effort confirmation email.
/// A slot already taken on that day is rejected.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<SubmissionResponse<Booking>>), AppError> {
    tracing::info!("POST /api/booking");

    let new: NewBooking = parse_with_schema(&BOOKING, body)?;
    let booking = state.store.create_booking(new)?;
    tracing::info!(
        "✓ Booking {} stored for {} {}",
        booking.id,
        booking.date.date_naive(),
        booking.time_slot
    );

    let email = send_confirmation(&state, Some(booking_confirmation(&booking))).await;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse::new(
            "Booking confirmed",
            booking,
            DeliveryReport {
                task_system: Delivery::skipped("bookings are not forwarded to the task system"),
                email,
            },
        )),
    ))
}

/// GET /api/booking/available-slots?date=YYYY-MM-DD
pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SlotQuery>,
) -> Result<Json<Vec<SlotAvailability>>, AppError> {
    let day = parse_query_date(query.date.as_deref()).ok_or_else(|| {
        AppError::BadRequest("A valid date (YYYY-MM-DD) is required".to_string())
    })?;

    let bookings = state.store.get_bookings_by_date(day);
    tracing::debug!("{} booking(s) on {}", bookings.len(), day);

    Ok(Json(available_slots(day, &bookings)))
}
