//! Submission pipeline for the bot-protected forms.
//!
//! Each request runs: verify bot token → validate → persist → notify the task
//! system → send a confirmation email → 201. Only the first three steps can
//! fail the request; notification and email failures are logged and reported
//! as `degraded` in the response's delivery report.

use crate::email::{assessment_confirmation, contact_confirmation, intake_confirmation, Confirmation};
use crate::errors::AppError;
use crate::handlers::{ApiJson, AppState};
use crate::models::{Assessment, Contact, Intake, NewAssessment, NewContact, NewIntake};
use crate::recaptcha::Verification;
use crate::schema::{ASSESSMENT, GENERAL_CONTACT, INTAKE};
use crate::task_client::{
    format_assessment_summary, format_contact_summary, format_intake_summary, TaskDraft,
};
use crate::validation::parse_with_schema;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Body field carrying the bot-detection token.
pub const TOKEN_FIELD: &str = "recaptchaToken";

pub const ASSESSMENT_ACTION: &str = "assessment_submit";
pub const INTAKE_ACTION: &str = "intake_submit";
pub const CONTACT_ACTION: &str = "contact_submit";

/// Outcome of a best-effort side effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Delivery {
    Delivered,
    Skipped { reason: String },
    Degraded { reason: String },
}

impl Delivery {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Delivery::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Delivery::Degraded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub task_system: Delivery,
    pub email: Delivery,
}

impl DeliveryReport {
    pub fn is_degraded(&self) -> bool {
        self.task_system.is_degraded() || self.email.is_degraded()
    }
}

/// Success envelope for pipeline endpoints.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub delivery: DeliveryReport,
}

impl<T> SubmissionResponse<T> {
    pub fn new(message: impl Into<String>, data: T, delivery: DeliveryReport) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            delivery,
        }
    }
}

type Created<T> = (StatusCode, Json<SubmissionResponse<T>>);

/// Step 1: removes the token from `body` and verifies it for `action`.
pub async fn verify_bot_token(
    state: &AppState,
    body: &mut Value,
    action: &str,
) -> Result<Verification, AppError> {
    let token = body
        .as_object_mut()
        .and_then(|fields| fields.remove(TOKEN_FIELD));
    let token = token.as_ref().and_then(Value::as_str);

    state.verifier.verify(token, action).await
}

/// Step 4: forwards a summary to the task system.
///
/// On failure the full record is written to the error log so the submission
/// is not lost while the task system is unreachable.
pub async fn notify_task_system<T: Serialize>(
    state: &AppState,
    task: TaskDraft,
    kind: &str,
    record: &T,
) -> Delivery {
    let Some(ref client) = state.task_client else {
        tracing::debug!("Task system not configured, skipping {} notification", kind);
        return Delivery::skipped("task system not configured");
    };

    match client.create_task(&task).await {
        Ok(task_id) => {
            tracing::info!("✓ {} forwarded to task system as {}", kind, task_id);
            Delivery::Delivered
        }
        Err(e) => {
            tracing::error!("✗ Failed to forward {} to task system: {}", kind, e);
            let payload = serde_json::to_string(record)
                .unwrap_or_else(|err| format!("<unserializable: {}>", err));
            tracing::error!(kind = kind, payload = %payload, "FAILSAFE: undelivered submission");
            Delivery::Degraded {
                reason: e.to_string(),
            }
        }
    }
}

/// Step 5: sends the confirmation email, if there is one and email is configured.
pub async fn send_confirmation(state: &AppState, message: Option<Confirmation>) -> Delivery {
    let Some(message) = message else {
        return Delivery::skipped("no email address");
    };
    let Some(ref client) = state.email_client else {
        tracing::debug!("Email not configured, skipping confirmation to {}", message.to);
        return Delivery::skipped("email not configured");
    };

    match client.send(&message).await {
        Ok(()) => Delivery::Delivered,
        Err(e) => {
            tracing::error!("✗ Failed to send confirmation to {}: {}", message.to, e);
            Delivery::Degraded {
                reason: e.to_string(),
            }
        }
    }
}

/// POST /api/assessments
///
/// Full five-step assessment with bot verification, task notification and
/// confirmation email.
///
/// # Returns
///
/// * `Result<Created<Assessment>, AppError>` - 201 with the stored record and delivery report.
pub async fn submit_assessment(
    State(state): State<Arc<AppState>>,
    ApiJson(mut body): ApiJson<Value>,
) -> Result<Created<Assessment>, AppError> {
    tracing::info!("POST /api/assessments");

    tracing::debug!("Step 1: Verifying bot token");
    verify_bot_token(&state, &mut body, ASSESSMENT_ACTION).await?;

    tracing::debug!("Step 2: Validating assessment");
    let mut new: NewAssessment = parse_with_schema(&ASSESSMENT, body)?;
    new.progress = ASSESSMENT.step_count() as u8;
    new.completed = true;

    tracing::debug!("Step 3: Persisting assessment");
    let assessment = state.store.create_assessment(new);
    tracing::info!("✓ Assessment {} submitted", assessment.id);

    tracing::debug!("Step 4: Notifying task system");
    let task_system = notify_task_system(
        &state,
        format_assessment_summary(&assessment),
        "assessment",
        &assessment,
    )
    .await;

    tracing::debug!("Step 5: Sending confirmation email");
    let email = send_confirmation(&state, assessment_confirmation(&assessment)).await;

    let delivery = DeliveryReport { task_system, email };
    if delivery.is_degraded() {
        tracing::warn!("Assessment {} stored with degraded delivery", assessment.id);
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse::new(
            "Assessment submitted successfully",
            assessment,
            delivery,
        )),
    ))
}

/// POST /api/intake
///
/// Lead-qualification intake with bot verification, task notification and
/// confirmation email.
pub async fn submit_intake(
    State(state): State<Arc<AppState>>,
    ApiJson(mut body): ApiJson<Value>,
) -> Result<Created<Intake>, AppError> {
    tracing::info!("POST /api/intake");

    verify_bot_token(&state, &mut body, INTAKE_ACTION).await?;
    let new: NewIntake = parse_with_schema(&INTAKE, body)?;
    let intake = state.store.create_intake(new);
    tracing::info!("✓ Intake {} submitted ({})", intake.id, intake.company);

    let task_system =
        notify_task_system(&state, format_intake_summary(&intake), "intake", &intake).await;
    let email = send_confirmation(&state, Some(intake_confirmation(&intake))).await;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse::new(
            "Intake submitted successfully",
            intake,
            DeliveryReport { task_system, email },
        )),
    ))
}

/// POST /api/general-contact
///
/// Free-form contact message with bot verification, task notification and
/// confirmation email.
pub async fn submit_general_contact(
    State(state): State<Arc<AppState>>,
    ApiJson(mut body): ApiJson<Value>,
) -> Result<Created<Contact>, AppError> {
    tracing::info!("POST /api/general-contact");

    verify_bot_token(&state, &mut body, CONTACT_ACTION).await?;
    let new: NewContact = parse_with_schema(&GENERAL_CONTACT, body)?;
    let contact = state.store.create_contact(new);
    tracing::info!("✓ Contact message {} stored", contact.id);

    let task_system =
        notify_task_system(&state, format_contact_summary(&contact), "contact", &contact).await;
    let email = send_confirmation(&state, Some(contact_confirmation(&contact))).await;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse::new(
            "Message sent successfully",
            contact,
            DeliveryReport { task_system, email },
        )),
    ))
}
