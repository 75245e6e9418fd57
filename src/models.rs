use crate::schema::ASSESSMENT;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============ Assessment ============

/// Detailed multi-step questionnaire capturing a prospect's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: u64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub annual_revenue: Option<String>,
    pub current_systems: Vec<String>,
    pub other_system: Option<String>,
    pub business_goals: Vec<String>,
    pub other_goal: Option<String>,
    pub challenges: Vec<String>,
    pub other_challenge: Option<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
    pub additional_info: Option<String>,
    pub consent: bool,
    /// Furthest completed step (0 = none).
    pub progress: u8,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for assessments, partial (step 1) or full.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAssessment {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub annual_revenue: Option<String>,
    pub current_systems: Vec<String>,
    pub other_system: Option<String>,
    pub business_goals: Vec<String>,
    pub other_goal: Option<String>,
    pub challenges: Vec<String>,
    pub other_challenge: Option<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
    pub additional_info: Option<String>,
    pub consent: bool,
    pub progress: u8,
    pub completed: bool,
}

impl NewAssessment {
    pub fn into_record(self, id: u64, created_at: DateTime<Utc>) -> Assessment {
        Assessment {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            job_title: self.job_title,
            company: self.company,
            industry: self.industry,
            company_size: self.company_size,
            annual_revenue: self.annual_revenue,
            current_systems: self.current_systems,
            other_system: self.other_system,
            business_goals: self.business_goals,
            other_goal: self.other_goal,
            challenges: self.challenges,
            other_challenge: self.other_challenge,
            timeline: self.timeline,
            budget: self.budget,
            additional_info: self.additional_info,
            consent: self.consent,
            progress: self.progress,
            completed: self.completed,
            created_at,
        }
    }
}

/// Typed partial update for `PATCH /api/assessment/:id`.
///
/// Only the listed fields may change; anything else in the body is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssessmentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub annual_revenue: Option<String>,
    pub current_systems: Option<Vec<String>>,
    pub other_system: Option<String>,
    pub business_goals: Option<Vec<String>>,
    pub other_goal: Option<String>,
    pub challenges: Option<Vec<String>>,
    pub other_challenge: Option<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
    pub additional_info: Option<String>,
    pub consent: Option<bool>,
    pub progress: Option<u8>,
    pub completed: Option<bool>,
}

impl AssessmentPatch {
    /// Merges the patch into `record`. `progress` only moves forward, never past
    /// the last step, and a completed assessment stays completed.
    pub fn apply(self, record: &mut Assessment) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set_opt(&mut record.name, self.name);
        set_opt(&mut record.email, self.email);
        set_opt(&mut record.phone, self.phone);
        set_opt(&mut record.job_title, self.job_title);
        set_opt(&mut record.company, self.company);
        set_opt(&mut record.industry, self.industry);
        set_opt(&mut record.company_size, self.company_size);
        set_opt(&mut record.annual_revenue, self.annual_revenue);
        set(&mut record.current_systems, self.current_systems);
        set_opt(&mut record.other_system, self.other_system);
        set(&mut record.business_goals, self.business_goals);
        set_opt(&mut record.other_goal, self.other_goal);
        set(&mut record.challenges, self.challenges);
        set_opt(&mut record.other_challenge, self.other_challenge);
        set_opt(&mut record.timeline, self.timeline);
        set_opt(&mut record.budget, self.budget);
        set_opt(&mut record.additional_info, self.additional_info);
        set(&mut record.consent, self.consent);
        if let Some(progress) = self.progress {
            let last = ASSESSMENT.step_count() as u8;
            record.progress = record.progress.max(progress.min(last));
        }
        if self.completed == Some(true) {
            record.completed = true;
        }
    }
}

// ============ Intake ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegacyEnvironment {
    Mainframe,
    #[serde(rename = "as400")]
    As400,
    LegacyErp,
    CustomLegacy,
    ClientServer,
    Other,
}

impl LegacyEnvironment {
    pub fn label(&self) -> &'static str {
        match self {
            LegacyEnvironment::Mainframe => "Mainframe",
            LegacyEnvironment::As400 => "AS/400 (IBM i)",
            LegacyEnvironment::LegacyErp => "Legacy ERP",
            LegacyEnvironment::CustomLegacy => "Custom legacy application",
            LegacyEnvironment::ClientServer => "Client-server",
            LegacyEnvironment::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "within-3-months")]
    Within3Months,
    #[serde(rename = "within-6-months")]
    Within6Months,
    #[serde(rename = "exploring")]
    Exploring,
}

impl Urgency {
    pub fn label(&self) -> &'static str {
        match self {
            Urgency::Immediate => "Immediate",
            Urgency::Within3Months => "Within 3 months",
            Urgency::Within6Months => "Within 6 months",
            Urgency::Exploring => "Just exploring",
        }
    }
}

/// Short lead-qualification form preceding the assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intake {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: String,
    pub job_title: Option<String>,
    pub legacy_environment: LegacyEnvironment,
    pub other_environment: Option<String>,
    pub modernization_goals: Vec<String>,
    pub other_goal: Option<String>,
    pub urgency: Urgency,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIntake {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub company: String,
    #[serde(default)]
    pub job_title: Option<String>,
    pub legacy_environment: LegacyEnvironment,
    #[serde(default)]
    pub other_environment: Option<String>,
    pub modernization_goals: Vec<String>,
    #[serde(default)]
    pub other_goal: Option<String>,
    pub urgency: Urgency,
}

impl NewIntake {
    pub fn into_record(self, id: u64, created_at: DateTime<Utc>) -> Intake {
        Intake {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            job_title: self.job_title,
            legacy_environment: self.legacy_environment,
            other_environment: self.other_environment,
            modernization_goals: self.modernization_goals,
            other_goal: self.other_goal,
            urgency: self.urgency,
            created_at,
        }
    }
}

// ============ Contact ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: Option<String>,
    pub interest: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub interest: Option<String>,
}

impl NewContact {
    pub fn into_record(self, id: u64, created_at: DateTime<Utc>) -> Contact {
        Contact {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            message: self.message,
            interest: self.interest,
            created_at,
        }
    }
}

// ============ Booking ============

pub const DEFAULT_BOOKING_STATUS: &str = "confirmed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub date: DateTime<Utc>,
    pub time_slot: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    #[serde(deserialize_with = "deserialize_flexible_date")]
    pub date: DateTime<Utc>,
    pub time_slot: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl NewBooking {
    pub fn into_record(self, id: u64, created_at: DateTime<Utc>) -> Booking {
        Booking {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            date: self.date,
            time_slot: self.time_slot,
            status: self
                .status
                .unwrap_or_else(|| DEFAULT_BOOKING_STATUS.to_string()),
            created_at,
        }
    }
}

/// Parses `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_flexible_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

fn deserialize_flexible_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible_date(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid date '{}', expected YYYY-MM-DD or RFC 3339",
            raw
        ))
    })
}

// ============ Newsletter ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Newsletter {
    pub id: u64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNewsletter {
    pub email: String,
}

// ============ User ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}
