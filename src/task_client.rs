use crate::errors::AppError;
use crate::models::{Assessment, Contact, Intake, Urgency};
use serde_json::json;
use std::time::Duration;

/// A task ready to be created in the task-tracking system.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub name: String,
    pub markdown: String,
    pub tags: Vec<String>,
    /// ClickUp priority: 1 urgent, 2 high, 3 normal, 4 low.
    pub priority: Option<u8>,
}

/// Client for creating tasks in ClickUp.
#[derive(Clone)]
pub struct TaskClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    list_id: String,
}

impl TaskClient {
    /// Creates a new `TaskClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the ClickUp API (`.../api/v2`).
    /// * `token` - The API token for authentication.
    /// * `list_id` - The list new tasks are created in.
    pub fn new(base_url: String, token: String, list_id: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create ClickUp client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            token,
            list_id,
        })
    }

    /// Creates a task in the configured list.
    ///
    /// # Returns
    ///
    /// * `Result<String, AppError>` - The ID of the created task.
    pub async fn create_task(&self, task: &TaskDraft) -> Result<String, AppError> {
        let url = format!("{}/list/{}/task", self.base_url, self.list_id);
        tracing::info!("Creating ClickUp task: {}", task.name);

        let mut body = json!({
            "name": task.name,
            "markdown_description": task.markdown,
            "tags": task.tags,
        });
        if let Some(priority) = task.priority {
            body["priority"] = json!(priority);
        }

        let response = self
            .client
            .post(&url)
            // ClickUp personal tokens go in the header as-is, no Bearer prefix
            .header("Authorization", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("ClickUp request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "ClickUp task creation failed {}: {}",
                status, error_text
            )));
        }

        let response_data: serde_json::Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse ClickUp response: {}", e))
        })?;

        let task_id = response_data
            .get("id")
            .and_then(|i| i.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                tracing::warn!("Unexpected ClickUp response format: {:?}", response_data);
                AppError::ExternalApiError("Task creation response missing 'id' field".to_string())
            })?;

        tracing::info!("✓ ClickUp task created: {}", task_id);
        Ok(task_id)
    }
}

fn push_line(md: &mut String, label: &str, value: Option<&str>) {
    if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
        md.push_str(&format!("- **{}:** {}\n", label, v));
    }
}

fn push_list(md: &mut String, title: &str, items: &[String], other: Option<&str>) {
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("\n### {}\n", title));
    for item in items {
        if item == crate::schema::OTHER_CUSTOM {
            md.push_str(&format!("- Other: {}\n", other.unwrap_or("(not specified)")));
        } else {
            md.push_str(&format!("- {}\n", item));
        }
    }
}

/// Formats a completed assessment as a task summary.
pub fn format_assessment_summary(assessment: &Assessment) -> TaskDraft {
    let company = assessment.company.as_deref().unwrap_or("Unknown company");
    let mut md = String::new();

    md.push_str(&format!("## Assessment #{}\n\n", assessment.id));
    md.push_str("### Contact\n");
    push_line(&mut md, "Name", assessment.name.as_deref());
    push_line(&mut md, "Email", assessment.email.as_deref());
    push_line(&mut md, "Phone", assessment.phone.as_deref());
    push_line(&mut md, "Job title", assessment.job_title.as_deref());

    md.push_str("\n### Company\n");
    push_line(&mut md, "Company", assessment.company.as_deref());
    push_line(&mut md, "Industry", assessment.industry.as_deref());
    push_line(&mut md, "Size", assessment.company_size.as_deref());
    push_line(&mut md, "Annual revenue", assessment.annual_revenue.as_deref());

    push_list(
        &mut md,
        "Current systems",
        &assessment.current_systems,
        assessment.other_system.as_deref(),
    );
    push_list(
        &mut md,
        "Business goals",
        &assessment.business_goals,
        assessment.other_goal.as_deref(),
    );
    push_list(
        &mut md,
        "Challenges",
        &assessment.challenges,
        assessment.other_challenge.as_deref(),
    );

    md.push_str("\n### Project\n");
    push_line(&mut md, "Timeline", assessment.timeline.as_deref());
    push_line(&mut md, "Budget", assessment.budget.as_deref());
    if let Some(info) = assessment.additional_info.as_deref().filter(|s| !s.trim().is_empty()) {
        md.push_str(&format!("\n### Additional information\n{}\n", info.trim()));
    }
    md.push_str(&format!(
        "\n_Submitted {}_\n",
        assessment.created_at.format("%Y-%m-%d %H:%M UTC")
    ));

    TaskDraft {
        name: format!("Assessment: {}", company),
        markdown: md,
        tags: vec!["assessment".to_string(), "website-lead".to_string()],
        priority: Some(3),
    }
}

/// Formats an intake as a task summary; urgency drives the task priority.
pub fn format_intake_summary(intake: &Intake) -> TaskDraft {
    let mut md = String::new();

    md.push_str(&format!("## Intake #{}\n\n", intake.id));
    md.push_str("### Contact\n");
    push_line(&mut md, "Name", Some(&intake.name));
    push_line(&mut md, "Email", Some(&intake.email));
    push_line(&mut md, "Phone", intake.phone.as_deref());
    push_line(&mut md, "Company", Some(&intake.company));
    push_line(&mut md, "Job title", intake.job_title.as_deref());

    md.push_str("\n### Environment\n");
    push_line(&mut md, "Legacy environment", Some(intake.legacy_environment.label()));
    push_line(&mut md, "Details", intake.other_environment.as_deref());

    push_list(
        &mut md,
        "Modernization goals",
        &intake.modernization_goals,
        intake.other_goal.as_deref(),
    );
    md.push('\n');
    push_line(&mut md, "Urgency", Some(intake.urgency.label()));

    let priority = match intake.urgency {
        Urgency::Immediate => 1,
        Urgency::Within3Months => 2,
        Urgency::Within6Months => 3,
        Urgency::Exploring => 4,
    };

    TaskDraft {
        name: format!("Intake: {} ({})", intake.company, intake.name),
        markdown: md,
        tags: vec!["intake".to_string(), "website-lead".to_string()],
        priority: Some(priority),
    }
}

/// Formats a contact message as a task summary.
pub fn format_contact_summary(contact: &Contact) -> TaskDraft {
    let mut md = String::new();

    md.push_str(&format!("## Contact message #{}\n\n", contact.id));
    push_line(&mut md, "Name", Some(&contact.name));
    push_line(&mut md, "Email", Some(&contact.email));
    push_line(&mut md, "Phone", contact.phone.as_deref());
    push_line(&mut md, "Company", contact.company.as_deref());
    push_line(&mut md, "Interest", contact.interest.as_deref());
    if let Some(message) = contact.message.as_deref() {
        md.push_str(&format!("\n### Message\n{}\n", message.trim()));
    }

    TaskDraft {
        name: format!("Contact: {}", contact.name),
        markdown: md,
        tags: vec!["contact".to_string(), "website-lead".to_string()],
        priority: Some(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LegacyEnvironment, NewAssessment};
    use chrono::Utc;

    #[test]
    fn test_client_creation() {
        let client = TaskClient::new(
            "https://api.clickup.com/api/v2".to_string(),
            "pk_token".to_string(),
            "901".to_string(),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_assessment_summary_expands_other_option() {
        let assessment = NewAssessment {
            company: Some("Acme".to_string()),
            name: Some("Ada".to_string()),
            current_systems: vec!["erp".to_string(), "other-custom".to_string()],
            other_system: Some("In-house COBOL billing".to_string()),
            ..NewAssessment::default()
        }
        .into_record(7, Utc::now());

        let task = format_assessment_summary(&assessment);
        assert_eq!(task.name, "Assessment: Acme");
        assert!(task.markdown.contains("## Assessment #7"));
        assert!(task.markdown.contains("- erp\n"));
        assert!(task.markdown.contains("- Other: In-house COBOL billing"));
        assert!(!task.markdown.contains("Budget"));
    }

    #[test]
    fn test_intake_priority_follows_urgency() {
        let intake = Intake {
            id: 3,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            company: "Acme".to_string(),
            job_title: None,
            legacy_environment: LegacyEnvironment::Mainframe,
            other_environment: None,
            modernization_goals: vec!["cloud-migration".to_string()],
            other_goal: None,
            urgency: Urgency::Immediate,
            created_at: Utc::now(),
        };
        let task = format_intake_summary(&intake);
        assert_eq!(task.priority, Some(1));
        assert!(task.markdown.contains("**Legacy environment:** Mainframe"));
        assert!(task.markdown.contains("**Urgency:** Immediate"));
    }
}
