use crate::errors::AppError;
use crate::models::{Assessment, Booking, Contact, Intake};
use serde_json::json;
use std::time::Duration;
use tera::{Context, Tera};

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #1f2937;">
<p>Hi {{ name }},</p>
{% for paragraph in paragraphs %}<p>{{ paragraph }}</p>
{% endfor %}<p>Best regards,<br>The Team</p>
</body>
</html>
"#;

const TEXT_TEMPLATE: &str = "Hi {{ name }},

{% for paragraph in paragraphs %}{{ paragraph }}

{% endfor %}Best regards,
The Team
";

/// A confirmation waiting to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub to: String,
    pub subject: String,
    pub name: String,
    pub paragraphs: Vec<String>,
}

/// A rendered confirmation email.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// HTML and plain-text layouts shared by every confirmation.
///
/// The HTML template is registered under a `.html` name so Tera escapes
/// every interpolated value; the text template is left raw.
#[derive(Clone)]
pub struct EmailTemplates {
    tera: Tera,
}

impl EmailTemplates {
    pub fn new() -> Result<Self, AppError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("confirmation.html", HTML_TEMPLATE),
            ("confirmation.txt", TEXT_TEMPLATE),
        ])
        .map_err(|e| AppError::InternalError(format!("Invalid email template: {}", e)))?;

        Ok(Self { tera })
    }

    pub fn render(&self, confirmation: &Confirmation) -> Result<EmailMessage, AppError> {
        let mut context = Context::new();
        context.insert("name", &confirmation.name);
        context.insert("paragraphs", &confirmation.paragraphs);

        let render = |template: &str| {
            self.tera.render(template, &context).map_err(|e| {
                AppError::InternalError(format!("Failed to render {}: {}", template, e))
            })
        };

        Ok(EmailMessage {
            to: confirmation.to.clone(),
            subject: confirmation.subject.clone(),
            html: render("confirmation.html")?,
            text: render("confirmation.txt")?,
        })
    }
}

/// Client for the SendGrid v3 mail API.
#[derive(Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    templates: EmailTemplates,
    base_url: String,
    api_key: String,
    from: String,
}

impl EmailClient {
    pub fn new(base_url: String, api_key: String, from: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create email client: {}", e))
            })?;

        Ok(Self {
            client,
            templates: EmailTemplates::new()?,
            base_url,
            api_key,
            from,
        })
    }

    /// Renders `confirmation` and sends it with both plain-text and HTML parts.
    pub async fn send(&self, confirmation: &Confirmation) -> Result<(), AppError> {
        let message = self.templates.render(confirmation)?;
        let url = format!("{}/v3/mail/send", self.base_url);
        tracing::info!("Sending email '{}' to {}", message.subject, message.to);

        let body = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html }
            ]
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Email send failed {}: {}",
                status, error_text
            )));
        }

        tracing::info!("✓ Email sent to {}", message.to);
        Ok(())
    }
}

fn confirmation(to: &str, subject: &str, name: &str, paragraphs: Vec<String>) -> Confirmation {
    Confirmation {
        to: to.to_string(),
        subject: subject.to_string(),
        name: name.to_string(),
        paragraphs,
    }
}

/// Confirmation for a completed assessment; `None` without an email address.
pub fn assessment_confirmation(assessment: &Assessment) -> Option<Confirmation> {
    let to = assessment.email.as_deref()?;
    let name = assessment.name.as_deref().unwrap_or("there");
    let company = assessment.company.as_deref().unwrap_or("your company");
    Some(confirmation(
        to,
        "We received your assessment",
        name,
        vec![
            format!(
                "Thank you for completing the technology assessment for {}.",
                company
            ),
            "Our team will review your answers and reach out within two business days with initial recommendations.".to_string(),
        ],
    ))
}

pub fn intake_confirmation(intake: &Intake) -> Confirmation {
    confirmation(
        &intake.email,
        "Thanks for reaching out",
        &intake.name,
        vec![
            format!(
                "Thanks for telling us about {}'s {} environment.",
                intake.company,
                intake.legacy_environment.label()
            ),
            format!(
                "You marked this as \"{}\". A consultant will follow up accordingly.",
                intake.urgency.label()
            ),
        ],
    )
}

pub fn contact_confirmation(contact: &Contact) -> Confirmation {
    confirmation(
        &contact.email,
        "We got your message",
        &contact.name,
        vec!["Thanks for contacting us. We will get back to you within one business day.".to_string()],
    )
}

pub fn booking_confirmation(booking: &Booking) -> Confirmation {
    confirmation(
        &booking.email,
        "Your consultation is booked",
        &booking.name,
        vec![format!(
            "Your consultation is confirmed for {} at {}.",
            booking.date.format("%A, %B %-d, %Y"),
            booking.time_slot
        )],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAssessment;
    use chrono::Utc;

    #[test]
    fn test_html_is_escaped() {
        let contact = Contact {
            id: 1,
            name: "<script>alert(1)</script>".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            company: None,
            message: None,
            interest: None,
            created_at: Utc::now(),
        };
        let message = EmailTemplates::new()
            .unwrap()
            .render(&contact_confirmation(&contact))
            .unwrap();
        assert!(message.html.contains("&lt;script&gt;"));
        assert!(!message.html.contains("<script>"));
        // Plain text keeps the raw name
        assert!(message.text.starts_with("Hi <script>"));
        assert_eq!(message.to, "ada@example.com");
    }

    #[test]
    fn test_paragraphs_render_in_both_parts() {
        let message = EmailTemplates::new()
            .unwrap()
            .render(&confirmation(
                "ada@example.com",
                "Subject",
                "Ada",
                vec!["First & foremost.".to_string(), "Second.".to_string()],
            ))
            .unwrap();
        assert!(message.html.contains("<p>Hi Ada,</p>"));
        assert!(message.html.contains("<p>First &amp; foremost.</p>"));
        assert!(message.text.contains("First & foremost.\n\nSecond.\n\nBest regards,"));
    }

    #[test]
    fn test_assessment_without_email_has_no_confirmation() {
        let assessment = NewAssessment::default().into_record(1, Utc::now());
        assert!(assessment_confirmation(&assessment).is_none());

        let assessment = NewAssessment {
            email: Some("ada@example.com".to_string()),
            company: Some("Acme".to_string()),
            ..NewAssessment::default()
        }
        .into_record(2, Utc::now());
        let confirmation = assessment_confirmation(&assessment).unwrap();
        assert_eq!(confirmation.to, "ada@example.com");
        assert_eq!(confirmation.name, "there");
        assert!(confirmation.paragraphs[0].ends_with("for Acme."));
    }
}
