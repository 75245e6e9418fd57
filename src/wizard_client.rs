use crate::errors::{AppError, ResultExt};
use crate::models::{Assessment, Intake};
use crate::submission::TOKEN_FIELD;
use crate::wizard::{DraftStore, Wizard};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Success envelope returned by the pipeline endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Submitted<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(default)]
    pub delivery: Value,
}

/// Client side of the staged submission: create after step 1, record
/// progress as steps pass, then submit the full record.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Origin of the leads API, e.g. `http://localhost:3000`.
    pub fn new(base_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::ExternalApiError(format!("Failed to create API client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST /api/assessment with the step-1 fields.
    pub async fn create_assessment(&self, fields: &Map<String, Value>) -> Result<Assessment, AppError> {
        let url = format!("{}/api/assessment", self.base_url);
        let response = self.client.post(&url).json(fields).send().await?;
        read_json(response).await
    }

    /// PATCH /api/assessment/:id
    pub async fn update_assessment(&self, id: u64, patch: &Value) -> Result<Assessment, AppError> {
        let url = format!("{}/api/assessment/{}", self.base_url, id);
        let response = self.client.patch(&url).json(patch).send().await?;
        read_json(response).await
    }

    /// POST /api/assessments with the full record and bot token.
    pub async fn submit_assessment(
        &self,
        mut fields: Map<String, Value>,
        token: &str,
    ) -> Result<Submitted<Assessment>, AppError> {
        let url = format!("{}/api/assessments", self.base_url);
        fields.insert(TOKEN_FIELD.to_string(), json!(token));
        let response = self.client.post(&url).json(&fields).send().await?;
        read_json(response).await
    }

    /// POST /api/intake with the full record and bot token.
    pub async fn submit_intake(
        &self,
        mut fields: Map<String, Value>,
        token: &str,
    ) -> Result<Submitted<Intake>, AppError> {
        let url = format!("{}/api/intake", self.base_url);
        fields.insert(TOKEN_FIELD.to_string(), json!(token));
        let response = self.client.post(&url).json(&fields).send().await?;
        read_json(response).await
    }

    /// Mirrors a completed wizard step to the server.
    ///
    /// The first call creates the assessment and remembers its id in the
    /// draft; later calls only advance the stored progress.
    pub async fn record_step<S: DraftStore>(&self, wizard: &mut Wizard<S>) -> Result<Assessment, AppError> {
        let progress = wizard.draft().progress;

        match wizard.remote_id() {
            None => {
                let created = self
                    .create_assessment(&wizard.draft().to_payload())
                    .await
                    .context("creating assessment")?;
                tracing::info!("✓ Assessment {} created from wizard", created.id);
                wizard.attach_remote_id(created.id)?;
                if progress > created.progress {
                    return self
                        .update_assessment(created.id, &json!({ "progress": progress }))
                        .await
                        .context("recording progress");
                }
                Ok(created)
            }
            Some(id) => self
                .update_assessment(id, &json!({ "progress": progress }))
                .await
                .with_context(|| format!("recording progress for assessment {}", id)),
        }
    }

    /// Submits the finished wizard and clears its draft on success.
    pub async fn submit<S: DraftStore>(
        &self,
        wizard: &mut Wizard<S>,
        token: &str,
    ) -> Result<Submitted<Assessment>, AppError> {
        let submitted = self
            .submit_assessment(wizard.draft().to_payload(), token)
            .await
            .context("submitting assessment")?;
        wizard.finish()?;
        Ok(submitted)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Decodes a success body, or turns a `{ "message" }` error body into an `AppError`.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse API response: {}", e))
        });
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|b| b.message)
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(match status {
        StatusCode::BAD_REQUEST => AppError::BadRequest(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ => AppError::ExternalApiError(format!("API returned {}: {}", status, message)),
    })
}
