use crate::config::Config;
use crate::errors::AppError;
use serde::Deserialize;
use std::time::Duration;

/// Token sent by the client when the reCAPTCHA script failed to load.
pub const TOKEN_LOAD_FAILED: &str = "recaptcha-load-failed";
/// Token sent by the client when the reCAPTCHA script loaded but could not execute.
pub const TOKEN_EXECUTION_FAILED: &str = "recaptcha-execution-failed";
/// Score substituted for the sentinel tokens.
pub const REDUCED_TRUST_SCORE: f64 = 0.5;

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// The service confirmed the token.
    Verified { score: f64 },
    /// The client could not produce a token; accepted with a substituted score.
    ReducedTrust { score: f64, reason: &'static str },
    /// No secret configured, nothing was checked.
    Skipped,
}

impl Verification {
    pub fn score(&self) -> Option<f64> {
        match self {
            Verification::Verified { score } | Verification::ReducedTrust { score, .. } => {
                Some(*score)
            }
            Verification::Skipped => None,
        }
    }
}

/// Response body of the siteverify endpoint.
#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// Client for the reCAPTCHA v3 verification service.
#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: Option<String>,
    min_score: f64,
}

impl RecaptchaVerifier {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create reCAPTCHA client: {}", e))
            })?;

        Ok(Self {
            client,
            verify_url: config.recaptcha_verify_url.clone(),
            secret: config.recaptcha_secret_key.clone(),
            min_score: config.recaptcha_min_score,
        })
    }

    pub fn enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Verifies `token` for `expected_action`.
    ///
    /// Any failure (missing token, service error, wrong action, low score)
    /// is an `AppError::SecurityCheck`.
    pub async fn verify(
        &self,
        token: Option<&str>,
        expected_action: &str,
    ) -> Result<Verification, AppError> {
        let Some(ref secret) = self.secret else {
            tracing::warn!(
                "reCAPTCHA secret not configured, skipping verification for '{}'",
                expected_action
            );
            return Ok(Verification::Skipped);
        };

        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::SecurityCheck("Missing reCAPTCHA token".to_string()))?;

        match token {
            TOKEN_LOAD_FAILED => {
                tracing::warn!(
                    "reCAPTCHA script failed to load on client, accepting '{}' with reduced trust",
                    expected_action
                );
                return Ok(Verification::ReducedTrust {
                    score: REDUCED_TRUST_SCORE,
                    reason: "script failed to load",
                });
            }
            TOKEN_EXECUTION_FAILED => {
                tracing::warn!(
                    "reCAPTCHA could not execute on client, accepting '{}' with reduced trust",
                    expected_action
                );
                return Ok(Verification::ReducedTrust {
                    score: REDUCED_TRUST_SCORE,
                    reason: "client could not execute",
                });
            }
            _ => {}
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|e| AppError::SecurityCheck(format!("Verification request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::SecurityCheck(format!(
                "Verification service returned {}",
                response.status()
            )));
        }

        let result: SiteVerifyResponse = response.json().await.map_err(|e| {
            AppError::SecurityCheck(format!("Failed to parse verification response: {}", e))
        })?;

        tracing::debug!(
            "reCAPTCHA result: success={}, score={:?}, action={:?}, hostname={:?}",
            result.success,
            result.score,
            result.action,
            result.hostname
        );

        if !result.success {
            return Err(AppError::SecurityCheck(format!(
                "Token rejected: {:?}",
                result.error_codes
            )));
        }

        match result.action.as_deref() {
            Some(action) if action == expected_action => {}
            action => {
                return Err(AppError::SecurityCheck(format!(
                    "Action mismatch: expected '{}', got {:?}",
                    expected_action, action
                )));
            }
        }

        let score = result.score.ok_or_else(|| {
            AppError::SecurityCheck("Verification response carried no score".to_string())
        })?;
        if score < self.min_score {
            return Err(AppError::SecurityCheck(format!(
                "Score {} below threshold {}",
                score, self.min_score
            )));
        }

        tracing::info!("✓ reCAPTCHA verified for '{}' (score {})", expected_action, score);
        Ok(Verification::Verified { score })
    }
}
