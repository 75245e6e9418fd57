use serde::Deserialize;

pub const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
pub const DEFAULT_CLICKUP_BASE_URL: &str = "https://api.clickup.com/api/v2";
pub const DEFAULT_EMAIL_API_BASE_URL: &str = "https://api.sendgrid.com";
pub const DEFAULT_RECAPTCHA_MIN_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub recaptcha_site_key: Option<String>,
    pub recaptcha_secret_key: Option<String>,
    pub recaptcha_min_score: f64,
    pub recaptcha_verify_url: String,
    pub clickup_api_token: Option<String>,
    pub clickup_list_id: Option<String>,
    pub clickup_base_url: String,
    pub sendgrid_api_key: Option<String>,
    pub email_from: Option<String>,
    pub email_api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            recaptcha_site_key: None,
            recaptcha_secret_key: None,
            recaptcha_min_score: DEFAULT_RECAPTCHA_MIN_SCORE,
            recaptcha_verify_url: DEFAULT_RECAPTCHA_VERIFY_URL.to_string(),
            clickup_api_token: None,
            clickup_list_id: None,
            clickup_base_url: DEFAULT_CLICKUP_BASE_URL.to_string(),
            sendgrid_api_key: None,
            email_from: None,
            email_api_base_url: DEFAULT_EMAIL_API_BASE_URL.to_string(),
        }
    }
}

/// Reads an optional variable, treating blank values as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads a base URL, falling back to `default` and stripping any trailing slash.
fn url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let url = optional_var(name).unwrap_or_else(|| default.to_string());
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            recaptcha_site_key: optional_var("RECAPTCHA_SITE_KEY"),
            recaptcha_secret_key: optional_var("RECAPTCHA_SECRET_KEY"),
            recaptcha_min_score: optional_var("RECAPTCHA_MIN_SCORE")
                .map(|raw| {
                    raw.parse::<f64>()
                        .map_err(|_| anyhow::anyhow!("RECAPTCHA_MIN_SCORE must be a number"))
                        .and_then(|score| {
                            if !(0.0..=1.0).contains(&score) {
                                anyhow::bail!("RECAPTCHA_MIN_SCORE must be between 0.0 and 1.0");
                            }
                            Ok(score)
                        })
                })
                .transpose()?
                .unwrap_or(DEFAULT_RECAPTCHA_MIN_SCORE),
            recaptcha_verify_url: url_var("RECAPTCHA_VERIFY_URL", DEFAULT_RECAPTCHA_VERIFY_URL)?,
            clickup_api_token: optional_var("CLICKUP_API_TOKEN"),
            clickup_list_id: optional_var("CLICKUP_LIST_ID"),
            clickup_base_url: url_var("CLICKUP_BASE_URL", DEFAULT_CLICKUP_BASE_URL)?,
            sendgrid_api_key: optional_var("SENDGRID_API_KEY"),
            email_from: optional_var("EMAIL_FROM"),
            email_api_base_url: url_var("EMAIL_API_BASE_URL", DEFAULT_EMAIL_API_BASE_URL)?,
        };

        // Log what is enabled (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        if config.recaptcha_secret_key.is_none() {
            tracing::warn!("RECAPTCHA_SECRET_KEY not set - bot verification is disabled");
        } else {
            tracing::debug!(
                "reCAPTCHA verify URL: {} (min score {})",
                config.recaptcha_verify_url,
                config.recaptcha_min_score
            );
        }
        if config.task_system_enabled() {
            tracing::info!("ClickUp task notifications enabled: {}", config.clickup_base_url);
        } else {
            tracing::warn!("CLICKUP_API_TOKEN/CLICKUP_LIST_ID not set - task notifications disabled");
        }
        if config.email_enabled() {
            tracing::info!("Confirmation emails enabled: {}", config.email_api_base_url);
        } else {
            tracing::warn!("SENDGRID_API_KEY/EMAIL_FROM not set - confirmation emails disabled");
        }

        Ok(config)
    }

    /// Task notifications need both the API token and the target list.
    pub fn task_system_enabled(&self) -> bool {
        self.clickup_api_token.is_some() && self.clickup_list_id.is_some()
    }

    pub fn email_enabled(&self) -> bool {
        self.sendgrid_api_key.is_some() && self.email_from.is_some()
    }
}
