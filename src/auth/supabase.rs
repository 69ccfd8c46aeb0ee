use crate::auth::authenticator::{Authenticator, Identity};
use crate::auth::error::AuthError;
use crate::config::AuthConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user: SupabaseUser,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
}

/// GoTrue reports failures under different field names depending on version
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorResponse {
    fn into_message(self, status: StatusCode) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| status.to_string())
    }
}

/// Supabase (GoTrue) password sign-in
#[derive(Clone)]
pub struct SupabaseAuth {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseAuth {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AuthError::Configuration("auth url is empty".to_string()));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Authenticator for SupabaseAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        debug!("Signing in {} via {}", email, self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let token: TokenResponse = response
                .json()
                .await
                .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

            let identity = Identity {
                email: token.user.email.unwrap_or_else(|| email.to_string()),
                user_id: token.user.id,
            };
            info!("Signed in as {}", identity.email);
            return Ok(identity);
        }

        let error: ErrorResponse = response.json().await.unwrap_or_default();
        let message = error.into_message(status);

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                warn!("Sign-in refused for {}: {}", email, message);
                Err(AuthError::InvalidCredentials(message))
            }
            _ => {
                warn!("Sign-in failed for {} with status {}: {}", email, status, message);
                Err(AuthError::Unavailable(format!("{}: {}", status, message)))
            }
        }
    }
}
