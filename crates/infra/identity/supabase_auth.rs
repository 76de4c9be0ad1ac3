use anyhow::{Context, Result, anyhow, bail};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::value_objects::iam::AuthUser;

/// Resolves bearer tokens through Supabase Auth (GoTrue) session introspection.
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    user_endpoint: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SupabaseUserResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SupabaseErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl SupabaseAuthClient {
    pub fn new(project_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(project_url)
            .with_context(|| format!("invalid Supabase project url: {project_url}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let user_endpoint = base
            .join("auth/v1/user")
            .context("failed to build Supabase auth endpoint")?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Supabase http client")?;

        Ok(Self {
            http,
            user_endpoint,
            api_key,
        })
    }

    /// Returns the user owning `access_token`. Any non-success answer is an error.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        // https://supabase.com/docs/reference/javascript/auth-getuser
        let resp = self
            .http
            .get(self.user_endpoint.clone())
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await
            .context("supabase auth request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<SupabaseErrorBody>(&body)
                .ok()
                .and_then(|err| err.msg.or(err.message).or(err.error_description))
                .unwrap_or_else(|| format!("status {}", status));

            if status.is_server_error() {
                warn!(%status, reason = %reason, "supabase_auth: session introspection failed");
            } else {
                debug!(%status, reason = %reason, "supabase_auth: token rejected");
            }
            bail!("invalid session: {}", reason);
        }

        let user: SupabaseUserResponse = resp
            .json()
            .await
            .context("failed to decode supabase user")?;

        let user_id = Uuid::parse_str(&user.id)
            .map_err(|_| anyhow!("invalid user id in session: {}", user.id))?;

        Ok(AuthUser { user_id })
    }
}
