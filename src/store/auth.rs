//! Bearer-token resolution against the hosted auth backend.
//!
//! Authentication itself is fully delegated: the service never sees
//! credentials, only the access token the client already holds. One GET
//! maps that token to a user id, which scopes every row operation.

use super::SupabaseStore;
use crate::error::{AppError, Result};
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Deserialize)]
struct AuthUser {
    id: String,
}

impl SupabaseStore {
    /// Resolve an access token to the owning user id.
    pub async fn authenticate(&self, access_token: &str) -> Result<String> {
        let url = self.endpoint(&["auth", "v1", "user"])?;
        let response = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Unauthorized),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::AuthFailed {
                    detail: format!("{}: {}", status, body),
                })
            }
            _ => {
                let user: AuthUser = response.json().await.map_err(|e| AppError::AuthFailed {
                    detail: e.to_string(),
                })?;
                Ok(user.id)
            }
        }
    }
}
