//! Persistence adapter for the hosted Supabase backend.
//!
//! Everything goes over Supabase's REST surface: PostgREST for rows
//! (`playnotes`, `quizzes`, `quiz_attempts`), the storage API for uploaded
//! PDFs, and the auth API to resolve the caller behind a bearer token.
//! Row-level consistency (upsert-by-id, guarded status updates) is
//! delegated to PostgREST; this adapter holds no state of its own.

mod auth;
mod playnotes;
mod quizzes;
mod storage;

pub use storage::object_name;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use reqwest::{RequestBuilder, Url};

/// Shared client for every Supabase call.
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let base_url = Url::parse(&config.supabase_url)
            .map_err(|e| AppError::InvalidConfig(format!("supabase URL: {}", e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            anon_key: config.supabase_anon_key.clone(),
            service_key: config.supabase_service_key.clone(),
            bucket: config.storage_bucket.clone(),
        })
    }

    /// Build a URL under the project base; segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::InvalidConfig("supabase URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// PostgREST table endpoint.
    fn table_url(&self, table: &str) -> Result<Url> {
        self.endpoint(&["rest", "v1", table])
    }

    /// Attach the service-role credentials used for server-side row access.
    fn with_service_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.service_key)
    }

    /// Turn a non-success PostgREST response into a database error.
    async fn table_error(table: &str, response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        AppError::Database {
            table: table.to_string(),
            detail: format!("{}: {}", status, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStore {
        let config = AppConfig {
            supabase_url: "https://proj.supabase.co".into(),
            supabase_anon_key: "anon".into(),
            supabase_service_key: "service".into(),
            ..AppConfig::default()
        };
        SupabaseStore::new(&config).unwrap()
    }

    #[test]
    fn table_url_targets_postgrest() {
        let url = store().table_url("playnotes").unwrap();
        assert_eq!(url.as_str(), "https://proj.supabase.co/rest/v1/playnotes");
    }

    #[test]
    fn endpoint_encodes_segments() {
        let url = store()
            .endpoint(&["storage", "v1", "object", "pdfs", "a file.pdf"])
            .unwrap();
        assert!(url.path().ends_with("a%20file.pdf"));
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let config = AppConfig {
            supabase_url: "not a url".into(),
            ..AppConfig::default()
        };
        assert!(SupabaseStore::new(&config).is_err());
    }
}
