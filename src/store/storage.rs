//! Uploaded-PDF object storage.
//!
//! Objects land in a public bucket; the returned URL is what the synthesis
//! API downloads the document from, so it must be reachable without auth.

use super::SupabaseStore;
use crate::error::{AppError, Result};
use chrono::Utc;
use tracing::debug;

impl SupabaseStore {
    /// Store PDF bytes and return the public URL.
    pub async fn upload_pdf(&self, object: &str, bytes: Vec<u8>) -> Result<String> {
        let url = self.endpoint(&["storage", "v1", "object", self.bucket.as_str(), object])?;
        let response = self
            .with_service_auth(self.http.post(url))
            .header("Content-Type", "application/pdf")
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StorageUpload {
                object: object.to_string(),
                detail: format!("{}: {}", status, body),
            });
        }
        let public = self.public_url(object)?;
        debug!(object, url = %public, "pdf stored");
        Ok(public)
    }

    /// Public download URL for a stored object.
    pub fn public_url(&self, object: &str) -> Result<String> {
        Ok(self
            .endpoint(&["storage", "v1", "object", "public", self.bucket.as_str(), object])?
            .to_string())
    }
}

/// Object name for an upload: millisecond timestamp, dash, original name.
/// The timestamp keeps repeated uploads of the same file distinct.
pub fn object_name(filename: &str) -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn public_url_includes_bucket_and_object() {
        let config = AppConfig {
            supabase_url: "https://proj.supabase.co".into(),
            supabase_anon_key: "anon".into(),
            supabase_service_key: "service".into(),
            ..AppConfig::default()
        };
        let store = SupabaseStore::new(&config).unwrap();
        let url = store.public_url("123-doc.pdf").unwrap();
        assert_eq!(
            url,
            "https://proj.supabase.co/storage/v1/object/public/pdfs/123-doc.pdf"
        );
    }

    #[test]
    fn object_names_keep_the_filename() {
        let name = object_name("lecture one.pdf");
        assert!(name.ends_with("-lecture one.pdf"));
        let millis: i64 = name.split('-').next().unwrap().parse().unwrap();
        assert!(millis > 0);
    }
}
