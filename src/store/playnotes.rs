//! Playnote row operations.
//!
//! Rows are keyed by the external synthesis job id. The two terminal
//! updates carry a `status=eq.generating` filter so a row that already
//! reached a terminal state is left untouched even if a stale poller
//! fires twice; the monotonic transition is enforced at the row level.

use super::SupabaseStore;
use crate::error::Result;
use crate::models::PlayNote;
use serde_json::json;
use tracing::debug;

const TABLE: &str = "playnotes";

impl SupabaseStore {
    /// Insert or update a playnote, keyed by the external job id.
    pub async fn upsert_playnote(&self, note: &PlayNote) -> Result<()> {
        let url = self.table_url(TABLE)?;
        let response = self
            .with_service_auth(self.http.post(url))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[note])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(TABLE, response).await);
        }
        debug!(id = %note.id, "playnote upserted");
        Ok(())
    }

    /// All of a user's playnotes, newest first.
    pub async fn list_playnotes(&self, user_id: &str) -> Result<Vec<PlayNote>> {
        let url = self.table_url(TABLE)?;
        let response = self
            .with_service_auth(self.http.get(url))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(TABLE, response).await);
        }
        Ok(response.json().await?)
    }

    /// The user's single in-flight playnote, if any.
    pub async fn in_progress_playnote(&self, user_id: &str) -> Result<Option<PlayNote>> {
        let url = self.table_url(TABLE)?;
        let response = self
            .with_service_auth(self.http.get(url))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("status", "eq.generating".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(TABLE, response).await);
        }
        let mut rows: Vec<PlayNote> = response.json().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    /// Record a finished synthesis. Only rows still generating are touched.
    pub async fn mark_playnote_completed(
        &self,
        id: &str,
        audio_url: &str,
        duration: f64,
    ) -> Result<()> {
        self.finish_playnote(
            id,
            json!({
                "status": "completed",
                "audio_url": audio_url,
                "duration": duration,
            }),
        )
        .await
    }

    /// Record a failed synthesis. Only rows still generating are touched.
    pub async fn mark_playnote_failed(&self, id: &str) -> Result<()> {
        self.finish_playnote(id, json!({ "status": "failed" })).await
    }

    async fn finish_playnote(&self, id: &str, patch: serde_json::Value) -> Result<()> {
        let url = self.table_url(TABLE)?;
        let response = self
            .with_service_auth(self.http.patch(url))
            .query(&[
                ("id", format!("eq.{}", id)),
                ("status", "eq.generating".to_string()),
            ])
            .json(&patch)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(TABLE, response).await);
        }
        debug!(id, "playnote reached terminal state");
        Ok(())
    }
}
