//! PlayNote: one generated audio artifact.
//!
//! A row is created the moment a synthesis job is accepted (status
//! `generating`) and is only ever moved forward by the status poller.
//! Terminal states are absorbing: once a note is `completed` or `failed`
//! nothing can take it back to `generating`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a synthesis job, as stored and as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayNoteStatus {
    Generating,
    Completed,
    Failed,
}

impl PlayNoteStatus {
    /// Completed and failed jobs are never polled or mutated again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for PlayNoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A generated (or in-flight) podcast, keyed by the external job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayNote {
    /// External synthesis job identifier.
    pub id: String,
    pub user_id: String,
    /// Display name, normally the uploaded file's name.
    pub name: String,
    pub source_file_url: String,
    pub audio_url: Option<String>,
    pub synthesis_style: String,
    pub voice1: String,
    pub voice2: String,
    pub status: PlayNoteStatus,
    /// Audio length in seconds; 0 until the job completes.
    #[serde(default)]
    pub duration: f64,
    pub requested_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub original_filename: Option<String>,
}

impl PlayNote {
    /// A freshly submitted job, not yet finished.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        source_file_url: impl Into<String>,
        synthesis_style: impl Into<String>,
        voice1: impl Into<String>,
        voice2: impl Into<String>,
        original_filename: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            source_file_url: source_file_url.into(),
            audio_url: None,
            synthesis_style: synthesis_style.into(),
            voice1: voice1.into(),
            voice2: voice2.into(),
            status: PlayNoteStatus::Generating,
            duration: 0.0,
            requested_at: now,
            created_at: now,
            original_filename,
        }
    }

    /// Mark the note completed. Returns false (and changes nothing) if the
    /// note already reached a terminal state.
    pub fn complete(&mut self, audio_url: impl Into<String>, duration: f64) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = PlayNoteStatus::Completed;
        self.audio_url = Some(audio_url.into());
        self.duration = duration;
        true
    }

    /// Mark the note failed. Returns false if the note is already terminal.
    pub fn fail(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = PlayNoteStatus::Failed;
        true
    }
}

/// Order notes the way the playback list shows them: anything still
/// generating first, then newest to oldest.
pub fn display_order(notes: &mut [PlayNote]) {
    notes.sort_by(|a, b| {
        let a_gen = a.status == PlayNoteStatus::Generating;
        let b_gen = b.status == PlayNoteStatus::Generating;
        b_gen
            .cmp(&a_gen)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn note(id: &str, status: PlayNoteStatus, created_secs: i64) -> PlayNote {
        let mut n = PlayNote::new(
            id,
            "user-1",
            "doc.pdf",
            "https://files.example/doc.pdf",
            "podcast",
            "voice-a",
            "voice-b",
            Some("doc.pdf".to_string()),
        );
        n.status = status;
        n.created_at = Utc.timestamp_opt(created_secs, 0).unwrap();
        n
    }

    #[test]
    fn new_note_is_generating() {
        let n = note("j1", PlayNoteStatus::Generating, 0);
        assert_eq!(n.status, PlayNoteStatus::Generating);
        assert!(n.audio_url.is_none());
        assert_eq!(n.duration, 0.0);
    }

    #[test]
    fn complete_sets_audio_and_duration() {
        let mut n = note("j1", PlayNoteStatus::Generating, 0);
        assert!(n.complete("https://audio.example/j1.mp3", 421.5));
        assert_eq!(n.status, PlayNoteStatus::Completed);
        assert_eq!(n.audio_url.as_deref(), Some("https://audio.example/j1.mp3"));
        assert_eq!(n.duration, 421.5);
    }

    #[test]
    fn completed_note_never_reverts() {
        let mut n = note("j1", PlayNoteStatus::Generating, 0);
        assert!(n.complete("https://audio.example/j1.mp3", 10.0));
        assert!(!n.fail());
        assert_eq!(n.status, PlayNoteStatus::Completed);
        assert!(!n.complete("https://audio.example/other.mp3", 99.0));
        assert_eq!(n.audio_url.as_deref(), Some("https://audio.example/j1.mp3"));
    }

    #[test]
    fn failed_note_never_completes() {
        let mut n = note("j1", PlayNoteStatus::Generating, 0);
        assert!(n.fail());
        assert!(!n.complete("https://audio.example/j1.mp3", 10.0));
        assert_eq!(n.status, PlayNoteStatus::Failed);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&PlayNoteStatus::Generating).unwrap();
        assert_eq!(json, "\"generating\"");
        let back: PlayNoteStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(back, PlayNoteStatus::Failed);
    }

    #[test]
    fn display_order_puts_generating_first_then_newest() {
        let mut notes = vec![
            note("old-done", PlayNoteStatus::Completed, 100),
            note("new-done", PlayNoteStatus::Completed, 300),
            note("gen", PlayNoteStatus::Generating, 50),
            note("mid-failed", PlayNoteStatus::Failed, 200),
        ];
        display_order(&mut notes);
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["gen", "new-done", "mid-failed", "old-done"]);
    }
}
