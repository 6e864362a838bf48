//! Shared handler state.

use crate::config::AppConfig;
use crate::error::Result;
use crate::playai::PlayAiClient;
use crate::poller::{ActiveJobs, JobPoller, PollSettings};
use crate::quizgen::QuizGenerator;
use crate::session::SessionStore;
use crate::store::SupabaseStore;
use std::sync::Arc;

/// Everything a request handler can reach. Cheap to clone; all fields are
/// shared handles.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SupabaseStore>,
    pub playai: Arc<PlayAiClient>,
    pub quizgen: Arc<QuizGenerator>,
    pub poller: Arc<JobPoller>,
    pub jobs: ActiveJobs,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Wire up every collaborator from one validated config.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(SupabaseStore::new(config)?);
        let playai = Arc::new(PlayAiClient::new(config)?);
        let quizgen = Arc::new(QuizGenerator::new(config));
        let jobs = ActiveJobs::new();
        let poller = Arc::new(JobPoller::new(
            Arc::clone(&playai),
            Arc::clone(&store),
            jobs.clone(),
            PollSettings {
                interval: config.poll_interval(),
                max_rate_limit_retries: config.rate_limit_retries,
                ..PollSettings::default()
            },
        ));
        Ok(Self {
            store,
            playai,
            quizgen,
            poller,
            jobs,
            sessions: Arc::new(SessionStore::new()),
        })
    }
}
