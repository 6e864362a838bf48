//! Background status polling for in-flight synthesis jobs.
//!
//! One tokio task per submitted job GETs the external status on a fixed
//! interval until it reports a terminal state, then writes the result
//! through the persistence adapter and exits. Rate-limit responses (429)
//! are retried with bounded exponential backoff (1s, 2s, 4s, capped)
//! and after three of them the job is marked failed. Any other error also
//! fails the job; there is no other retry path.

use crate::error::AppError;
use crate::models::PlayNoteStatus;
use crate::playai::PlayAiClient;
use crate::store::SupabaseStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Timing knobs for the poll loop.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Fixed delay between status polls.
    pub interval: Duration,
    /// 429 responses tolerated before the job is failed.
    pub max_rate_limit_retries: u32,
    /// First backoff delay; doubles per retry.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_rate_limit_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(4),
        }
    }
}

/// Rate-limit backoff state: doubling delays, bounded attempts.
#[derive(Debug)]
struct Backoff {
    attempts: u32,
    max_attempts: u32,
    next: Duration,
    initial: Duration,
    cap: Duration,
}

impl Backoff {
    fn new(settings: &PollSettings) -> Self {
        Self {
            attempts: 0,
            max_attempts: settings.max_rate_limit_retries,
            next: settings.initial_backoff,
            initial: settings.initial_backoff,
            cap: settings.max_backoff,
        }
    }

    /// Delay before the next retry, or `None` once the budget is spent.
    /// A server-provided `Retry-After` overrides the delay but still
    /// consumes an attempt.
    fn on_rate_limit(&mut self, retry_after_secs: Option<u64>) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        let delay = retry_after_secs
            .map(Duration::from_secs)
            .unwrap_or(self.next);
        self.next = (self.next * 2).min(self.cap);
        Some(delay)
    }

    /// A successful poll clears the budget.
    fn reset(&mut self) {
        self.attempts = 0;
        self.next = self.initial;
    }
}

/// Registry of in-flight jobs, one slot per user.
#[derive(Clone, Default)]
pub struct ActiveJobs {
    inner: Arc<DashMap<String, String>>,
}

impl ActiveJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the user's slot. Fails if a job is already in flight.
    pub fn claim(&self, user_id: &str, job_id: &str) -> crate::error::Result<()> {
        match self.inner.entry(user_id.to_string()) {
            Entry::Occupied(_) => Err(AppError::JobAlreadyActive),
            Entry::Vacant(slot) => {
                slot.insert(job_id.to_string());
                Ok(())
            }
        }
    }

    /// Replace the job id in an already-claimed slot. Submission claims the
    /// slot before the external id exists, then fills it in here.
    pub fn set(&self, user_id: &str, job_id: &str) {
        self.inner.insert(user_id.to_string(), job_id.to_string());
    }

    pub fn release(&self, user_id: &str) {
        self.inner.remove(user_id);
    }

    pub fn job_for(&self, user_id: &str) -> Option<String> {
        self.inner.get(user_id).map(|entry| entry.value().clone())
    }
}

/// Drives submitted jobs to a terminal state.
pub struct JobPoller {
    playai: Arc<PlayAiClient>,
    store: Arc<SupabaseStore>,
    jobs: ActiveJobs,
    settings: PollSettings,
}

impl JobPoller {
    pub fn new(
        playai: Arc<PlayAiClient>,
        store: Arc<SupabaseStore>,
        jobs: ActiveJobs,
        settings: PollSettings,
    ) -> Self {
        Self {
            playai,
            store,
            jobs,
            settings,
        }
    }

    /// Start polling a freshly submitted job in the background. The user's
    /// slot in [`ActiveJobs`] is released when the task finishes.
    pub fn spawn(self: &Arc<Self>, user_id: String, job_id: String) {
        let poller = Arc::clone(self);
        tokio::spawn(async move {
            poller.run_job(&user_id, &job_id).await;
            poller.jobs.release(&user_id);
        });
    }

    async fn run_job(&self, user_id: &str, job_id: &str) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut backoff = Backoff::new(&self.settings);

        loop {
            ticker.tick().await;

            match self.playai.status(job_id).await {
                Ok(report) => match report.status {
                    PlayNoteStatus::Generating => {
                        backoff.reset();
                    }
                    PlayNoteStatus::Completed => {
                        let audio_url = report.audio_url.unwrap_or_default();
                        let duration = report.duration.unwrap_or(0.0);
                        if let Err(e) = self
                            .store
                            .mark_playnote_completed(job_id, &audio_url, duration)
                            .await
                        {
                            warn!(job_id, user_id, error = %e, "failed to persist completion");
                        }
                        info!(job_id, user_id, duration, "synthesis completed");
                        return;
                    }
                    PlayNoteStatus::Failed => {
                        self.fail_job(user_id, job_id, report.error.as_deref()).await;
                        return;
                    }
                },
                Err(AppError::RateLimited { retry_after_secs }) => {
                    match backoff.on_rate_limit(retry_after_secs) {
                        Some(delay) => {
                            warn!(job_id, ?delay, "rate limited, backing off");
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            self.fail_job(user_id, job_id, Some("rate limit retries exhausted"))
                                .await;
                            return;
                        }
                    }
                }
                Err(e) => {
                    self.fail_job(user_id, job_id, Some(&e.to_string())).await;
                    return;
                }
            }
        }
    }

    async fn fail_job(&self, user_id: &str, job_id: &str, reason: Option<&str>) {
        warn!(job_id, user_id, reason, "synthesis failed");
        if let Err(e) = self.store.mark_playnote_failed(job_id).await {
            warn!(job_id, error = %e, "failed to persist failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_gives_up() {
        let mut backoff = Backoff::new(&PollSettings::default());
        assert_eq!(backoff.on_rate_limit(None), Some(Duration::from_secs(1)));
        assert_eq!(backoff.on_rate_limit(None), Some(Duration::from_secs(2)));
        assert_eq!(backoff.on_rate_limit(None), Some(Duration::from_secs(4)));
        assert_eq!(backoff.on_rate_limit(None), None);
    }

    #[test]
    fn backoff_is_capped() {
        let settings = PollSettings {
            max_rate_limit_retries: 5,
            ..PollSettings::default()
        };
        let mut backoff = Backoff::new(&settings);
        let delays: Vec<u64> = (0..5)
            .map(|_| backoff.on_rate_limit(None).unwrap().as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 4, 4]);
    }

    #[test]
    fn retry_after_overrides_delay_but_consumes_attempt() {
        let mut backoff = Backoff::new(&PollSettings::default());
        assert_eq!(backoff.on_rate_limit(Some(7)), Some(Duration::from_secs(7)));
        assert_eq!(backoff.on_rate_limit(None), Some(Duration::from_secs(2)));
        assert_eq!(backoff.on_rate_limit(None), Some(Duration::from_secs(4)));
        assert_eq!(backoff.on_rate_limit(None), None);
    }

    #[test]
    fn successful_poll_resets_the_budget() {
        let mut backoff = Backoff::new(&PollSettings::default());
        backoff.on_rate_limit(None);
        backoff.on_rate_limit(None);
        backoff.reset();
        assert_eq!(backoff.on_rate_limit(None), Some(Duration::from_secs(1)));
    }

    #[test]
    fn one_active_job_per_user() {
        let jobs = ActiveJobs::new();
        jobs.claim("user-1", "job-a").unwrap();
        assert!(matches!(
            jobs.claim("user-1", "job-b"),
            Err(AppError::JobAlreadyActive)
        ));
        // A different user is unaffected.
        jobs.claim("user-2", "job-c").unwrap();
        assert_eq!(jobs.job_for("user-1").as_deref(), Some("job-a"));

        jobs.release("user-1");
        assert!(jobs.job_for("user-1").is_none());
        jobs.claim("user-1", "job-b").unwrap();
    }
}
