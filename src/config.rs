//! Service configuration.
//!
//! Settings come from an optional TOML file (`$PDFCAST_CONFIG`, falling back
//! to `<config dir>/pdfcast/config.toml`) with environment variables taking
//! precedence over both the file and the built-in defaults. API keys only
//! ever arrive through those two channels and are redacted from `Debug`
//! output.

use crate::error::{AppError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for every external collaborator.
#[derive(Clone)]
pub struct AppConfig {
    /// Supabase project base URL, e.g. `https://xyz.supabase.co`.
    pub supabase_url: String,
    /// Supabase anon key, sent as `apikey` on every REST call.
    pub supabase_anon_key: String,
    /// Supabase service-role key used for server-side row operations.
    pub supabase_service_key: String,
    /// Storage bucket holding uploaded PDFs.
    pub storage_bucket: String,

    /// Play.ai API base URL.
    pub playai_base_url: String,
    /// Play.ai API key, sent raw in the `AUTHORIZATION` header.
    pub playai_api_key: String,
    /// Play.ai account id, sent in the `X-USER-ID` header.
    pub playai_user_id: String,

    /// OpenAI-compatible chat completions base URL. Empty = provider default.
    pub llm_base_url: String,
    pub llm_api_key: String,
    /// Model used for quiz generation.
    pub llm_model: String,

    /// Seconds between status polls for an in-flight synthesis job.
    pub poll_interval_secs: u64,
    /// How many 429 responses the poller tolerates before failing the job.
    pub rate_limit_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_key: String::new(),
            storage_bucket: "pdfs".to_string(),
            playai_base_url: "https://api.play.ai".to_string(),
            playai_api_key: String::new(),
            playai_user_id: String::new(),
            llm_base_url: String::new(),
            llm_api_key: String::new(),
            llm_model: "gpt-4o-mini".to_string(),
            poll_interval_secs: 5,
            rate_limit_retries: 3,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &"<redacted>")
            .field("supabase_service_key", &"<redacted>")
            .field("storage_bucket", &self.storage_bucket)
            .field("playai_base_url", &self.playai_base_url)
            .field("playai_api_key", &"<redacted>")
            .field("playai_user_id", &self.playai_user_id)
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_api_key", &"<redacted>")
            .field("llm_model", &self.llm_model)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("rate_limit_retries", &self.rate_limit_retries)
            .finish()
    }
}

/// On-disk subset of [`AppConfig`]. Every field is optional so a config file
/// can set just the values that differ from the defaults.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    supabase_service_key: Option<String>,
    storage_bucket: Option<String>,
    playai_base_url: Option<String>,
    playai_api_key: Option<String>,
    playai_user_id: Option<String>,
    llm_base_url: Option<String>,
    llm_api_key: Option<String>,
    llm_model: Option<String>,
    poll_interval_secs: Option<u64>,
    rate_limit_retries: Option<u32>,
}

impl AppConfig {
    /// Load configuration: defaults, then config file, then environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::config_file_path() {
            if path.exists() {
                let raw = std::fs::read_to_string(&path)?;
                let file: FileConfig = toml::from_str(&raw).map_err(|e| {
                    AppError::InvalidConfig(format!("{}: {}", path.display(), e))
                })?;
                config.apply_file(file);
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// `$PDFCAST_CONFIG` if set, otherwise `<config dir>/pdfcast/config.toml`.
    fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("PDFCAST_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("pdfcast").join("config.toml"))
    }

    fn apply_file(&mut self, file: FileConfig) {
        let FileConfig {
            supabase_url,
            supabase_anon_key,
            supabase_service_key,
            storage_bucket,
            playai_base_url,
            playai_api_key,
            playai_user_id,
            llm_base_url,
            llm_api_key,
            llm_model,
            poll_interval_secs,
            rate_limit_retries,
        } = file;
        if let Some(v) = supabase_url {
            self.supabase_url = v;
        }
        if let Some(v) = supabase_anon_key {
            self.supabase_anon_key = v;
        }
        if let Some(v) = supabase_service_key {
            self.supabase_service_key = v;
        }
        if let Some(v) = storage_bucket {
            self.storage_bucket = v;
        }
        if let Some(v) = playai_base_url {
            self.playai_base_url = v;
        }
        if let Some(v) = playai_api_key {
            self.playai_api_key = v;
        }
        if let Some(v) = playai_user_id {
            self.playai_user_id = v;
        }
        if let Some(v) = llm_base_url {
            self.llm_base_url = v;
        }
        if let Some(v) = llm_api_key {
            self.llm_api_key = v;
        }
        if let Some(v) = llm_model {
            self.llm_model = v;
        }
        if let Some(v) = poll_interval_secs {
            self.poll_interval_secs = v;
        }
        if let Some(v) = rate_limit_retries {
            self.rate_limit_retries = v;
        }
    }

    fn apply_env(&mut self) {
        let env = |name: &str| std::env::var(name).ok();
        if let Some(v) = env("SUPABASE_URL") {
            self.supabase_url = v;
        }
        if let Some(v) = env("SUPABASE_ANON_KEY") {
            self.supabase_anon_key = v;
        }
        if let Some(v) = env("SUPABASE_SERVICE_KEY") {
            self.supabase_service_key = v;
        }
        if let Some(v) = env("STORAGE_BUCKET") {
            self.storage_bucket = v;
        }
        if let Some(v) = env("PLAYNOTE_API_BASE_URL") {
            self.playai_base_url = v;
        }
        if let Some(v) = env("PLAYNOTE_API_KEY") {
            self.playai_api_key = v;
        }
        if let Some(v) = env("PLAYNOTE_USER_ID") {
            self.playai_user_id = v;
        }
        if let Some(v) = env("LLM_API_BASE_URL") {
            self.llm_base_url = v;
        }
        if let Some(v) = env("LLM_API_KEY") {
            self.llm_api_key = v;
        }
        if let Some(v) = env("LLM_MODEL_NAME") {
            self.llm_model = v;
        }
        if let Some(v) = env("POLL_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.poll_interval_secs = v;
        }
        if let Some(v) = env("RATE_LIMIT_RETRIES").and_then(|v| v.parse().ok()) {
            self.rate_limit_retries = v;
        }
    }

    /// Reject configurations that cannot possibly serve a request.
    pub fn validate(&self) -> Result<()> {
        if self.supabase_url.is_empty() {
            return Err(AppError::InvalidConfig("SUPABASE_URL is not set".into()));
        }
        if self.supabase_anon_key.is_empty() || self.supabase_service_key.is_empty() {
            return Err(AppError::InvalidConfig(
                "SUPABASE_ANON_KEY / SUPABASE_SERVICE_KEY are not set".into(),
            ));
        }
        if self.playai_api_key.is_empty() || self.playai_user_id.is_empty() {
            return Err(AppError::InvalidConfig(
                "PLAYNOTE_API_KEY / PLAYNOTE_USER_ID are not set".into(),
            ));
        }
        if self.llm_api_key.is_empty() {
            return Err(AppError::InvalidConfig("LLM_API_KEY is not set".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::InvalidConfig(
                "POLL_INTERVAL_SECS must be >= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.storage_bucket, "pdfs");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.rate_limit_retries, 3);
        assert_eq!(config.llm_model, "gpt-4o-mini");
    }

    #[test]
    fn empty_config_fails_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "storage_bucket = \"documents\"\npoll_interval_secs = 10"
        )
        .unwrap();
        let raw = std::fs::read_to_string(file.path()).unwrap();
        let parsed: FileConfig = toml::from_str(&raw).unwrap();

        let mut config = AppConfig::default();
        config.apply_file(parsed);
        assert_eq!(config.storage_bucket, "documents");
        assert_eq!(config.poll_interval_secs, 10);
        // Untouched fields keep their defaults.
        assert_eq!(config.rate_limit_retries, 3);
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig {
            playai_api_key: "super-secret".into(),
            ..AppConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
