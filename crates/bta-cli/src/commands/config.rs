//! Global options shared by every command.
//!
//! Each option can also be set through its environment variable (or a `.env`
//! file loaded at startup).

use anyhow::Result;
use bta_core::config::{DEFAULT_DATABASE, DEFAULT_DATA_DIR};
use bta_core::Settings;
use bta_llm::{OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// SQLite history database
    #[arg(long, global = true, env = "BTA_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Directory uploaded reports are stored in while being analyzed
    #[arg(long, global = true, env = "BTA_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Redis URL for the task queue; in-process queue when unset
    #[arg(long, global = true, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// API key for the chat-completions endpoint
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API (e.g. http://localhost:11434/v1 for Ollama)
    #[arg(long, global = true, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Chat model name
    #[arg(long, global = true, env = "BTA_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Requests per minute sent to the model (0 = unlimited)
    #[arg(long, global = true, env = "BTA_MAX_RPM", default_value_t = 0)]
    pub max_rpm: u32,

    /// Retries when the model API answers 429
    #[arg(long, global = true, env = "BTA_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Sampling temperature for every agent (defaults to each agent's own)
    #[arg(long, global = true, env = "BTA_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// Report text beyond this many bytes is cut before prompting
    #[arg(long, global = true, env = "BTA_MAX_REPORT_CHARS", default_value_t = 24_000)]
    pub max_report_chars: usize,

    /// Largest accepted upload in bytes
    #[arg(long, global = true, env = "BTA_UPLOAD_LIMIT", default_value_t = 10 * 1024 * 1024)]
    pub upload_limit: usize,

    /// How long job states are kept, in seconds
    #[arg(long, global = true, env = "BTA_JOB_TTL_SECS", default_value_t = 86_400)]
    pub job_ttl_secs: u64,

    /// Uploads older than this many seconds are swept
    #[arg(long, global = true, env = "BTA_CLEANUP_MAX_AGE_SECS", default_value_t = 3_600)]
    pub cleanup_max_age_secs: u64,
}

impl ConfigArgs {
    /// Resolve into validated [`Settings`].
    pub fn to_settings(&self) -> Result<Settings> {
        let defaults = Settings::default();
        let settings = Settings {
            database_path: self.database.clone(),
            data_dir: self.data_dir.clone(),
            redis_url: self.redis_url.clone().filter(|u| !u.trim().is_empty()),
            llm: OpenAiConfig {
                base_url: self.base_url.clone(),
                api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
                model: self.model.clone(),
                max_rpm: self.max_rpm,
                max_retries: self.max_retries,
                ..OpenAiConfig::default()
            },
            temperature: self.temperature,
            max_report_chars: self.max_report_chars,
            upload_limit: self.upload_limit,
            job_ttl: Duration::from_secs(self.job_ttl_secs),
            cleanup_max_age: Duration::from_secs(self.cleanup_max_age_secs),
            ..defaults
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::try_parse_from([
            "bta",
            "--database",
            "/tmp/test.db",
            "--redis-url",
            "redis://localhost:6379",
            "--model",
            "llama3",
            "--temperature",
            "0.3",
        ])
        .unwrap();
        let settings = cli.config.to_settings().unwrap();
        assert_eq!(settings.database_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(settings.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(settings.llm.model, "llama3");
        assert_eq!(settings.temperature, Some(0.3));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let cli = TestCli::try_parse_from(["bta", "--redis-url", "localhost:6379"]).unwrap();
        assert!(cli.config.to_settings().is_err());
    }
}
