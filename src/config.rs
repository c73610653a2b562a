use std::fmt;
use std::path::PathBuf;
use teloxide::types::ChatId;

/// Hugging Face Inference API endpoint used when `HF_API_URL` is not set.
pub const DEFAULT_HF_API_URL: &str = "https://api-inference.huggingface.co/models/Qwen/Qwen3-32B";

const DEFAULT_PORT: u16 = 10000;
const DEFAULT_CHAT_LOG_CAPACITY: usize = 5000;
const DEFAULT_LOG_DIR: &str = "logs";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    Missing(&'static str),
    /// A variable is present but unusable.
    Invalid { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "environment variable {var} is required"),
            Self::Invalid { var, reason } => write!(f, "environment variable {var} is invalid: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub telegram_token: String,
    /// Bearer token for the inference endpoint.
    pub hf_token: String,
    pub hf_api_url: String,
    /// Messages kept per chat in the in-memory chat log.
    pub chat_log_capacity: usize,
    pub log_dir: PathBuf,
    /// Chat receiving WARN/ERROR log lines, if any.
    pub log_chat_id: Option<ChatId>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = required(&lookup, "TELEGRAM_TOKEN")?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_valid = match telegram_token.split_once(':') {
            Some((id, secret)) => id.parse::<u64>().is_ok() && !secret.is_empty() && !secret.contains(':'),
            None => false,
        };
        if !token_valid {
            return Err(ConfigError::Invalid {
                var: "TELEGRAM_TOKEN",
                reason: "expected format 123456789:ABCdefGHI...".into(),
            });
        }

        let hf_token = required(&lookup, "HF_TOKEN")?;

        let hf_api_url = optional(&lookup, "HF_API_URL").unwrap_or_else(|| DEFAULT_HF_API_URL.to_string());
        if !hf_api_url.starts_with("http://") && !hf_api_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "HF_API_URL",
                reason: format!("'{hf_api_url}' is not an http(s) URL"),
            });
        }

        let chat_log_capacity = match optional(&lookup, "CHAT_LOG_CAPACITY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        var: "CHAT_LOG_CAPACITY",
                        reason: "must be greater than zero".into(),
                    });
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "CHAT_LOG_CAPACITY",
                        reason: e.to_string(),
                    });
                }
            },
            None => DEFAULT_CHAT_LOG_CAPACITY,
        };

        let log_chat_id = optional(&lookup, "LOG_CHAT_ID")
            .map(|raw| {
                raw.parse::<i64>().map(ChatId).map_err(|e| ConfigError::Invalid {
                    var: "LOG_CHAT_ID",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let log_dir = optional(&lookup, "LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

        Ok(Self {
            telegram_token,
            hf_token,
            hf_api_url,
            chat_log_capacity,
            log_dir,
            log_chat_id,
        })
    }
}

/// Port for the health-check server, from `PORT` (default 10000).
pub fn health_port<F>(lookup: F) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional(&lookup, "PORT") {
        Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
            var: "PORT",
            reason: e.to_string(),
        }),
        None => Ok(DEFAULT_PORT),
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, var).ok_or(ConfigError::Missing(var))
}

fn optional<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
