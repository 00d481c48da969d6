use std::str::FromStr;

pub const LOG_LEVEL_ENV: &str = "ENVELOPE_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "ENVELOPE_LOG_FORMAT";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unsupported ENVELOPE_LOG_FORMAT '{0}' (expected json or text)")]
    UnsupportedLogFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for CloudWatch ingestion.
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            _ => Err(SettingsError::UnsupportedLogFormat(value.to_string())),
        }
    }
}

/// Process-level settings read once at cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl RuntimeSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let log_level = lookup(LOG_LEVEL_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let log_format = match lookup(LOG_FORMAT_ENV) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => LogFormat::default(),
        };

        Ok(Self {
            log_level,
            log_format,
        })
    }
}
