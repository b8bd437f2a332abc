//! Configuration loading for rext.
//!
//! Configuration lives in `~/.rext/config.toml`. Every section is optional:
//!
//! ```toml
//! [model]
//! name = "gpt-4o"
//! base_url = "https://api.openai.com/v1"
//! idle_timeout_secs = 60
//!
//! [api_keys]
//! openai = "${OPENAI_API_KEY}"
//!
//! [annotations]
//! preview_chars = 25
//! color = "grey"
//! ```

use serde::Deserialize;
use std::{env, path::Path, path::PathBuf};
use thiserror::Error;

/// Model used when `[model] name` is not set.
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Environment variable consulted when the config has no API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_PREVIEW_CHARS: usize = 25;
const DEFAULT_COLOR: &str = "grey";

#[derive(Debug, Default, Deserialize)]
pub struct RextConfig {
    pub model: Option<ModelConfig>,
    pub api_keys: Option<ApiKeys>,
    pub annotations: Option<AnnotationsConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Model selection and transport settings.
#[derive(Debug, Default, Deserialize)]
pub struct ModelConfig {
    pub name: Option<String>,
    /// Override of the API base URL (e.g. a local OpenAI-compatible gateway).
    pub base_url: Option<String>,
    /// Seconds of stream silence before the response is abandoned.
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Default, Deserialize)]
pub struct ApiKeys {
    pub openai: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let openai = if self.openai.is_some() {
            "[REDACTED]"
        } else {
            "None"
        };
        f.debug_struct("ApiKeys").field("openai", &openai).finish()
    }
}

/// Appearance of inline annotations.
#[derive(Debug, Deserialize)]
pub struct AnnotationsConfig {
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for AnnotationsConfig {
    fn default() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

const fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// Replace `${VAR}` references with environment values; unset variables become empty.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if var.is_empty() {
            out.push_str("${}");
        } else {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl RextConfig {
    /// Load the user config. `Ok(None)` when there is no config file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.model.as_ref().and_then(|m| m.base_url.as_deref())
    }

    #[must_use]
    pub fn idle_timeout_secs(&self) -> Option<u64> {
        self.model
            .as_ref()
            .and_then(|m| m.idle_timeout_secs)
            .filter(|secs| *secs > 0)
    }

    /// OpenAI key from the config (with `${VAR}` expansion), else from `OPENAI_API_KEY`.
    #[must_use]
    pub fn openai_api_key(&self) -> Option<String> {
        self.api_keys
            .as_ref()
            .and_then(|keys| keys.openai.as_deref())
            .map(expand_env_vars)
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                env::var(OPENAI_API_KEY_ENV)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
    }

    #[must_use]
    pub fn annotations(&self) -> AnnotationsConfig {
        match &self.annotations {
            Some(a) => AnnotationsConfig {
                preview_chars: a.preview_chars,
                color: a.color.clone(),
            },
            None => AnnotationsConfig::default(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".rext").join("config.toml"))
}
