use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

pub const BOT_TOKEN_VAR: &str = "BOT_TOKEN";
pub const CHAT_ID_VAR: &str = "CHAT_ID";
pub const MONITOR_CONFIG_VAR: &str = "MONITOR_CONFIG";
pub const PROXY_URL_VAR: &str = "PROXY_URL";

const REQUIRED_VARS: [&str; 4] = [
    BOT_TOKEN_VAR,
    CHAT_ID_VAR,
    MONITOR_CONFIG_VAR,
    PROXY_URL_VAR,
];

/// Represents different secret loading and validation failure possibilities.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SecretsError {
    #[error("could not read secrets file '{path}'; {reason}")]
    Unreadable { path: String, reason: String },

    #[error("could not parse secrets file '{path}' line {line}; {reason}")]
    Malformed {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("required secret '{0}' is missing or empty")]
    MissingValue(&'static str),

    #[error("MONITOR_CONFIG is not the JSON target list the bot consumes; {0}")]
    InvalidMonitorConfig(String),
}

/// Sensitive runtime inputs for the deployed bot, handed through to the infrastructure
/// definition as variables. Loaded once per run and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct DeploySecrets {
    pub bot_token: String,
    pub chat_id: String,
    pub monitor_config: String,
    pub proxy_url: String,
}

// Values stay out of logs and panic reports; Debug only tells empty from set.
impl fmt::Debug for DeploySecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploySecrets")
            .field("bot_token", &redact(&self.bot_token))
            .field("chat_id", &redact(&self.chat_id))
            .field("monitor_config", &redact(&self.monitor_config))
            .field("proxy_url", &redact(&self.proxy_url))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

/// One monitored schedule endpoint from MONITOR_CONFIG. The deployed bot is the real
/// consumer; only the shape it will read is checked here. Upstream configs use both
/// numeric and string ids.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct MonitorTarget {
    id: serde_json::Value,
    name: String,
    url: String,
}

impl DeploySecrets {
    /// Loads secrets from the optional dotenv-format file at `path`, then lets the
    /// process environment override file values. A missing file is not an error; the
    /// environment alone can supply everything.
    pub fn load(path: &Path) -> Result<Self, SecretsError> {
        let file_values = match std::fs::read_to_string(path) {
            Ok(raw) => parse_env_file(&raw, path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(SecretsError::Unreadable {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        Ok(Self::from_sources(file_values, |key| {
            std::env::var(key).ok()
        }))
    }

    fn from_sources(
        mut values: BTreeMap<String, String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        for key in REQUIRED_VARS {
            if let Some(value) = env(key) {
                values.insert(key.to_string(), value);
            }
        }

        let take = |key: &str| values.get(key).cloned().unwrap_or_default();

        DeploySecrets {
            bot_token: take(BOT_TOKEN_VAR),
            chat_id: take(CHAT_ID_VAR),
            monitor_config: take(MONITOR_CONFIG_VAR),
            proxy_url: take(PROXY_URL_VAR),
        }
    }

    /// Upfront validation: all four values present and the monitor config parses as
    /// the JSON array of targets the bot reads. Empty values used to sail through and
    /// break only once the service was already cycled; failing here keeps bad inputs
    /// off the provider entirely.
    pub fn validate(&self) -> Result<(), SecretsError> {
        for (name, value) in [
            (BOT_TOKEN_VAR, &self.bot_token),
            (CHAT_ID_VAR, &self.chat_id),
            (MONITOR_CONFIG_VAR, &self.monitor_config),
            (PROXY_URL_VAR, &self.proxy_url),
        ] {
            if value.trim().is_empty() {
                return Err(SecretsError::MissingValue(name));
            }
        }

        serde_json::from_str::<Vec<MonitorTarget>>(&self.monitor_config)
            .map_err(|e| SecretsError::InvalidMonitorConfig(e.to_string()))?;

        Ok(())
    }

    /// Variable names the infrastructure definition declares, mapped to the secret
    /// values that fill them.
    pub fn as_variables(&self) -> HashMap<String, String> {
        HashMap::from([
            ("bot_token".to_string(), self.bot_token.clone()),
            ("chat_id".to_string(), self.chat_id.clone()),
            ("monitor_config".to_string(), self.monitor_config.clone()),
            ("proxy_url".to_string(), self.proxy_url.clone()),
        ])
    }
}

/// Parses dotenv-format content: KEY=value lines, '#' comments, blank lines, an
/// optional leading "export ", and values wrapped in single or double quotes.
fn parse_env_file(raw: &str, path: &Path) -> Result<BTreeMap<String, String>, SecretsError> {
    let mut values = BTreeMap::new();

    for (index, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed).trim_start();

        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(SecretsError::Malformed {
                path: path.display().to_string(),
                line: index + 1,
                reason: "expected KEY=value".to_string(),
            });
        };

        let key = key.trim_end();
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(SecretsError::Malformed {
                path: path.display().to_string(),
                line: index + 1,
                reason: format!("invalid key '{key}'"),
            });
        }

        values.insert(key.to_string(), unquote(value.trim()));
    }

    Ok(values)
}

/// Strips one layer of matching quotes. Double quoting also unescapes the sequences
/// serialization produces, so multi-line values round-trip.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        }
        out
    } else if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}
