//! Runtime configuration.
//!
//! Values come from the process environment, which `load_dotenv` seeds from
//! `.env` (desktop dev) or the bundled `assets/config.env`.

use crate::ai::DEFAULT_ENDPOINT;
use crate::personas::Variant;
use std::fmt;
use std::str::FromStr;

/// Bundled config for mobile builds (iOS/Android)
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

/// Characters of document or search context injected per system prompt.
pub const DEFAULT_CONTEXT_BUDGET: usize = 50_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API key missing. Set GROQ_API_KEY or enter a key to start the session.")]
    MissingCredential,

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// `None` for blank input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        (!key.is_empty()).then_some(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// OpenAI-compatible HTTP endpoint, streams natively.
    #[default]
    Endpoint,
    Groq,
    OpenAI,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Endpoint => "endpoint",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAI => "openai",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "endpoint" | "http" | "" => Ok(ProviderKind::Endpoint),
            "groq" => Ok(ProviderKind::Groq),
            "openai" => Ok(ProviderKind::OpenAI),
            other => Err(format!(
                "unknown provider '{other}'. Supported: endpoint, groq, openai"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub variant: Variant,
    pub model: String,
    pub provider: ProviderKind,
    pub endpoint: String,
    pub context_char_budget: usize,
    pub search_enabled: bool,
    credential: Option<Credential>,
    search_credential: Option<Credential>,
}

impl AppConfig {
    /// Defaults for a variant, no credential.
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            model: variant.default_model().to_string(),
            provider: ProviderKind::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            context_char_budget: DEFAULT_CONTEXT_BUDGET,
            search_enabled: true,
            credential: None,
            search_credential: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. A missing credential is not an error here;
    /// it is checked when a provider is built.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let variant = match lookup("DOUBLEAGENT_VARIANT") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "DOUBLEAGENT_VARIANT",
                reason,
            })?,
            None => Variant::default(),
        };
        let mut config = Self::for_variant(variant);

        if let Some(model) = lookup("DOUBLEAGENT_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = lookup("DOUBLEAGENT_PROVIDER") {
            config.provider = raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "DOUBLEAGENT_PROVIDER",
                reason,
            })?;
        }
        if let Some(endpoint) = lookup("DOUBLEAGENT_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            config.endpoint = endpoint.trim().to_string();
        }
        if let Some(raw) = lookup("DOUBLEAGENT_CONTEXT_BUDGET") {
            config.context_char_budget = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "DOUBLEAGENT_CONTEXT_BUDGET",
                reason: format!("{e}"),
            })?;
        }
        if let Some(raw) = lookup("DOUBLEAGENT_SEARCH") {
            config.search_enabled = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        config.search_credential = lookup("DOUBLEAGENT_BRAVE_API_KEY")
            .or_else(|| lookup("BRAVE_API_KEY"))
            .and_then(Credential::new);
        config.credential = lookup("DOUBLEAGENT_API_KEY")
            .or_else(|| lookup("GROQ_API_KEY"))
            .and_then(Credential::new);

        Ok(config)
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn credential(&self) -> Result<&Credential, ConfigError> {
        self.credential.as_ref().ok_or(ConfigError::MissingCredential)
    }

    /// Brave Search key; without one, search falls back to DuckDuckGo.
    pub fn search_credential(&self) -> Option<&Credential> {
        self.search_credential.as_ref()
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_dotenv() {
    // First try to load from .env file (desktop dev)
    if dotenvy::dotenv().is_ok() {
        return;
    }

    // Fall back to bundled config (mobile builds)
    load_bundled_config();
}

#[cfg(target_arch = "wasm32")]
pub fn load_dotenv() {
    load_bundled_config();
}

fn load_bundled_config() {
    for (key, value) in parse_env_lines(BUNDLED_CONFIG) {
        // Only set if not already set (allow env override)
        if std::env::var(key).is_err() {
            // SAFETY: We're setting env vars at startup before any threads are spawned
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
}

fn parse_env_lines(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let line = line.trim();
        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some((key.trim(), value.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_follow_variant() {
        let config = AppConfig::from_lookup(lookup_from(&[("DOUBLEAGENT_VARIANT", "council")])).unwrap();
        assert_eq!(config.variant, Variant::Council);
        assert_eq!(config.model, "llama3-70b-8192");
        assert_eq!(config.context_char_budget, DEFAULT_CONTEXT_BUDGET);
        assert!(!config.has_credential());
        assert!(matches!(config.credential(), Err(ConfigError::MissingCredential)));
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DOUBLEAGENT_MODEL", "custom-model"),
            ("DOUBLEAGENT_CONTEXT_BUDGET", "10000"),
            ("DOUBLEAGENT_PROVIDER", "groq"),
            ("DOUBLEAGENT_SEARCH", "off"),
            ("GROQ_API_KEY", "gsk_test"),
        ]))
        .unwrap();
        assert_eq!(config.model, "custom-model");
        assert_eq!(config.context_char_budget, 10_000);
        assert_eq!(config.provider, ProviderKind::Groq);
        assert!(!config.search_enabled);
        assert_eq!(config.credential().unwrap().expose(), "gsk_test");
    }

    #[test]
    fn bad_budget_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("DOUBLEAGENT_CONTEXT_BUDGET", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("DOUBLEAGENT_CONTEXT_BUDGET"));
    }

    #[test]
    fn brave_key_is_optional() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert!(config.search_credential().is_none());

        let config = AppConfig::from_lookup(lookup_from(&[("BRAVE_API_KEY", "bsa_test")])).unwrap();
        assert_eq!(config.search_credential().unwrap().expose(), "bsa_test");
        assert!(!config.has_credential());
    }

    #[test]
    fn blank_key_is_no_credential() {
        assert!(Credential::new("   ").is_none());
        let key = Credential::new("secret").unwrap();
        assert_eq!(format!("{key:?}"), "Credential(***)");
    }

    #[test]
    fn env_lines_skip_comments() {
        let parsed: Vec<_> = parse_env_lines("# c\n\nA = 1\nB=two\nnot a pair").collect();
        assert_eq!(parsed, vec![("A", "1"), ("B", "two")]);
    }
}
