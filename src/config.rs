use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::openai::{DEFAULT_BASE_URL, ModelProfile};

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const TRANSLATION_TEMPERATURE: f32 = 0.3;
const CLASSIFIER_TEMPERATURE: f32 = 0.0;
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_RETRIEVAL_K: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, resolved from the environment (and `.env`, loaded by `main`).
///
/// Every key is optional except `OPENAI_API_KEY`, whose absence only surfaces
/// once a model client is built.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub answer: ModelProfile,
    pub translation: ModelProfile,
    pub classifier: ModelProfile,
    pub embedding_model: String,
    pub retrieval_k: usize,
    pub docs_dir: PathBuf,
    pub store_path: PathBuf,
    pub knowledge_base_path: PathBuf,
    pub phrases_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let string_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let path_or = |key: &str, default: &str| PathBuf::from(string_or(key, default));

        let temperature = parse_or(get("FUNSANI_TEMPERATURE"), "FUNSANI_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                key: "FUNSANI_TEMPERATURE",
                value: temperature.to_string(),
            });
        }
        let retrieval_k = parse_or(get("FUNSANI_RETRIEVAL_K"), "FUNSANI_RETRIEVAL_K", DEFAULT_RETRIEVAL_K)?;
        if retrieval_k == 0 {
            return Err(ConfigError::Invalid {
                key: "FUNSANI_RETRIEVAL_K",
                value: "0".into(),
            });
        }

        Ok(Self {
            api_key: get("OPENAI_API_KEY"),
            base_url: string_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            answer: ModelProfile::new(string_or("FUNSANI_MODEL", DEFAULT_MODEL), temperature),
            translation: ModelProfile::new(
                string_or("FUNSANI_TRANSLATION_MODEL", DEFAULT_MODEL),
                TRANSLATION_TEMPERATURE,
            ),
            classifier: ModelProfile::new(
                string_or("FUNSANI_CLASSIFIER_MODEL", DEFAULT_MODEL),
                CLASSIFIER_TEMPERATURE,
            ),
            embedding_model: string_or("FUNSANI_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            retrieval_k,
            docs_dir: path_or("FUNSANI_DOCS_DIR", "data/docs"),
            store_path: path_or("FUNSANI_STORE_PATH", "data/vectorstore/index.json"),
            knowledge_base_path: path_or("FUNSANI_KNOWLEDGE_BASE", "data/knowledge_base.json"),
            phrases_path: path_or(
                "FUNSANI_PHRASES",
                "data/translations/english_chichewa_phrases.csv",
            ),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("answer", &self.answer)
            .field("translation", &self.translation)
            .field("classifier", &self.classifier)
            .field("embedding_model", &self.embedding_model)
            .field("retrieval_k", &self.retrieval_k)
            .field("docs_dir", &self.docs_dir)
            .field("store_path", &self.store_path)
            .field("knowledge_base_path", &self.knowledge_base_path)
            .field("phrases_path", &self.phrases_path)
            .finish()
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.answer, ModelProfile::new("gpt-4", 0.7));
        assert_eq!(config.translation.temperature, 0.3);
        assert_eq!(config.classifier.temperature, 0.0);
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.retrieval_k, 3);
        assert_eq!(config.docs_dir, PathBuf::from("data/docs"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("OPENAI_API_KEY", "   "), ("FUNSANI_MODEL", "")]).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.answer.model, "gpt-4");
    }

    #[test]
    fn overrides_are_trimmed() {
        let config = config_from(&[
            ("OPENAI_API_KEY", " sk-test "),
            ("FUNSANI_MODEL", "gpt-4o"),
            ("FUNSANI_RETRIEVAL_K", "5"),
            ("FUNSANI_TEMPERATURE", "0.2"),
        ])
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.answer, ModelProfile::new("gpt-4o", 0.2));
        assert_eq!(config.retrieval_k, 5);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-secret")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn unparseable_number_is_rejected() {
        let err = config_from(&[("FUNSANI_RETRIEVAL_K", "three")]).unwrap_err();
        assert!(err.to_string().contains("FUNSANI_RETRIEVAL_K"));
    }

    #[test]
    fn zero_k_and_wild_temperature_are_rejected() {
        assert!(config_from(&[("FUNSANI_RETRIEVAL_K", "0")]).is_err());
        assert!(config_from(&[("FUNSANI_TEMPERATURE", "3.5")]).is_err());
    }
}
