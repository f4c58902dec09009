

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{Result, SkillBridgeError};
use crate::db::PartialScanPolicy;
use crate::llm::embeddings::EmbeddingProvider;
use crate::search::ranking::RankingConfig;

/// Prefix for environment overrides, e.g. `SKILL_BRIDGE_EMBEDDING__BASE_URL`.
pub const ENV_PREFIX: &str = "SKILL_BRIDGE";


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillBridgeConfig {
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub ranking: RankingConfig,
    pub cache: CacheConfig,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Vectorize,
            base_url: crate::DEFAULT_EMBEDDING_URL.to_string(),
            model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Firestore,
    Snapshot,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub base_url: String,
    pub project_id: Option<String>,
    pub collection: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub page_size: u32,
    pub snapshot_path: Option<PathBuf>,
    pub partial_policy: PartialScanPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Firestore,
            base_url: crate::DEFAULT_FIRESTORE_URL.to_string(),
            project_id: None,
            collection: "users".to_string(),
            api_key: None,
            access_token: None,
            page_size: 300,
            snapshot_path: None,
            partial_policy: PartialScanPolicy::Abort,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: crate::DEFAULT_CACHE_SIZE,
            ttl_secs: crate::DEFAULT_CACHE_TTL,
        }
    }
}

impl SkillBridgeConfig {
    /// Layers defaults, an optional config file, then `SKILL_BRIDGE_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("Loading config file {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }


    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }


    pub fn validate(&self) -> Result<()> {
        if self.embedding.base_url.trim().is_empty() {
            return Err(SkillBridgeError::Config("embedding.base_url is empty".into()));
        }
        if self.store.kind == StoreKind::Firestore {
            if self.store.base_url.trim().is_empty() {
                return Err(SkillBridgeError::Config("store.base_url is empty".into()));
            }
            if self.store.page_size == 0 {
                return Err(SkillBridgeError::Config("store.page_size must be positive".into()));
            }
        }
        if self.store.kind == StoreKind::Snapshot && self.store.snapshot_path.is_none() {
            return Err(SkillBridgeError::Config(
                "store.snapshot_path is required for the snapshot store".into(),
            ));
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(SkillBridgeError::Config("cache.capacity must be positive".into()));
        }
        self.ranking.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = SkillBridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.collection, "users");
        assert_eq!(config.ranking.top_k, 5);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Vectorize);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[embedding]
provider = "ollama"
base_url = "http://embed.local:11434"
model = "nomic-embed-text"

[store]
project_id = "skill-bridge-dev"
page_size = 50
partial_policy = "rank_partial"

[ranking]
min_score = 0.5
"#
        )
        .unwrap();

        let config = SkillBridgeConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(config.embedding.base_url, "http://embed.local:11434");
        assert_eq!(config.store.project_id.as_deref(), Some("skill-bridge-dev"));
        assert_eq!(config.store.page_size, 50);
        assert_eq!(config.store.partial_policy, PartialScanPolicy::RankPartial);
        assert!((config.ranking.min_score - 0.5).abs() < f64::EPSILON);
        // untouched keys keep their defaults
        assert_eq!(config.ranking.top_k, 5);
        assert_eq!(config.embedding.timeout_secs, 30);
    }

    #[test]
    fn test_snapshot_store_requires_path() {
        let mut config = SkillBridgeConfig::default();
        config.store.kind = StoreKind::Snapshot;
        assert!(config.validate().is_err());

        config.store.snapshot_path = Some(PathBuf::from("profiles.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = SkillBridgeConfig::default();
        config.store.api_key = Some("secret-key".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
