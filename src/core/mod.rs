

pub mod config;
pub mod error;

pub use config::{CacheConfig, EmbeddingConfig, SkillBridgeConfig, StoreConfig, StoreKind};
pub use error::{Result, SkillBridgeError};
