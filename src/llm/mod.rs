

pub mod embeddings;

pub use embeddings::{EmbeddingClient, EmbeddingError, EmbeddingProvider, HttpEmbeddingClient};
