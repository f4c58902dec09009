

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::core::config::SkillBridgeConfig;
use crate::core::error::SkillBridgeError;
use crate::db::{CandidateSource, build_source};
use crate::llm::embeddings::{EmbeddingClient, HttpEmbeddingClient};
use crate::search::cache::QueryEmbeddingCache;
use crate::search::models::SearchOutcome;
use crate::search::ranker::Ranker;
use crate::search::sequencer::SearchSequencer;

/// Env var naming an optional config file for the server.
pub const CONFIG_PATH_ENV: &str = "SKILL_BRIDGE_CONFIG";

const MAX_TRACKED_REQUESTERS: usize = 1024;


#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct SearchPartnersParams {
    #[schemars(description = "Free-text description of the collaborator (e.g. 'PyTorch for medical imaging')")]
    pub query: String,
    #[schemars(description = "Id of the searching user; excluded from results")]
    pub requester_id: Option<String>,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct VectorizeParams {
    #[schemars(description = "Text to embed")]
    pub query_text: String,
}

#[derive(Debug, Serialize)]
struct VectorizeResult {
    embedding: Vec<f32>,
    dimensions: usize,
}


#[derive(Clone)]
pub struct SkillBridgeMcpServer {
    ranker: Arc<Ranker>,
    source: Arc<dyn CandidateSource>,
    config: Arc<SkillBridgeConfig>,
    cache: Option<Arc<QueryEmbeddingCache>>,
    sequencers: Arc<Mutex<LruCache<String, Arc<SearchSequencer>>>>,
    tool_router: ToolRouter<Self>,
}

impl SkillBridgeMcpServer {

    pub fn new(
        ranker: Ranker,
        source: Arc<dyn CandidateSource>,
        config: SkillBridgeConfig,
        cache: Option<Arc<QueryEmbeddingCache>>,
    ) -> Self {
        let capacity = NonZeroUsize::new(MAX_TRACKED_REQUESTERS).unwrap_or(NonZeroUsize::MIN);
        Self {
            ranker: Arc::new(ranker),
            source,
            config: Arc::new(config),
            cache,
            sequencers: Arc::new(Mutex::new(LruCache::new(capacity))),
            tool_router: Self::tool_router(),
        }
    }

    /// One sequencer per requester: a newer search from the same user supersedes the older one.
    /// Anonymous searches get a fresh sequencer each and never supersede one another.
    fn sequencer_for(&self, requester: Option<&str>) -> Arc<SearchSequencer> {
        let Some(requester) = requester else {
            return Arc::new(SearchSequencer::new());
        };
        let mut sequencers = self.sequencers.lock();
        sequencers
            .get_or_insert(requester.to_string(), || Arc::new(SearchSequencer::new()))
            .clone()
    }


    fn convert_error(err: SkillBridgeError) -> McpError {
        match err {
            SkillBridgeError::Validation(msg) => McpError::invalid_params(msg, None),
            SkillBridgeError::EmbeddingUnavailable(e) => McpError::internal_error(
                format!("Embedding unavailable: {}", e),
                Some(json!({ "retryable": true })),
            ),
            SkillBridgeError::CandidateSourceUnavailable(e) => McpError::internal_error(
                format!("Candidate source unavailable: {}", e),
                Some(json!({ "retryable": true })),
            ),
            other => McpError::internal_error(other.to_string(), None),
        }
    }


    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, SkillBridgeError> {
        if text.trim().is_empty() {
            return Err(SkillBridgeError::Validation("query_text is empty".into()));
        }
        Ok(self.ranker.embedder().embed(text).await?)
    }


    fn result_to_json<T: Serialize>(result: T) -> Result<String, McpError> {
        serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[tool_router]
impl SkillBridgeMcpServer {

    #[tool(description = "Find collaborators by semantic match. Name matches score 1.0, role/skill matches at least 0.8, otherwise embedding similarity. Returns: {search_id, results: [{id, name, role, skills, summary, score, tier}], partial, candidates_scanned}")]
    async fn search_partners(
        &self,
        Parameters(params): Parameters<SearchPartnersParams>,
    ) -> Result<CallToolResult, McpError> {
        let requester = params.requester_id.as_deref();
        info!(
            "🔍 Searching partners: '{}' requester={}",
            crate::preview(&params.query, 50),
            requester.unwrap_or("<anonymous>")
        );

        let sequencer = self.sequencer_for(requester);
        let ticket = sequencer.issue();

        let outcome = self
            .ranker
            .search_source_tracked(
                &sequencer,
                ticket,
                &params.query,
                self.source.as_ref(),
                params.requester_id.as_deref(),
            )
            .await
            .map_err(Self::convert_error)?;

        match outcome {
            SearchOutcome::Completed(response) => {
                info!("✅ Found {} partners", response.results.len());
                let json = Self::result_to_json(&response)?;
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            SearchOutcome::Superseded => {
                warn!("⚠️ Search #{} superseded by a newer one", ticket.sequence());
                let json = Self::result_to_json(json!({
                    "status": "superseded",
                    "sequence": ticket.sequence(),
                }))?;
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
        }
    }


    #[tool(description = "Embed text with the configured embedding service. Returns: {embedding: [f32], dimensions}")]
    async fn vectorize(
        &self,
        Parameters(params): Parameters<VectorizeParams>,
    ) -> Result<CallToolResult, McpError> {
        let embedding = self.embed_text(&params.query_text).await.map_err(Self::convert_error)?;

        let json = Self::result_to_json(VectorizeResult {
            dimensions: embedding.len(),
            embedding,
        })?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}


#[tool_handler]
impl ServerHandler for SkillBridgeMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "skill-bridge".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Skill-Bridge partner search. Use search_partners to rank student profiles \
                 against a free-text need, and vectorize to embed text with the same model."
                    .to_string(),
            ),
        }
    }


    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![
                RawResource::new("config://skill-bridge", "skill-bridge-config".to_string())
                    .no_annotation(),
                RawResource::new("stats://embedding-cache", "embedding-cache-stats".to_string())
                    .no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match uri.as_str() {
            "config://skill-bridge" => {
                let content = serde_json::to_string_pretty(&json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "embedding": {
                        "provider": self.ranker.embedder().provider_name(),
                        "model": self.ranker.embedder().model_name(),
                    },
                    "source": self.source.describe(),
                    "ranking": self.ranker.config(),
                    "partial_policy": self.config.store.partial_policy,
                    "tools": ["search_partners", "vectorize"],
                }))
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;

                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(content, uri)],
                })
            }
            "stats://embedding-cache" => {
                let stats = self.cache.as_ref().map(|c| c.stats());
                let content = serde_json::to_string_pretty(&json!({
                    "enabled": stats.is_some(),
                    "stats": stats,
                }))
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;

                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(content, uri)],
                })
            }
            _ => Err(McpError::resource_not_found(
                format!("Unknown resource: {}", uri),
                Some(json!({ "uri": uri })),
            )),
        }
    }
}


pub async fn run_server() -> anyhow::Result<()> {
    info!("🚀 Initializing Skill-Bridge MCP Server...");

    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config = SkillBridgeConfig::load(config_path.as_deref())?;

    let cache = config
        .cache
        .enabled
        .then(|| Arc::new(QueryEmbeddingCache::new(config.cache.capacity, config.cache.ttl_secs)));
    let embedder: Arc<dyn EmbeddingClient> =
        Arc::new(HttpEmbeddingClient::new(&config.embedding, cache.clone())?);
    let source = build_source(&config.store)?;
    let ranker = Ranker::new(embedder, config.ranking.clone())
        .with_partial_policy(config.store.partial_policy);

    info!("✅ Skill-Bridge MCP Server ready");
    info!(
        "   🤖 Embeddings: {} {} ({})",
        config.embedding.provider, config.embedding.base_url, config.embedding.model
    );
    info!("   📍 Candidates: {}", source.describe());

    let server = SkillBridgeMcpServer::new(ranker, source, config, cache);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
